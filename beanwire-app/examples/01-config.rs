// note: this example assumes you've analyzed the previous one

use beanwire::provider::ErrorPtr;
use beanwire::Bean;
use beanwire_app::application;
use beanwire_app::runner::ApplicationRunner;

// configuration comes from an optional beanwire.json file and BEANWIRE_ environment variables,
// e.g. running with BEANWIRE_GARAGE__NAME=Home sets the "garage.name" property
#[derive(Bean)]
#[bean(exposes = ["dyn ApplicationRunner + Send + Sync"])]
struct GaragePrinterRunner {
    #[bean(property = "garage.name", default_value = "unnamed")]
    name: String,
    #[bean(property = "garage.capacity")]
    capacity: Option<u8>,
}

impl ApplicationRunner for GaragePrinterRunner {
    fn run(&self) -> Result<(), ErrorPtr> {
        println!("Garage: {}", self.name);

        if let Some(capacity) = self.capacity {
            println!("Capacity: {capacity}");
        }

        Ok(())
    }
}

fn main() {
    // prints "Garage: unnamed", unless configured otherwise
    application::run().expect("error running application");
}
