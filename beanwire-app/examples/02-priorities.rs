// note: this example assumes you've analyzed the previous one

use beanwire::provider::ErrorPtr;
use beanwire::Bean;
use beanwire_app::application;
use beanwire_app::runner::ApplicationRunner;

#[derive(Bean)]
#[bean(exposes = ["dyn ApplicationRunner + Send + Sync"])]
struct PrintHelloRunner;

impl ApplicationRunner for PrintHelloRunner {
    fn run(&self) -> Result<(), ErrorPtr> {
        println!("Hello");
        Ok(())
    }

    // runners with higher priority run first
    fn priority(&self) -> i8 {
        1
    }
}

#[derive(Bean)]
#[bean(exposes = ["dyn ApplicationRunner + Send + Sync"])]
struct PrintWorldRunner;

impl ApplicationRunner for PrintWorldRunner {
    fn run(&self) -> Result<(), ErrorPtr> {
        println!("world!");
        Ok(())
    }
}

fn main() {
    // prints "Hello" and then "world!"
    application::run().expect("error running application");
}
