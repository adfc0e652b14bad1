use beanwire::provider::ErrorPtr;
use beanwire::Bean;
use beanwire_app::application;
use beanwire_app::runner::ApplicationRunner;

// this is an application runner, which will run when the application starts; the framework will
// automatically discover it using dependency injection, since it's exposed as dyn ApplicationRunner
#[derive(Bean)]
#[bean(exposes = ["dyn ApplicationRunner + Send + Sync"])]
struct HelloWorldRunner;

impl ApplicationRunner for HelloWorldRunner {
    fn run(&self) -> Result<(), ErrorPtr> {
        println!("Hello world!");
        Ok(())
    }
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    // runs the application with all automatically registered beans; prints "Hello world!"
    application::run().expect("error running application");
}
