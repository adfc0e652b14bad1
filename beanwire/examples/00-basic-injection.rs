use beanwire::context::BeanContextBuilder;
use beanwire::provider::{BeanPtr, TypedBeanProvider};
use beanwire::Bean;

// this is a trait we would like to inject
trait Engine {
    fn start(&self) -> String;
}

// this is a bean implementing the above trait; `exposes` tells the framework to provide it when
// asked for dyn Engine
#[derive(Bean)]
#[bean(exposes = ["dyn Engine + Send + Sync"])]
struct V8Engine;

impl Engine for V8Engine {
    fn start(&self) -> String {
        "Starting V8".to_string()
    }
}

// this is another bean, but with a dependency
#[derive(Bean)]
struct Vehicle {
    // the framework will know how to inject dyn Engine, when asked for Vehicle
    engine: BeanPtr<dyn Engine + Send + Sync>,
    // alternatively, you can inject the concrete type
    // engine: BeanPtr<V8Engine>,
}

impl Vehicle {
    fn start(&self) -> String {
        self.engine.start()
    }
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    // beans are created by a BeanContext, which collects all beans deriving Bean
    let context = BeanContextBuilder::new()
        .expect("error collecting bean definitions")
        .build()
        .expect("error building bean context");

    // creates all eager beans
    context.start().expect("error starting bean context");

    let vehicle = context
        .get_bean::<Vehicle>(None)
        .expect("error creating Vehicle");

    // prints "Starting V8"
    println!("{}", vehicle.start());

    context.close().expect("error closing bean context");
}
