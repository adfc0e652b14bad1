use beanwire::context::BeanContextBuilder;
use beanwire::event::{ContextEvent, ContextEventListener};
use beanwire::injection::ExplicitArguments;
use beanwire::provider::{BeanPtr, ErrorPtr, TypedBeanProvider};
use beanwire::Bean;
use std::sync::Arc;

#[derive(Bean)]
#[bean(eager, post_construct = "warm_up", pre_destroy = "cool_down")]
struct Engine {
    #[bean(default)]
    temperature: u8,
}

impl Engine {
    fn warm_up(&mut self) -> Result<(), ErrorPtr> {
        self.temperature = 90;
        println!("Engine warmed up");
        Ok(())
    }

    fn cool_down(&self) -> Result<(), ErrorPtr> {
        println!("Engine cooled down from {}", self.temperature);
        Ok(())
    }
}

#[derive(Bean)]
#[bean(scope = "PROTOTYPE")]
struct Route {
    engine: BeanPtr<Engine>,
    #[bean(property = "route.destination", default_value = "home")]
    destination: String,
}

// listeners get notified about context lifecycle events
struct PrintingListener;

impl ContextEventListener for PrintingListener {
    fn on_event(&self, event: &ContextEvent) {
        println!("Event: {event:?}");
    }
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    let context = BeanContextBuilder::new()
        .unwrap()
        .with_listener(Arc::new(PrintingListener))
        .build()
        .unwrap();

    // eager beans get created on start
    context.start().unwrap();

    // prints "Driving home at 90"
    let route = context.get_bean::<Route>(None).unwrap();
    println!(
        "Driving {} at {}",
        route.destination, route.engine.temperature
    );

    // injection points can be overridden when creating new instances
    // prints "Driving to work at 90"
    let route = context
        .create_bean::<Route>(
            None,
            ExplicitArguments::new().with("destination", "to work".to_string()),
        )
        .unwrap();
    println!(
        "Driving {} at {}",
        route.destination, route.engine.temperature
    );

    // destroys beans in reverse creation order
    context.close().unwrap();
}
