use beanwire::condition::Condition;
use beanwire::context::BeanContextBuilder;
use beanwire::environment::MapPropertySource;
use beanwire::provider::{BeanPtr, TypedBeanProvider};
use beanwire::Bean;
use std::sync::Arc;

trait Engine {
    fn start(&self) -> String;
}

// conditions are functions returning a Condition, which decides if a bean is eligible
fn v8_selected() -> Condition {
    Condition::property_equals("engine.type", "v8")
}

fn electric_selected() -> Condition {
    Condition::property_equals("engine.type", "electric")
}

#[derive(Bean)]
#[bean(exposes = ["dyn Engine + Send + Sync"], condition = "v8_selected")]
struct V8Engine;

impl Engine for V8Engine {
    fn start(&self) -> String {
        "Starting V8".to_string()
    }
}

#[derive(Bean)]
#[bean(exposes = ["dyn Engine + Send + Sync"], condition = "electric_selected")]
struct ElectricEngine;

impl Engine for ElectricEngine {
    fn start(&self) -> String {
        "Starting electric".to_string()
    }
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    for engine_type in ["v8", "electric"] {
        // each context evaluates conditions against its own properties
        let context = BeanContextBuilder::new()
            .unwrap()
            .with_property_source(Arc::new(
                MapPropertySource::new().with_property("engine.type", engine_type),
            ))
            .build()
            .unwrap();

        // prints "Starting V8" and then "Starting electric"
        let engine: BeanPtr<dyn Engine + Send + Sync> = context.get_bean(None).unwrap();
        println!("{}", engine.start());
    }
}
