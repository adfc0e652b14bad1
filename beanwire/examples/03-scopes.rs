use beanwire::context::BeanContextBuilder;
use beanwire::provider::{BeanPtr, TypedBeanProvider};
use beanwire::scope::REFRESH;
use beanwire::Bean;

// by default, beans are singletons - only one instance is ever created
#[derive(Bean)]
struct Garage;

// prototypes are created on every request
#[derive(Bean)]
#[bean(scope = "PROTOTYPE")]
struct Trip {
    garage: BeanPtr<Garage>,
}

// refreshable beans live until their scope gets refreshed
#[derive(Bean)]
#[bean(scope = "REFRESH", pre_destroy = "close")]
struct Settings;

impl Settings {
    fn close(&self) -> Result<(), beanwire::provider::ErrorPtr> {
        println!("Discarding settings");
        Ok(())
    }
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    let context = BeanContextBuilder::new().unwrap().build().unwrap();

    let first = context.get_bean::<Trip>(None).unwrap();
    let second = context.get_bean::<Trip>(None).unwrap();

    // prints "false"
    println!("{}", BeanPtr::ptr_eq(&first, &second));

    // prints "true"
    println!("{}", BeanPtr::ptr_eq(&first.garage, &second.garage));

    let settings = context.get_bean::<Settings>(None).unwrap();

    // prints "Discarding settings"
    context.refresh(REFRESH).unwrap();

    // prints "false"
    println!(
        "{}",
        BeanPtr::ptr_eq(&settings, &context.get_bean::<Settings>(None).unwrap())
    );
}
