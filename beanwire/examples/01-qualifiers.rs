use beanwire::bean::BeanDefinition;
use beanwire::context::BeanContextBuilder;
use beanwire::injection::InjectionPoint;
use beanwire::provider::{BeanPtr, TypedBeanProvider};
use beanwire::qualifier::Qualifier;

trait Engine {
    fn start(&self) -> String;
}

type EnginePtr = BeanPtr<dyn Engine + Send + Sync>;

struct V8Engine;

impl Engine for V8Engine {
    fn start(&self) -> String {
        "Starting V8".to_string()
    }
}

struct V6Engine;

impl Engine for V6Engine {
    fn start(&self) -> String {
        "Starting V6".to_string()
    }
}

struct Vehicle {
    engine: EnginePtr,
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    // beans can also be defined by hand, without using derive
    let context = BeanContextBuilder::empty()
        .with_definition(
            BeanDefinition::builder::<V8Engine>()
                .named("v8")
                .order(10)
                .constructor(|_| Ok(V8Engine))
                .exposes::<dyn Engine + Send + Sync>(|engine| engine as EnginePtr)
                .build()
                .expect("invalid V8Engine definition"),
        )
        .with_definition(
            // primary beans win when more than one bean matches a request
            BeanDefinition::builder::<V6Engine>()
                .named("v6")
                .primary()
                .constructor(|_| Ok(V6Engine))
                .exposes::<dyn Engine + Send + Sync>(|engine| engine as EnginePtr)
                .build()
                .expect("invalid V6Engine definition"),
        )
        .with_definition(
            BeanDefinition::builder::<Vehicle>()
                // named injection points select beans by name
                .constructor_arg(
                    InjectionPoint::bean::<dyn Engine + Send + Sync>("engine").named("v8"),
                )
                .constructor(|arguments| {
                    Ok(Vehicle {
                        engine: arguments.bean(0)?,
                    })
                })
                .build()
                .expect("invalid Vehicle definition"),
        )
        .build()
        .expect("error building bean context");

    // prints "Starting V8"
    let vehicle = context.get_bean::<Vehicle>(None).unwrap();
    println!("{}", vehicle.engine.start());

    // prints "Starting V6", since it's the primary engine
    let engine = context.get_bean::<dyn Engine + Send + Sync>(None).unwrap();
    println!("{}", engine.start());

    // prints "Starting V8"
    let engine = context
        .get_bean::<dyn Engine + Send + Sync>(Some(&Qualifier::named("v8")))
        .unwrap();
    println!("{}", engine.start());

    // collections are sorted by order: prints "Starting V6" and "Starting V8"
    for engine in context.get_beans::<dyn Engine + Send + Sync>(None).unwrap() {
        println!("{}", engine.start());
    }
}
