use beanwire::aop::{
    InterceptedMethods, Interceptor, InterceptorPtr, InvocationArguments, InvocationResult,
    MethodInvocation, MethodMetadata,
};
use beanwire::bean::BeanDefinition;
use beanwire::context::BeanContextBuilder;
use beanwire::provider::{BeanPtr, ErrorPtr, TypedBeanProvider};

trait Engine {
    fn start(&self, gear: u8) -> Result<String, ErrorPtr>;
}

type EnginePtr = BeanPtr<dyn Engine + Send + Sync>;

// metadata of an intercepted method, with bindings selecting its interceptors
const START: MethodMetadata = MethodMetadata::new("Engine", "start", &["logged"]);

struct V8Engine;

impl Engine for V8Engine {
    fn start(&self, gear: u8) -> Result<String, ErrorPtr> {
        Ok(format!("Starting V8 in gear {gear}"))
    }
}

// proxies are written for the intercepted trait and dispatch calls through interceptors
struct EngineProxy {
    target: BeanPtr<V8Engine>,
    methods: InterceptedMethods,
}

impl Engine for EngineProxy {
    fn start(&self, gear: u8) -> Result<String, ErrorPtr> {
        self.methods.invoke(
            &START,
            InvocationArguments::new().with(gear),
            |arguments| self.target.start(arguments.argument(0)?),
        )
    }
}

// interceptors are regular beans exposed as dyn Interceptor
struct Logging;

impl Interceptor for Logging {
    fn binding(&self) -> &str {
        "logged"
    }

    fn intercept(&self, invocation: &mut MethodInvocation<'_>) -> InvocationResult {
        println!("Calling {}", invocation.method());
        invocation.proceed()
    }
}

// interceptors can also change arguments
struct Neutral;

impl Interceptor for Neutral {
    fn binding(&self) -> &str {
        "logged"
    }

    fn order(&self) -> i32 {
        10
    }

    fn intercept(&self, invocation: &mut MethodInvocation<'_>) -> InvocationResult {
        invocation.arguments_mut().set(0, 0_u8);
        invocation.proceed()
    }
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    let context = BeanContextBuilder::empty()
        .with_definition(
            BeanDefinition::builder::<Logging>()
                .constructor(|_| Ok(Logging))
                .exposes::<dyn Interceptor + Send + Sync>(|interceptor| {
                    interceptor as InterceptorPtr
                })
                .build()
                .unwrap(),
        )
        .with_definition(
            BeanDefinition::builder::<Neutral>()
                .constructor(|_| Ok(Neutral))
                .exposes::<dyn Interceptor + Send + Sync>(|interceptor| {
                    interceptor as InterceptorPtr
                })
                .build()
                .unwrap(),
        )
        .with_definition(
            BeanDefinition::builder::<V8Engine>()
                .constructor(|_| Ok(V8Engine))
                .intercepted(vec![START], |target, methods| EngineProxy { target, methods })
                .exposes::<dyn Engine + Send + Sync>(|engine| engine as EnginePtr)
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();

    let engine = context.get_bean::<dyn Engine + Send + Sync>(None).unwrap();

    // prints "Calling Engine::start" and then "Starting V8 in gear 0"
    println!("{}", engine.start(3).unwrap());

    // prints "true"
    println!("{}", context.is_proxy(&engine));
}
