mod interception_test {
    use beanwire::aop::{
        ConstructionResult, ConstructorInvocation, InterceptedMethods, Interceptor,
        InterceptorPtr, InvocationArguments, InvocationResult, MethodInvocation, MethodMetadata,
    };
    use beanwire::bean::BeanDefinition;
    use beanwire::context::{BeanContext, BeanContextBuilder};
    use beanwire::provider::{BeanPtr, ErrorPtr, TypedBeanProvider};
    use parking_lot::Mutex;
    use std::sync::Arc;

    trait Greeter {
        fn greet(&self, name: String) -> Result<String, ErrorPtr>;
    }

    type GreeterPtr = BeanPtr<dyn Greeter + Send + Sync>;

    const GREET: MethodMetadata = MethodMetadata::new("Greeter", "greet", &["logged"]);

    struct SimpleGreeter {
        greeting: String,
    }

    impl Greeter for SimpleGreeter {
        fn greet(&self, name: String) -> Result<String, ErrorPtr> {
            Ok(format!("{} {name}", self.greeting))
        }
    }

    struct GreeterProxy {
        target: BeanPtr<SimpleGreeter>,
        methods: InterceptedMethods,
    }

    impl Greeter for GreeterProxy {
        fn greet(&self, name: String) -> Result<String, ErrorPtr> {
            self.methods.invoke(
                &GREET,
                InvocationArguments::new().with(name),
                |arguments| self.target.greet(arguments.argument::<String>(0)?),
            )
        }
    }

    struct IntroducedGreeter {
        methods: InterceptedMethods,
    }

    impl Greeter for IntroducedGreeter {
        fn greet(&self, name: String) -> Result<String, ErrorPtr> {
            self.methods
                .invoke_introduction(&GREET, InvocationArguments::new().with(name))
        }
    }

    /// Records the order of calls.
    struct Logging {
        order: i32,
        calls: Arc<Mutex<Vec<i32>>>,
    }

    impl Interceptor for Logging {
        fn binding(&self) -> &str {
            "logged"
        }

        fn order(&self) -> i32 {
            self.order
        }

        fn intercept(&self, invocation: &mut MethodInvocation<'_>) -> InvocationResult {
            self.calls.lock().push(self.order);
            invocation.proceed()
        }
    }

    /// Answers greetings without a target.
    struct Responder;

    impl Interceptor for Responder {
        fn binding(&self) -> &str {
            "logged"
        }

        fn order(&self) -> i32 {
            100
        }

        fn intercept(&self, invocation: &mut MethodInvocation<'_>) -> InvocationResult {
            if invocation.has_target() {
                return invocation.proceed();
            }

            let name = invocation.arguments().argument::<String>(0)?;
            Ok(Box::new(format!("Introduced {name}")))
        }
    }

    /// Changes the greeting of constructed greeters.
    struct Localized;

    impl Interceptor for Localized {
        fn binding(&self) -> &str {
            "localized"
        }

        fn intercept_construct(
            &self,
            invocation: &mut ConstructorInvocation<'_>,
        ) -> ConstructionResult {
            let mut bean = invocation.proceed()?;
            if let Some(greeter) = bean.downcast_mut::<SimpleGreeter>() {
                greeter.greeting = "Hej".to_string();
            }

            Ok(bean)
        }
    }

    fn logging(order: i32, calls: &Arc<Mutex<Vec<i32>>>) -> BeanDefinition {
        let calls = calls.clone();
        BeanDefinition::builder::<Logging>()
            .constructor(move |_| {
                Ok(Logging {
                    order,
                    calls: calls.clone(),
                })
            })
            .exposes::<dyn Interceptor + Send + Sync>(|interceptor| interceptor as InterceptorPtr)
            .build()
            .unwrap()
    }

    fn greeter() -> BeanDefinition {
        BeanDefinition::builder::<SimpleGreeter>()
            .constructor(|_| {
                Ok(SimpleGreeter {
                    greeting: "Hello".to_string(),
                })
            })
            .intercepted(vec![GREET], |target, methods| GreeterProxy { target, methods })
            .exposes::<dyn Greeter + Send + Sync>(|greeter| greeter as GreeterPtr)
            .build()
            .unwrap()
    }

    fn context(definitions: Vec<BeanDefinition>) -> BeanContext {
        BeanContextBuilder::empty()
            .with_definitions(definitions)
            .build()
            .unwrap()
    }

    #[test]
    fn should_run_interceptors_in_order() {
        let calls = Arc::new(Mutex::new(vec![]));
        let context = context(vec![
            logging(10, &calls),
            logging(5, &calls),
            logging(20, &calls),
            greeter(),
        ]);

        let greeter = context.get_bean::<dyn Greeter + Send + Sync>(None).unwrap();

        assert_eq!(greeter.greet("Ada".to_string()).unwrap(), "Hello Ada");
        assert_eq!(*calls.lock(), vec![5, 10, 20]);
        assert!(context.is_proxy(&greeter));
    }

    #[test]
    fn should_call_target_without_interceptors() {
        let context = context(vec![greeter()]);

        let greeter = context.get_bean::<dyn Greeter + Send + Sync>(None).unwrap();
        assert_eq!(greeter.greet("Ada".to_string()).unwrap(), "Hello Ada");
    }

    #[test]
    fn should_not_mark_plain_beans_as_proxies() {
        let context = context(vec![BeanDefinition::builder::<SimpleGreeter>()
            .constructor(|_| {
                Ok(SimpleGreeter {
                    greeting: "Hi".to_string(),
                })
            })
            .build()
            .unwrap()]);

        let greeter = context.get_bean::<SimpleGreeter>(None).unwrap();
        assert!(!context.is_proxy(&greeter));
    }

    #[test]
    fn should_implement_introductions_with_interceptors() {
        let context = context(vec![
            BeanDefinition::builder::<Responder>()
                .constructor(|_| Ok(Responder))
                .exposes::<dyn Interceptor + Send + Sync>(|interceptor| {
                    interceptor as InterceptorPtr
                })
                .build()
                .unwrap(),
            BeanDefinition::introduction(vec![GREET], |methods| IntroducedGreeter { methods })
                .exposes::<dyn Greeter + Send + Sync>(|greeter| greeter as GreeterPtr)
                .build()
                .unwrap(),
        ]);

        let greeter = context.get_bean::<dyn Greeter + Send + Sync>(None).unwrap();
        assert_eq!(
            greeter.greet("Ada".to_string()).unwrap(),
            "Introduced Ada"
        );
        assert!(context.is_proxy(&greeter));
    }

    #[test]
    fn should_intercept_construction() {
        let context = context(vec![
            BeanDefinition::builder::<Localized>()
                .constructor(|_| Ok(Localized))
                .exposes::<dyn Interceptor + Send + Sync>(|interceptor| {
                    interceptor as InterceptorPtr
                })
                .build()
                .unwrap(),
            BeanDefinition::builder::<SimpleGreeter>()
                .around_construct("localized")
                .constructor(|_| {
                    Ok(SimpleGreeter {
                        greeting: "Hello".to_string(),
                    })
                })
                .build()
                .unwrap(),
        ]);

        let greeter = context.get_bean::<SimpleGreeter>(None).unwrap();
        assert_eq!(greeter.greet("Ada".to_string()).unwrap(), "Hej Ada");
    }

    #[test]
    fn should_fail_introductions_without_interceptors() {
        let context = context(vec![BeanDefinition::introduction(
            vec![GREET],
            |methods| IntroducedGreeter { methods },
        )
        .exposes::<dyn Greeter + Send + Sync>(|greeter| greeter as GreeterPtr)
        .build()
        .unwrap()]);

        let greeter = context.get_bean::<dyn Greeter + Send + Sync>(None).unwrap();
        assert!(greeter.greet("Ada".to_string()).is_err());
    }
}
