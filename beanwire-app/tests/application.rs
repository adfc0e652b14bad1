mod application_test {
    use beanwire::bean::BeanDefinition;
    use beanwire::context::BeanContextBuilder;
    use beanwire::error::BeanContextError;
    use beanwire::provider::{BeanPtr, ErrorPtr};
    use beanwire_app::application::{run_application, ApplicationError};
    use beanwire_app::runner::{ApplicationRunner, ApplicationRunnerPtr};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct FlagRunner {
        flag: Arc<AtomicBool>,
    }

    impl ApplicationRunner for FlagRunner {
        fn run(&self) -> Result<(), ErrorPtr> {
            self.flag.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingRunner;

    impl ApplicationRunner for FailingRunner {
        fn run(&self) -> Result<(), ErrorPtr> {
            Err(Arc::new(BeanContextError::ContextClosed))
        }
    }

    #[test]
    fn should_run_registered_runners() {
        let flag = Arc::new(AtomicBool::new(false));
        let runner_flag = flag.clone();

        let builder = BeanContextBuilder::empty().with_definition(
            BeanDefinition::builder::<FlagRunner>()
                .constructor(move |_| {
                    Ok(FlagRunner {
                        flag: runner_flag.clone(),
                    })
                })
                .exposes::<ApplicationRunnerPtr>(|runner| runner as BeanPtr<ApplicationRunnerPtr>)
                .build()
                .unwrap(),
        );

        run_application(builder).unwrap();
        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn should_report_runner_errors() {
        let builder = BeanContextBuilder::empty().with_definition(
            BeanDefinition::builder::<FailingRunner>()
                .constructor(|_| Ok(FailingRunner))
                .exposes::<ApplicationRunnerPtr>(|runner| runner as BeanPtr<ApplicationRunnerPtr>)
                .build()
                .unwrap(),
        );

        assert!(matches!(
            run_application(builder),
            Err(ApplicationError::RunnerError(_))
        ));
    }
}
