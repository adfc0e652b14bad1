//! Core application framework functionality.

use crate::config::{load_config, ApplicationConfig, ConfigPropertySource};
use crate::logging::install_tracing_logger;
use crate::runner::ApplicationRunnerPtr;
use beanwire::context::BeanContextBuilder;
use beanwire::error::{BeanContextError, BeanDefinitionError, BeanDefinitionRegistryError};
use beanwire::provider::{BeanProvider, ErrorPtr, TypedBeanProvider};
use derive_more::Constructor;
use std::cmp::Reverse;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Clone, Error, Debug)]
pub enum ApplicationError {
    #[error("Error loading configuration: {0}")]
    ConfigError(ErrorPtr),
    #[error("Invalid bean definition: {0}")]
    DefinitionError(#[from] BeanDefinitionError),
    #[error("Error registering beans: {0}")]
    RegistryError(#[from] BeanDefinitionRegistryError),
    #[error("Error starting bean context: {0}")]
    StartupError(BeanContextError),
    #[error("Error retrieving runners: {0}")]
    RunnerInjectionError(BeanContextError),
    #[error("Runner error: {0}")]
    RunnerError(ErrorPtr),
    #[error("Error closing bean context: {0}")]
    ShutdownError(BeanContextError),
}

/// Runs [ApplicationRunners](crate::runner::ApplicationRunner) found in a bean provider.
#[derive(Constructor)]
pub struct Application<'a, P: BeanProvider + ?Sized> {
    provider: &'a P,
}

impl<P: BeanProvider + ?Sized> Application<'_, P> {
    pub fn run(&self) -> Result<(), ApplicationError> {
        info!("Searching for application runners...");

        let mut runners = self
            .provider
            .get_beans::<ApplicationRunnerPtr>(None)
            .map_err(ApplicationError::RunnerInjectionError)?;

        runners.sort_by_key(|runner| Reverse(runner.priority()));

        info!(count = runners.len(), "Running application runners...");

        for runner in &runners {
            runner.run().map_err(ApplicationError::RunnerError)?;
        }

        Ok(())
    }
}

/// Main entrypoint for the application. Loads configuration, builds and starts the bean context
/// from given builder, runs all runners and finally closes the context.
pub fn run_application(builder: BeanContextBuilder) -> Result<(), ApplicationError> {
    let config = load_config().map_err(|error| ApplicationError::ConfigError(Arc::new(error)))?;
    let application_config = ApplicationConfig::try_from(&config)
        .map_err(|error| ApplicationError::ConfigError(Arc::new(error)))?;

    if application_config.install_tracing_logger {
        install_tracing_logger();
    }

    let context = builder
        .with_property_source(Arc::new(ConfigPropertySource::new(config)))
        .with_parallel_initialization(application_config.parallel_initialization)
        .build()?;

    context.start().map_err(ApplicationError::StartupError)?;

    let result = Application::new(&context).run();
    if let Err(error) = &result {
        warn!(%error, "Application failed");
    }

    let closed = context.close().map_err(ApplicationError::ShutdownError);
    result.and(closed)
}

/// Runs the application using automatically registered beans.
pub fn run() -> Result<(), ApplicationError> {
    run_application(BeanContextBuilder::new()?)
}
