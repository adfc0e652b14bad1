//! Application bootstrapping on top of the [beanwire] bean context.
//!
//! An application built from beans has no natural place to wire things up by hand. Instead,
//! [run_application](application::run_application) loads configuration, installs a `tracing`
//! subscriber, starts a [BeanContext](beanwire::context::BeanContext) with configuration exposed
//! as its property source, and then hands control over to every
//! [ApplicationRunner](runner::ApplicationRunner) bean, highest priority first. The context is
//! closed afterwards, even if a runner fails.
//!
//! Configuration is read from an optional `beanwire.json` file and `BEANWIRE_` environment
//! variables - see [config] for details.

pub mod application;
pub mod config;
mod logging;
pub mod runner;
