//! Runners executing actual application logic.

pub use beanwire::provider::ErrorPtr;
#[cfg(test)]
use mockall::automock;

pub type ApplicationRunnerPtr = dyn ApplicationRunner + Send + Sync;

/// A unit of application logic. Every bean exposed as [ApplicationRunnerPtr] is run once by
/// [Application](crate::application::Application) after the bean context starts.
#[cfg_attr(test, automock)]
pub trait ApplicationRunner {
    fn run(&self) -> Result<(), ErrorPtr>;

    /// Returns the priority for this runner. Runners with higher priority run first.
    fn priority(&self) -> i8 {
        0
    }
}
