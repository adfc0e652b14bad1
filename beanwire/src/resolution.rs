//! State of a single resolution, tracking the beans currently being created to detect circular
//! dependencies.

use crate::bean::BeanIdentifier;
use crate::error::BeanContextError;
use crate::injection::ExplicitArguments;
use std::iter::once;

#[derive(Debug, Default)]
pub struct ResolutionContext {
    path: Vec<BeanIdentifier>,
    arguments: Option<ExplicitArguments>,
}

impl ResolutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context supplying explicit arguments for the first bean created.
    pub fn with_arguments(arguments: ExplicitArguments) -> Self {
        Self {
            path: vec![],
            arguments: Some(arguments),
        }
    }

    /// Enters the creation of given bean. Fails if the bean is already being created.
    pub fn push(&mut self, identifier: &BeanIdentifier) -> Result<(), BeanContextError> {
        if self.path.contains(identifier) {
            return Err(BeanContextError::circular_dependency(
                self.path
                    .iter()
                    .chain(once(identifier))
                    .map(ToString::to_string)
                    .collect(),
            ));
        }

        self.path.push(identifier.clone());
        Ok(())
    }

    pub fn pop(&mut self) -> Option<BeanIdentifier> {
        self.path.pop()
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    #[inline]
    pub fn path(&self) -> &[BeanIdentifier] {
        &self.path
    }

    pub(crate) fn take_arguments(&mut self) -> Option<ExplicitArguments> {
        self.arguments.take()
    }
}

#[cfg(test)]
mod tests {
    use crate::bean::{BeanIdentifier, BeanType};
    use crate::error::BeanContextError;
    use crate::resolution::ResolutionContext;

    struct A;
    struct B;

    fn identifier<T: 'static>(index: usize) -> BeanIdentifier {
        BeanIdentifier {
            bean_type: BeanType::of::<T>(),
            name: None,
            index,
        }
    }

    #[test]
    fn should_report_full_chain() {
        let mut context = ResolutionContext::new();
        context.push(&identifier::<A>(0)).unwrap();
        context.push(&identifier::<B>(1)).unwrap();

        match context.push(&identifier::<A>(0)) {
            Err(BeanContextError::CircularDependency { chain, .. }) => {
                assert_eq!(chain, ["A", "B", "A"])
            }
            result => panic!("unexpected result: {result:?}"),
        }
    }

    #[test]
    fn should_allow_reentry_after_pop() {
        let mut context = ResolutionContext::new();
        context.push(&identifier::<A>(0)).unwrap();
        context.pop();

        assert!(context.push(&identifier::<A>(0)).is_ok());
        assert_eq!(context.depth(), 1);
    }
}
