//! Pointer types and traits for obtaining bean instances. [BeanProvider] is the type-erased
//! interface implemented by [BeanContext](crate::context::BeanContext), while
//! [TypedBeanProvider] adds strongly-typed access on top of any provider.
//!
//! ```
//! use beanwire::bean::BeanDefinition;
//! use beanwire::context::BeanContextBuilder;
//! use beanwire::provider::TypedBeanProvider;
//!
//! struct Greeter;
//!
//! let context = BeanContextBuilder::empty()
//!     .with_definition(
//!         BeanDefinition::builder::<Greeter>()
//!             .constructor(|_| Ok(Greeter))
//!             .build()
//!             .unwrap(),
//!     )
//!     .build()
//!     .unwrap();
//!
//! assert!(context.get_bean::<Greeter>(None).is_ok());
//! ```

use crate::bean::{BeanRequest, Cardinality};
use crate::error::BeanContextError;
use crate::injection::ExplicitArguments;
use crate::qualifier::Qualifier;
use std::any::{type_name, Any};
use std::error::Error;
use std::sync::Arc;

pub type BeanPtr<T> = Arc<T>;

pub type BeanAnyPtr = BeanPtr<dyn Any + Send + Sync + 'static>;

pub type ErrorPtr = Arc<dyn Error + Send + Sync>;

/// A type-erased `BeanPtr<T>` produced by casting an instance to a requested type.
pub type CastValue = Box<dyn Any + Send + Sync>;

/// Casts a bean instance to one of the types it exposes. Returns the original instance on failure.
pub type CastFunction = Arc<dyn Fn(BeanAnyPtr) -> Result<CastValue, BeanAnyPtr> + Send + Sync>;

/// Generic provider for bean instances.
pub trait BeanProvider {
    /// Resolves instances matching the request. Every returned value contains a `BeanPtr` of the
    /// requested type. Required requests yield exactly one value, optional ones at most one.
    fn instances(&self, request: &BeanRequest) -> Result<Vec<CastValue>, BeanContextError>;

    /// Creates a fresh instance for the request, bypassing any scope caching. Explicit arguments
    /// override injection points with matching names of the created bean only.
    fn create_instance(
        &self,
        request: &BeanRequest,
        arguments: ExplicitArguments,
    ) -> Result<CastValue, BeanContextError>;

    /// Checks if there's at least one eligible bean matching the request.
    fn contains(&self, request: &BeanRequest) -> bool;
}

/// Helper trait for [BeanProvider] providing strongly-typed access.
pub trait TypedBeanProvider {
    /// Returns the single bean of given type, or an error if none or more than one qualify.
    fn get_bean<T: ?Sized + Send + Sync + 'static>(
        &self,
        qualifier: Option<&Qualifier>,
    ) -> Result<BeanPtr<T>, BeanContextError>;

    /// Like [TypedBeanProvider::get_bean], but returns `None` when no bean qualifies.
    fn find_bean<T: ?Sized + Send + Sync + 'static>(
        &self,
        qualifier: Option<&Qualifier>,
    ) -> Result<Option<BeanPtr<T>>, BeanContextError>;

    /// Returns all beans of given type, ordered by their declared order and registration.
    fn get_beans<T: ?Sized + Send + Sync + 'static>(
        &self,
        qualifier: Option<&Qualifier>,
    ) -> Result<Vec<BeanPtr<T>>, BeanContextError>;

    /// Typesafe version of [BeanProvider::create_instance].
    fn create_bean<T: ?Sized + Send + Sync + 'static>(
        &self,
        qualifier: Option<&Qualifier>,
        arguments: ExplicitArguments,
    ) -> Result<BeanPtr<T>, BeanContextError>;

    /// Checks if any bean of given type is available.
    fn contains_bean<T: ?Sized + Send + Sync + 'static>(&self, qualifier: Option<&Qualifier>)
        -> bool;
}

impl<P: BeanProvider + ?Sized> TypedBeanProvider for P {
    fn get_bean<T: ?Sized + Send + Sync + 'static>(
        &self,
        qualifier: Option<&Qualifier>,
    ) -> Result<BeanPtr<T>, BeanContextError> {
        let request = BeanRequest::new::<T>(qualifier.cloned(), Cardinality::Required);
        self.instances(&request)?
            .into_iter()
            .next()
            .ok_or_else(|| BeanContextError::no_such_bean(&request))
            .and_then(downcast_value)
    }

    fn find_bean<T: ?Sized + Send + Sync + 'static>(
        &self,
        qualifier: Option<&Qualifier>,
    ) -> Result<Option<BeanPtr<T>>, BeanContextError> {
        let request = BeanRequest::new::<T>(qualifier.cloned(), Cardinality::Optional);
        self.instances(&request)?
            .into_iter()
            .next()
            .map(downcast_value)
            .transpose()
    }

    fn get_beans<T: ?Sized + Send + Sync + 'static>(
        &self,
        qualifier: Option<&Qualifier>,
    ) -> Result<Vec<BeanPtr<T>>, BeanContextError> {
        let request = BeanRequest::new::<T>(qualifier.cloned(), Cardinality::Collection);
        self.instances(&request)?
            .into_iter()
            .map(downcast_value)
            .collect()
    }

    fn create_bean<T: ?Sized + Send + Sync + 'static>(
        &self,
        qualifier: Option<&Qualifier>,
        arguments: ExplicitArguments,
    ) -> Result<BeanPtr<T>, BeanContextError> {
        let request = BeanRequest::new::<T>(qualifier.cloned(), Cardinality::Required);
        self.create_instance(&request, arguments)
            .and_then(downcast_value)
    }

    fn contains_bean<T: ?Sized + Send + Sync + 'static>(
        &self,
        qualifier: Option<&Qualifier>,
    ) -> bool {
        self.contains(&BeanRequest::new::<T>(
            qualifier.cloned(),
            Cardinality::Collection,
        ))
    }
}

pub(crate) fn downcast_value<T: ?Sized + Send + Sync + 'static>(
    value: CastValue,
) -> Result<BeanPtr<T>, BeanContextError> {
    value
        .downcast::<BeanPtr<T>>()
        .map(|instance| *instance)
        .map_err(|_| BeanContextError::IncompatibleBean(type_name::<T>().to_string()))
}

#[cfg(test)]
mod tests {
    use crate::bean::{BeanRequest, Cardinality};
    use crate::error::BeanContextError;
    use crate::injection::ExplicitArguments;
    use crate::provider::{BeanPtr, BeanProvider, CastValue, TypedBeanProvider};
    use mockall::mock;

    mock! {
        Provider {}

        impl BeanProvider for Provider {
            fn instances(&self, request: &BeanRequest) -> Result<Vec<CastValue>, BeanContextError>;

            fn create_instance(
                &self,
                request: &BeanRequest,
                arguments: ExplicitArguments,
            ) -> Result<CastValue, BeanContextError>;

            fn contains(&self, request: &BeanRequest) -> bool;
        }
    }

    #[test]
    fn should_downcast_typed_instances() {
        let mut provider = MockProvider::new();
        provider
            .expect_instances()
            .withf(|request| request.cardinality == Cardinality::Required)
            .returning(|_| Ok(vec![Box::new(BeanPtr::new(5_i8)) as CastValue]));

        assert_eq!(*provider.get_bean::<i8>(None).unwrap(), 5);
    }

    #[test]
    fn should_report_incompatible_instances() {
        let mut provider = MockProvider::new();
        provider
            .expect_instances()
            .returning(|_| Ok(vec![Box::new(BeanPtr::new(5_u8)) as CastValue]));

        assert!(matches!(
            provider.get_bean::<i8>(None),
            Err(BeanContextError::IncompatibleBean(_))
        ));
    }

    #[test]
    fn should_return_none_for_missing_optional_bean() {
        let mut provider = MockProvider::new();
        provider
            .expect_instances()
            .withf(|request| request.cardinality == Cardinality::Optional)
            .returning(|_| Ok(vec![]));

        assert!(provider.find_bean::<i8>(None).unwrap().is_none());
    }

    #[test]
    fn should_request_collections() {
        let mut provider = MockProvider::new();
        provider
            .expect_instances()
            .withf(|request| request.cardinality == Cardinality::Collection)
            .returning(|_| {
                Ok(vec![
                    Box::new(BeanPtr::new(1_i8)) as CastValue,
                    Box::new(BeanPtr::new(2_i8)) as CastValue,
                ])
            });

        let beans = provider.get_beans::<i8>(None).unwrap();
        assert_eq!(beans.iter().map(|bean| **bean).collect::<Vec<_>>(), [1, 2]);
    }
}
