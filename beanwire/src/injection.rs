//! Injection points describe what a bean needs in order to be created: other beans (single,
//! optional or all of a type) or configuration properties. Resolved values are handed to
//! constructors and injection callbacks as [Arguments], in the order of declaration.

use crate::bean::{BeanRequest, BeanType, Cardinality};
use crate::error::BeanContextError;
use crate::provider::{downcast_value, BeanPtr, CastValue, ErrorPtr};
use crate::qualifier::{Qualifier, TypeArgument};
use derivative::Derivative;
use fxhash::FxHashMap;
use std::any::{type_name, Any};
use std::error::Error;
use std::str::FromStr;
use std::sync::Arc;

/// Converts resolved bean values into the argument value for given cardinality: `BeanPtr<T>`,
/// `Option<BeanPtr<T>>` or `Vec<BeanPtr<T>>`.
pub type AssembleFunction = fn(Vec<CastValue>, Cardinality) -> Result<CastValue, BeanContextError>;

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum InjectionTarget {
    ConstructorArgument(usize),
    Field,
    MethodArgument { method: String, index: usize },
}

/// What needs to be resolved for an injection point.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub enum Requirement {
    Bean {
        request: BeanRequest,
        #[derivative(Debug = "ignore")]
        assemble: AssembleFunction,
    },
    /// A configuration value. Required properties resolve to `String`, optional ones to
    /// `Option<String>`.
    Property {
        key: String,
        default: Option<String>,
        required: bool,
    },
}

/// A single dependency of a bean.
#[derive(Clone, Debug)]
pub struct InjectionPoint {
    pub name: String,
    pub target: InjectionTarget,
    pub requirement: Requirement,
}

impl InjectionPoint {
    /// Requires exactly one bean of type `T`.
    pub fn bean<T: ?Sized + Send + Sync + 'static>(name: &str) -> Self {
        Self {
            name: name.to_string(),
            target: InjectionTarget::Field,
            requirement: Requirement::Bean {
                request: BeanRequest::new::<T>(None, Cardinality::Required),
                assemble: assemble::<T>,
            },
        }
    }

    /// Requires a configuration property.
    pub fn property(name: &str, key: &str) -> Self {
        Self {
            name: name.to_string(),
            target: InjectionTarget::Field,
            requirement: Requirement::Property {
                key: key.to_string(),
                default: None,
                required: true,
            },
        }
    }

    /// Narrows the candidates with given qualifier, combined with any existing one.
    pub fn qualified(mut self, qualifier: Qualifier) -> Self {
        if let Requirement::Bean { request, .. } = &mut self.requirement {
            request.qualifier = Some(match request.qualifier.take() {
                Some(existing) => existing.and(qualifier),
                None => qualifier,
            });
        }
        self
    }

    pub fn named(self, name: &str) -> Self {
        self.qualified(Qualifier::named(name))
    }

    pub fn with_type_arguments(self, arguments: Vec<TypeArgument>) -> Self {
        self.qualified(Qualifier::TypeArguments(arguments))
    }

    /// Allows the dependency to be absent.
    pub fn optional(mut self) -> Self {
        match &mut self.requirement {
            Requirement::Bean { request, .. } => request.cardinality = Cardinality::Optional,
            Requirement::Property { required, .. } => *required = false,
        }
        self
    }

    /// Requests all matching beans instead of a single one.
    pub fn collection(mut self) -> Self {
        if let Requirement::Bean { request, .. } = &mut self.requirement {
            request.cardinality = Cardinality::Collection;
        }
        self
    }

    /// Sets the value used when a property is not defined.
    pub fn with_default<T: ToString>(mut self, value: T) -> Self {
        if let Requirement::Property { default, .. } = &mut self.requirement {
            *default = Some(value.to_string());
        }
        self
    }

    pub(crate) fn with_target(mut self, target: InjectionTarget) -> Self {
        self.target = target;
        self
    }

    /// Human-readable location of this point within given bean, e.g. `Vehicle.engine`.
    pub fn describe(&self, bean: &BeanType) -> String {
        match &self.target {
            InjectionTarget::MethodArgument { method, .. } => {
                format!("{}.{}({})", bean, method, self.name)
            }
            _ => format!("{}.{}", bean, self.name),
        }
    }
}

fn assemble<T: ?Sized + Send + Sync + 'static>(
    values: Vec<CastValue>,
    cardinality: Cardinality,
) -> Result<CastValue, BeanContextError> {
    let mut values = values.into_iter().map(downcast_value::<T>);
    match cardinality {
        Cardinality::Required => values
            .next()
            .transpose()?
            .map(|value| Box::new(value) as CastValue)
            .ok_or_else(|| BeanContextError::IncompatibleBean(type_name::<T>().to_string())),
        Cardinality::Optional => Ok(Box::new(values.next().transpose()?)),
        Cardinality::Collection => Ok(Box::new(values.collect::<Result<Vec<_>, _>>()?)),
    }
}

fn argument_error(error: BeanContextError) -> ErrorPtr {
    Arc::new(error)
}

/// Resolved values of injection points, passed to constructors and injection callbacks. Each
/// value can be taken once.
#[derive(Default, Derivative)]
#[derivative(Debug)]
pub struct Arguments {
    names: Vec<String>,
    #[derivative(Debug = "ignore")]
    values: Vec<Option<CastValue>>,
}

impl Arguments {
    pub fn new(entries: Vec<(String, CastValue)>) -> Self {
        let (names, values) = entries
            .into_iter()
            .map(|(name, value)| (name, Some(value)))
            .unzip();
        Self { names, values }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Takes the value at given index, which needs to be of type `V`.
    pub fn take<V: Any>(&mut self, index: usize) -> Result<V, ErrorPtr> {
        let argument = self
            .names
            .get(index)
            .cloned()
            .unwrap_or_else(|| index.to_string());

        let value = self
            .values
            .get_mut(index)
            .and_then(Option::take)
            .ok_or_else(|| {
                argument_error(BeanContextError::ArgumentUnavailable {
                    argument: argument.clone(),
                })
            })?;

        value.downcast::<V>().map(|value| *value).map_err(|_| {
            argument_error(BeanContextError::ArgumentTypeMismatch {
                argument,
                expected: type_name::<V>().to_string(),
            })
        })
    }

    pub fn bean<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        index: usize,
    ) -> Result<BeanPtr<T>, ErrorPtr> {
        self.take(index)
    }

    pub fn optional_bean<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        index: usize,
    ) -> Result<Option<BeanPtr<T>>, ErrorPtr> {
        self.take(index)
    }

    pub fn beans<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        index: usize,
    ) -> Result<Vec<BeanPtr<T>>, ErrorPtr> {
        self.take(index)
    }

    pub fn property(&mut self, index: usize) -> Result<String, ErrorPtr> {
        self.take(index)
    }

    pub fn optional_property(&mut self, index: usize) -> Result<Option<String>, ErrorPtr> {
        self.take(index)
    }

    /// Parses a required property into `V`.
    pub fn parse<V>(&mut self, index: usize) -> Result<V, ErrorPtr>
    where
        V: FromStr,
        V::Err: Error + Send + Sync + 'static,
    {
        self.property(index)?
            .parse::<V>()
            .map_err(|error| Arc::new(error) as ErrorPtr)
    }

    /// Parses an optional property into `V`.
    pub fn parse_optional<V>(&mut self, index: usize) -> Result<Option<V>, ErrorPtr>
    where
        V: FromStr,
        V::Err: Error + Send + Sync + 'static,
    {
        self.optional_property(index)?
            .map(|value| value.parse::<V>())
            .transpose()
            .map_err(|error| Arc::new(error) as ErrorPtr)
    }
}

/// Values supplied by the caller of [create_bean](crate::provider::TypedBeanProvider::create_bean),
/// overriding injection points of the created bean with matching names.
#[derive(Default, Derivative)]
#[derivative(Debug)]
pub struct ExplicitArguments {
    #[derivative(Debug = "ignore")]
    values: FxHashMap<String, CastValue>,
}

impl ExplicitArguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Supplies the value for injection point `name`. The value needs to have the type the point
    /// resolves to, e.g. `BeanPtr<T>` for a required bean or `String` for a required property.
    pub fn with<T: ToString, V: Any + Send + Sync>(mut self, name: T, value: V) -> Self {
        self.values.insert(name.to_string(), Box::new(value));
        self
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn take(&mut self, name: &str) -> Option<CastValue> {
        self.values.remove(name)
    }
}
