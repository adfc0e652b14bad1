use crate::bean::{BeanDefinition, BeanRequest};
use crate::provider::ErrorPtr;
use crate::qualifier::Qualifier;
use thiserror::Error;

fn describe_qualifier(qualifier: &Option<Qualifier>) -> String {
    qualifier
        .as_ref()
        .map(|qualifier| format!(" qualified {qualifier}"))
        .unwrap_or_default()
}

fn describe_dependent(dependent: &Option<String>) -> String {
    dependent
        .as_ref()
        .map(|dependent| format!(" required by {dependent}"))
        .unwrap_or_default()
}

/// Errors related to resolving, creating and destroying beans.
#[derive(Error, Clone, Debug)]
pub enum BeanContextError {
    #[error("No bean of type {bean_type}{} exists{}", describe_qualifier(.qualifier), describe_dependent(.dependent))]
    NoSuchBean {
        bean_type: String,
        qualifier: Option<Qualifier>,
        dependent: Option<String>,
    },
    #[error("Multiple beans of type {bean_type}{} exist{}: {}", describe_qualifier(.qualifier), describe_dependent(.dependent), .candidates.join(", "))]
    AmbiguousBean {
        bean_type: String,
        qualifier: Option<Qualifier>,
        candidates: Vec<String>,
        dependent: Option<String>,
    },
    #[error("Circular dependency detected{}: {}", describe_dependent(.dependent), .chain.join(" -> "))]
    CircularDependency {
        chain: Vec<String>,
        dependent: Option<String>,
    },
    #[error("Condition {condition} of bean {bean} depends on its own outcome")]
    CyclicCondition { bean: String, condition: String },
    #[error("Cannot evaluate condition {condition}: {source}")]
    ConditionFailed { condition: String, source: ErrorPtr },
    #[error("Missing property '{key}' required by {dependent}")]
    MissingProperty { key: String, dependent: String },
    #[error("Error creating bean {bean}{}: {source}", .injection_point.as_ref().map(|point| format!(" at {point}")).unwrap_or_default())]
    BeanInstantiation {
        bean: String,
        injection_point: Option<String>,
        source: ErrorPtr,
    },
    #[error("Error destroying bean {bean}: {source}")]
    BeanDestruction { bean: String, source: ErrorPtr },
    #[error("{} bean(s) failed to be destroyed: {}", .0.len(), .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    DestructionFailed(Vec<BeanContextError>),
    #[error("Unrecognized scope: {0}")]
    UnrecognizedScope(String),
    #[error("Scope cannot be refreshed: {0}")]
    UnrefreshableScope(String),
    #[error("Tried to cast bean to incompatible type: {0}")]
    IncompatibleBean(String),
    #[error("Argument '{argument}' is not available")]
    ArgumentUnavailable { argument: String },
    #[error("Argument '{argument}' is not of type {expected}")]
    ArgumentTypeMismatch { argument: String, expected: String },
    #[error("Bean context is closed")]
    ContextClosed,
}

impl BeanContextError {
    pub(crate) fn no_such_bean(request: &BeanRequest) -> Self {
        Self::NoSuchBean {
            bean_type: request.bean_type.name().to_string(),
            qualifier: request.qualifier.clone(),
            dependent: None,
        }
    }

    pub(crate) fn circular_dependency(chain: Vec<String>) -> Self {
        Self::CircularDependency {
            chain,
            dependent: None,
        }
    }

    /// Checks if this error was raised by a nested injection point rather than the request
    /// itself.
    pub(crate) fn has_dependent(&self) -> bool {
        matches!(
            self,
            Self::NoSuchBean {
                dependent: Some(_),
                ..
            } | Self::AmbiguousBean {
                dependent: Some(_),
                ..
            } | Self::CircularDependency {
                dependent: Some(_),
                ..
            }
        )
    }

    /// Names the injection point which failed, unless already named by a nested one.
    pub(crate) fn with_dependent(mut self, point: String) -> Self {
        if let Self::NoSuchBean { dependent, .. }
        | Self::AmbiguousBean { dependent, .. }
        | Self::CircularDependency { dependent, .. } = &mut self
        {
            if dependent.is_none() {
                *dependent = Some(point);
            }
        }
        self
    }

    pub(crate) fn instantiation(
        definition: &BeanDefinition,
        injection_point: Option<String>,
        source: ErrorPtr,
    ) -> Self {
        Self::BeanInstantiation {
            bean: definition.bean_type.name().to_string(),
            injection_point,
            source,
        }
    }
}

/// Errors related to assembling a single bean definition.
#[derive(Error, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BeanDefinitionError {
    #[error("Bean definition of type {0} has no constructor")]
    MissingConstructor(String),
}

/// Errors related to bean definition registries.
#[derive(Error, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BeanDefinitionRegistryError {
    #[error("Cannot register bean of type {0} in a frozen registry")]
    Frozen(String),
    #[error("Invalid bean definition: {0}")]
    InvalidDefinition(#[from] BeanDefinitionError),
}

/// Errors raised while running an interceptor chain.
#[derive(Error, Clone, Eq, PartialEq, Hash, Debug)]
pub enum AopError {
    #[error("Reached the end of the interceptor chain for {method} without a target")]
    NoTarget { method: String },
    #[error("Interceptor returned a value incompatible with {method}, expected: {expected}")]
    IncompatibleReturnValue { method: String, expected: String },
    #[error("Invocation argument {index} is missing or not of type {expected}")]
    ArgumentUnavailable { index: usize, expected: String },
}
