//! Conditional bean support. A bean definition can carry [Condition]s which all need to pass for
//! the bean to be eligible for injection. Conditions are evaluated lazily, when a bean is looked
//! up, against the current properties, known types and other registered beans.
//!
//! ```
//! use beanwire::bean::BeanDefinition;
//! use beanwire::condition::Condition;
//!
//! struct CachingService;
//!
//! let definition = BeanDefinition::builder::<CachingService>()
//!     .requires(Condition::property_equals("cache.enabled", "true"))
//!     .constructor(|_| Ok(CachingService))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(definition.conditions.len(), 1);
//! ```
//!
//! Conditions which check other beans are themselves subject to those beans' conditions. A
//! condition which ends up depending on its own outcome is reported as
//! [BeanContextError::CyclicCondition].

use crate::bean::{BeanDefinition, BeanType};
use crate::error::BeanContextError;
use crate::environment::{PropertySource, TypePresence};
use crate::provider::ErrorPtr;
use crate::registry::BeanDefinitionRegistry;
use derivative::Derivative;
use fxhash::{FxHashMap, FxHashSet};
#[cfg(test)]
use mockall::automock;
use parking_lot::RwLock;
use std::any::TypeId;
use std::cell::RefCell;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tracing::trace;

pub type ConditionPredicate =
    Arc<dyn Fn(&dyn ConditionContext) -> Result<bool, ErrorPtr> + Send + Sync>;

/// Information available to conditions during evaluation.
#[cfg_attr(test, automock)]
pub trait ConditionContext {
    fn property(&self, key: &str) -> Option<String>;

    fn is_type_present(&self, name: &str) -> bool;

    /// Checks if there's an eligible bean exposing given type.
    fn contains_bean(&self, type_id: TypeId) -> Result<bool, BeanContextError>;
}

#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub enum Condition {
    PropertyExists(String),
    PropertyMissing(String),
    PropertyEquals {
        key: String,
        value: String,
    },
    PropertyNotEquals {
        key: String,
        value: String,
    },
    BeanPresent(BeanType),
    BeanAbsent(BeanType),
    TypePresent(String),
    TypeAbsent(String),
    Custom {
        name: String,
        #[derivative(Debug = "ignore")]
        predicate: ConditionPredicate,
    },
}

impl Condition {
    pub fn property_exists<T: ToString>(key: T) -> Self {
        Self::PropertyExists(key.to_string())
    }

    pub fn property_missing<T: ToString>(key: T) -> Self {
        Self::PropertyMissing(key.to_string())
    }

    pub fn property_equals<K: ToString, V: ToString>(key: K, value: V) -> Self {
        Self::PropertyEquals {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    pub fn property_not_equals<K: ToString, V: ToString>(key: K, value: V) -> Self {
        Self::PropertyNotEquals {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    pub fn bean_present<T: ?Sized + 'static>() -> Self {
        Self::BeanPresent(BeanType::of::<T>())
    }

    pub fn bean_absent<T: ?Sized + 'static>() -> Self {
        Self::BeanAbsent(BeanType::of::<T>())
    }

    pub fn type_present<T: ToString>(name: T) -> Self {
        Self::TypePresent(name.to_string())
    }

    pub fn type_absent<T: ToString>(name: T) -> Self {
        Self::TypeAbsent(name.to_string())
    }

    pub fn custom<T, F>(name: T, predicate: F) -> Self
    where
        T: ToString,
        F: Fn(&dyn ConditionContext) -> Result<bool, ErrorPtr> + Send + Sync + 'static,
    {
        Self::Custom {
            name: name.to_string(),
            predicate: Arc::new(predicate),
        }
    }

    /// Evaluates this condition in given context.
    pub fn matches(&self, context: &dyn ConditionContext) -> Result<bool, BeanContextError> {
        Ok(match self {
            Condition::PropertyExists(key) => context.property(key).is_some(),
            Condition::PropertyMissing(key) => context.property(key).is_none(),
            Condition::PropertyEquals { key, value } => {
                context.property(key).as_deref() == Some(value.as_str())
            }
            Condition::PropertyNotEquals { key, value } => {
                context.property(key).as_deref() != Some(value.as_str())
            }
            Condition::BeanPresent(bean_type) => context.contains_bean(bean_type.id())?,
            Condition::BeanAbsent(bean_type) => !context.contains_bean(bean_type.id())?,
            Condition::TypePresent(name) => context.is_type_present(name),
            Condition::TypeAbsent(name) => !context.is_type_present(name),
            Condition::Custom { name, predicate } => {
                predicate(context).map_err(|source| BeanContextError::ConditionFailed {
                    condition: name.clone(),
                    source,
                })?
            }
        })
    }

    /// Type presence doesn't change while the program runs, so such results can be cached.
    pub fn is_static(&self) -> bool {
        matches!(self, Condition::TypePresent(_) | Condition::TypeAbsent(_))
    }
}

impl Display for Condition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Condition::PropertyExists(key) => write!(f, "property '{key}' exists"),
            Condition::PropertyMissing(key) => write!(f, "property '{key}' is missing"),
            Condition::PropertyEquals { key, value } => write!(f, "property '{key}' = '{value}'"),
            Condition::PropertyNotEquals { key, value } => {
                write!(f, "property '{key}' != '{value}'")
            }
            Condition::BeanPresent(bean_type) => write!(f, "bean {bean_type} is present"),
            Condition::BeanAbsent(bean_type) => write!(f, "bean {bean_type} is absent"),
            Condition::TypePresent(name) => write!(f, "type {name} is present"),
            Condition::TypeAbsent(name) => write!(f, "type {name} is absent"),
            Condition::Custom { name, .. } => f.write_str(name),
        }
    }
}

pub(crate) type ConditionCache = RwLock<FxHashMap<usize, bool>>;

/// Evaluates definition conditions, tracking conditions in progress to detect cycles. Meant to be
/// created for a single lookup.
pub struct ConditionEvaluator<'a> {
    registry: &'a BeanDefinitionRegistry,
    properties: &'a dyn PropertySource,
    types: &'a dyn TypePresence,
    cache: Option<&'a ConditionCache>,
    in_progress: RefCell<FxHashSet<(usize, usize)>>,
}

impl<'a> ConditionEvaluator<'a> {
    pub fn new(
        registry: &'a BeanDefinitionRegistry,
        properties: &'a dyn PropertySource,
        types: &'a dyn TypePresence,
    ) -> Self {
        Self {
            registry,
            properties,
            types,
            cache: None,
            in_progress: Default::default(),
        }
    }

    pub(crate) fn with_cache(mut self, cache: &'a ConditionCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Checks if all conditions of given definition pass.
    pub fn is_eligible(&self, definition: &BeanDefinition) -> Result<bool, BeanContextError> {
        if definition.conditions.is_empty() {
            return Ok(true);
        }

        let cache = self
            .cache
            .filter(|_| definition.conditions.iter().all(Condition::is_static));
        if let Some(eligible) = cache.and_then(|cache| cache.read().get(&definition.index()).copied())
        {
            return Ok(eligible);
        }

        let mut eligible = true;
        for (position, condition) in definition.conditions.iter().enumerate() {
            let key = (definition.index(), position);
            if !self.in_progress.borrow_mut().insert(key) {
                return Err(BeanContextError::CyclicCondition {
                    bean: definition.bean_type.name().to_string(),
                    condition: condition.to_string(),
                });
            }

            let result = condition.matches(self);
            self.in_progress.borrow_mut().remove(&key);

            if !result? {
                trace!(bean = %definition.bean_type, %condition, "Condition not met");
                eligible = false;
                break;
            }
        }

        if let Some(cache) = cache {
            cache.write().insert(definition.index(), eligible);
        }

        Ok(eligible)
    }
}

impl ConditionContext for ConditionEvaluator<'_> {
    fn property(&self, key: &str) -> Option<String> {
        self.properties.property(key)
    }

    fn is_type_present(&self, name: &str) -> bool {
        self.types.is_type_present(name) || self.registry.is_type_name_registered(name)
    }

    fn contains_bean(&self, type_id: TypeId) -> Result<bool, BeanContextError> {
        for definition in self.registry.find_candidates(type_id) {
            if self.is_eligible(&definition)? {
                return Ok(true);
            }
        }

        Ok(false)
    }
}
