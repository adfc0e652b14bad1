//! Functionality related to registering definitions of beans. [BeanDefinitionRegistry] stores
//! every known [BeanDefinition], indexed by all the types each bean exposes.
//!
//! ## Automatic registration
//!
//! Beans using `#[derive(Bean)]` are registered automatically when the program starts and can be
//! collected with [BeanDefinitionRegistry::from_static]. Manually defined beans can be added to a
//! registry with [BeanDefinitionRegistry::register].
//!
//! ## Replacements
//!
//! A definition declaring [Replaces] removes all matching definitions from the registry, no matter
//! if they were registered before or after it. A replacement which doesn't match anything is
//! simply ignored.

use crate::bean::{BeanDefinition, BeanType, Replaces};
use crate::error::{BeanDefinitionError, BeanDefinitionRegistryError};
use crate::qualifier::{Qualifier, TypeHierarchy};
use fxhash::{FxHashMap, FxHashSet};
use itertools::Itertools;
use std::any::TypeId;
use std::sync::Arc;
use tracing::debug;

pub type BeanDefinitionPtr = Arc<BeanDefinition>;

/// Registry of bean definitions, frozen once a context is built on top of it.
#[derive(Clone, Debug, Default)]
pub struct BeanDefinitionRegistry {
    definitions: Vec<BeanDefinitionPtr>,
    by_type: FxHashMap<TypeId, Vec<BeanDefinitionPtr>>,
    exposed_types: FxHashMap<TypeId, FxHashSet<TypeId>>,
    replacements: Vec<Replaces>,
    next_index: usize,
    frozen: bool,
}

impl BeanDefinitionRegistry {
    /// Creates a registry containing all automatically registered definitions.
    pub fn from_static() -> Result<Self, BeanDefinitionRegistryError> {
        let mut registry = Self::default();
        for definition in Self::static_definitions()? {
            registry.register(definition)?;
        }

        Ok(registry)
    }

    /// Assembles all automatically registered definitions.
    pub fn static_definitions() -> Result<Vec<BeanDefinition>, BeanDefinitionError> {
        inventory::iter::<internal::BeanDefinitionRegisterer>
            .into_iter()
            .map(|registerer| (registerer.register)())
            .try_collect()
    }

    /// Registers a new definition. Returns `None` if the definition has been replaced by an
    /// already registered one.
    pub fn register(
        &mut self,
        mut definition: BeanDefinition,
    ) -> Result<Option<BeanDefinitionPtr>, BeanDefinitionRegistryError> {
        if self.frozen {
            return Err(BeanDefinitionRegistryError::Frozen(
                definition.bean_type.name().to_string(),
            ));
        }

        if let Some(replacement) = self
            .replacements
            .iter()
            .find(|replacement| replacement.matches(&definition))
        {
            debug!(
                bean = %definition.bean_type,
                replaced = %replacement.bean_type,
                "Skipping replaced bean definition"
            );
            return Ok(None);
        }

        definition.index = self.next_index;
        self.next_index += 1;

        if let Some(replaces) = &definition.replaces {
            self.remove_replaced(replaces);
            self.replacements.push(replaces.clone());
        }

        debug!(bean = %definition.identifier(), "Registering bean definition");

        let definition = Arc::new(definition);
        for exposed in &definition.exposed {
            self.by_type
                .entry(exposed.bean_type.id())
                .or_default()
                .push(definition.clone());
            self.exposed_types
                .entry(definition.bean_type.id())
                .or_default()
                .insert(exposed.bean_type.id());
        }

        self.definitions.push(definition.clone());
        Ok(Some(definition))
    }

    fn remove_replaced(&mut self, replaces: &Replaces) {
        let removed: FxHashSet<usize> = self
            .definitions
            .iter()
            .filter(|definition| replaces.matches(definition))
            .map(|definition| {
                debug!(bean = %definition.identifier(), "Removing replaced bean definition");
                definition.index()
            })
            .collect();

        if removed.is_empty() {
            return;
        }

        self.definitions
            .retain(|definition| !removed.contains(&definition.index()));
        for definitions in self.by_type.values_mut() {
            definitions.retain(|definition| !removed.contains(&definition.index()));
        }

        self.exposed_types.clear();
        for definition in &self.definitions {
            self.exposed_types
                .entry(definition.bean_type.id())
                .or_default()
                .extend(definition.exposed.iter().map(|exposed| exposed.bean_type.id()));
        }
    }

    /// Returns all definitions exposing given type, in registration order.
    pub fn find_candidates(&self, type_id: TypeId) -> Vec<BeanDefinitionPtr> {
        self.by_type.get(&type_id).cloned().unwrap_or_default()
    }

    /// Returns definitions exposing given type, narrowed by an optional qualifier.
    pub fn find_candidates_qualified(
        &self,
        bean_type: &BeanType,
        qualifier: Option<&Qualifier>,
    ) -> Vec<BeanDefinitionPtr> {
        let candidates = self.find_candidates(bean_type.id());
        match qualifier {
            Some(qualifier) => qualifier.filter(bean_type, candidates, self),
            None => candidates,
        }
    }

    /// All definitions in registration order.
    pub fn definitions(&self) -> impl Iterator<Item = &BeanDefinitionPtr> {
        self.definitions.iter()
    }

    pub fn contains(&self, type_id: TypeId) -> bool {
        self.by_type
            .get(&type_id)
            .map(|definitions| !definitions.is_empty())
            .unwrap_or(false)
    }

    /// Checks if a bean with given full or simple type name is registered.
    pub fn is_type_name_registered(&self, name: &str) -> bool {
        self.definitions.iter().any(|definition| {
            definition.bean_type.name() == name || definition.bean_type.simple_name() == name
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Prevents further registrations.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}

impl TypeHierarchy for BeanDefinitionRegistry {
    fn is_assignable(&self, from: TypeId, to: TypeId) -> bool {
        from == to
            || self
                .exposed_types
                .get(&from)
                .map(|exposed| exposed.contains(&to))
                .unwrap_or(false)
    }
}

#[doc(hidden)]
pub mod internal {
    use crate::bean::BeanDefinition;
    use crate::error::BeanDefinitionError;
    pub use inventory::submit;

    pub struct BeanDefinitionRegisterer {
        pub register: fn() -> Result<BeanDefinition, BeanDefinitionError>,
    }

    inventory::collect!(BeanDefinitionRegisterer);
}
