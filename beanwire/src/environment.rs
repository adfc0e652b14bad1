//! Sources of information about the outside world used by conditions and property injection.

use fxhash::{FxHashMap, FxHashSet};
#[cfg(test)]
use mockall::automock;
use std::any::type_name;
use std::sync::Arc;

pub type PropertySourcePtr = Arc<dyn PropertySource + Send + Sync>;

pub type TypePresencePtr = Arc<dyn TypePresence + Send + Sync>;

/// Read-only view of configuration properties.
#[cfg_attr(test, automock)]
pub trait PropertySource {
    fn property(&self, key: &str) -> Option<String>;
}

/// Answers whether a named type is available in the running program.
#[cfg_attr(test, automock)]
pub trait TypePresence {
    fn is_type_present(&self, name: &str) -> bool;
}

/// In-memory [PropertySource].
#[derive(Clone, Debug, Default)]
pub struct MapPropertySource {
    properties: FxHashMap<String, String>,
}

impl MapPropertySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_property<K: ToString, V: ToString>(mut self, key: K, value: V) -> Self {
        self.properties.insert(key.to_string(), value.to_string());
        self
    }
}

impl<K: ToString, V: ToString> FromIterator<(K, V)> for MapPropertySource {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            properties: iter
                .into_iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        }
    }
}

impl PropertySource for MapPropertySource {
    fn property(&self, key: &str) -> Option<String> {
        self.properties.get(key).cloned()
    }
}

/// A fixed set of type names considered present, in addition to registered bean types.
#[derive(Clone, Debug, Default)]
pub struct KnownTypes {
    names: FxHashSet<String>,
}

impl KnownTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name<T: ToString>(mut self, name: T) -> Self {
        self.names.insert(name.to_string());
        self
    }

    pub fn with_type<T: ?Sized>(self) -> Self {
        self.with_name(type_name::<T>())
    }
}

impl TypePresence for KnownTypes {
    fn is_type_present(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use crate::environment::{KnownTypes, MapPropertySource, PropertySource, TypePresence};

    struct Marker;

    #[test]
    fn should_provide_properties() {
        let source = MapPropertySource::new().with_property("engine.cylinders", 8);
        assert_eq!(source.property("engine.cylinders").as_deref(), Some("8"));
        assert!(source.property("engine.type").is_none());
    }

    #[test]
    fn should_collect_properties() {
        let source: MapPropertySource = [("a", "1"), ("b", "2")].into_iter().collect();
        assert_eq!(source.property("b").as_deref(), Some("2"));
    }

    #[test]
    fn should_recognize_known_types() {
        let types = KnownTypes::new().with_type::<Marker>().with_name("serde_json::Value");
        assert!(types.is_type_present(std::any::type_name::<Marker>()));
        assert!(types.is_type_present("serde_json::Value"));
        assert!(!types.is_type_present("tokio::runtime::Runtime"));
    }
}
