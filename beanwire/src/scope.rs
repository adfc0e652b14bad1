//! Bean instances are contained in [Scope]s - containers which decide when to reuse or create
//! an instance. There's a global one for singletons, but there also can be other, specialized ones.
//! Some can be simple, like [PrototypeScope], while other can be quite complex and depend on
//! external factors, e.g. tying the lifetime of instances to a refreshable configuration.
//!
//! Note: scope resolution happens at bean instantiation time, which can lead to unexpected
//! consequences if incompatible scopes are mixed together, e.g. a [singleton](SINGLETON) bean
//! can depend on a [prototype](PROTOTYPE) one. In such case when creating the singleton, a new
//! instance of the dependency will be created, since it's a prototype, but then that single
//! instance will live as long as the singleton lives.
//!
//! ## Concurrent creation
//!
//! [SingletonScope] creates each instance at most once, even when requested from multiple threads
//! at the same time. Threads requesting an instance being created wait for the creator to finish.
//! A wait which would close a cycle between threads creating mutually dependent beans fails with
//! [CircularDependency](BeanContextError::CircularDependency) instead of blocking.

use crate::bean::BeanIdentifier;
use crate::error::BeanContextError;
use crate::provider::BeanAnyPtr;
use fxhash::FxHashMap;
#[cfg(test)]
use mockall::automock;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::{self, ThreadId};

pub type ScopePtr = Arc<dyn Scope + Send + Sync>;

/// Name of the [SingletonScope].
pub const SINGLETON: &str = "SINGLETON";

/// Name of the [PrototypeScope].
pub const PROTOTYPE: &str = "PROTOTYPE";

/// Name of the refreshable singleton-like scope. Instances are discarded when the scope is
/// [refreshed](crate::context::BeanContext::refresh) and recreated on next request.
pub const REFRESH: &str = "REFRESH";

/// A scope containing bean instances. See module documentation for information on scopes.
pub trait Scope {
    /// Gets an instance for given bean, if available in this scope.
    fn instance(&self, identifier: &BeanIdentifier) -> Option<BeanAnyPtr>;

    /// Returns the instance for given bean, creating it with `creator` when missing.
    fn get_or_create(
        &self,
        identifier: &BeanIdentifier,
        creator: &mut dyn FnMut() -> Result<BeanAnyPtr, BeanContextError>,
    ) -> Result<BeanAnyPtr, BeanContextError>;

    /// Removes given instance from the scope.
    fn remove(&self, identifier: &BeanIdentifier) -> Option<BeanAnyPtr>;

    /// Removes all instances, returning them.
    fn clear(&self) -> Vec<(BeanIdentifier, BeanAnyPtr)>;

    /// Checks if the scope keeps instances, which then need to be destroyed by the context.
    fn is_cacheable(&self) -> bool;
}

#[derive(Default)]
enum SlotState {
    #[default]
    Empty,
    Creating(ThreadId),
    Ready(BeanAnyPtr),
}

#[derive(Default)]
struct Slot {
    state: Mutex<SlotState>,
    ready: Condvar,
}

/// Threads currently creating instances and the instances they are waiting for, used to detect
/// creation cycles spanning multiple threads.
#[derive(Default)]
struct WaitGraph {
    owners: FxHashMap<BeanIdentifier, ThreadId>,
    waiting: FxHashMap<ThreadId, BeanIdentifier>,
}

impl WaitGraph {
    /// Returns the chain of instances leading back to `current`, if waiting for `identifier`
    /// would never finish.
    fn find_cycle(&self, identifier: &BeanIdentifier, current: ThreadId) -> Option<Vec<String>> {
        let mut chain = vec![identifier.to_string()];
        let mut next = identifier;

        while chain.len() <= self.waiting.len() + 1 {
            let owner = self.owners.get(next)?;
            if *owner == current {
                chain.push(identifier.to_string());
                return Some(chain);
            }

            next = self.waiting.get(owner)?;
            chain.push(next.to_string());
        }

        None
    }
}

/// Scope for instances shared between beans. Stateless beans are good candidates to be stored in
/// the singleton scope.
#[derive(Default)]
pub struct SingletonScope {
    slots: Mutex<FxHashMap<BeanIdentifier, Arc<Slot>>>,
    graph: Mutex<WaitGraph>,
}

impl Scope for SingletonScope {
    fn instance(&self, identifier: &BeanIdentifier) -> Option<BeanAnyPtr> {
        let slot = self.slots.lock().get(identifier).cloned()?;
        let state = slot.state.lock();
        match &*state {
            SlotState::Ready(instance) => Some(instance.clone()),
            _ => None,
        }
    }

    fn get_or_create(
        &self,
        identifier: &BeanIdentifier,
        creator: &mut dyn FnMut() -> Result<BeanAnyPtr, BeanContextError>,
    ) -> Result<BeanAnyPtr, BeanContextError> {
        let slot = self
            .slots
            .lock()
            .entry(identifier.clone())
            .or_default()
            .clone();

        {
            let current_thread = thread::current().id();
            let mut state = slot.state.lock();
            loop {
                match &*state {
                    SlotState::Ready(instance) => return Ok(instance.clone()),
                    SlotState::Creating(owner) if *owner == current_thread => {
                        return Err(BeanContextError::circular_dependency(vec![
                            identifier.to_string(),
                            identifier.to_string(),
                        ]));
                    }
                    SlotState::Creating(_) => {
                        {
                            let mut graph = self.graph.lock();
                            if let Some(chain) = graph.find_cycle(identifier, current_thread) {
                                return Err(BeanContextError::circular_dependency(chain));
                            }
                            graph.waiting.insert(current_thread, identifier.clone());
                        }

                        slot.ready.wait(&mut state);
                        self.graph.lock().waiting.remove(&current_thread);
                    }
                    SlotState::Empty => {
                        *state = SlotState::Creating(current_thread);
                        self.graph
                            .lock()
                            .owners
                            .insert(identifier.clone(), current_thread);
                        break;
                    }
                }
            }
        }

        let result = creator();

        let mut state = slot.state.lock();
        *state = match &result {
            Ok(instance) => SlotState::Ready(instance.clone()),
            Err(_) => SlotState::Empty,
        };
        self.graph.lock().owners.remove(identifier);
        slot.ready.notify_all();

        result
    }

    fn remove(&self, identifier: &BeanIdentifier) -> Option<BeanAnyPtr> {
        let slot = self.slots.lock().remove(identifier)?;
        let state = std::mem::take(&mut *slot.state.lock());
        match state {
            SlotState::Ready(instance) => Some(instance),
            _ => None,
        }
    }

    fn clear(&self) -> Vec<(BeanIdentifier, BeanAnyPtr)> {
        let slots = std::mem::take(&mut *self.slots.lock());
        slots
            .into_iter()
            .filter_map(|(identifier, slot)| {
                match std::mem::take(&mut *slot.state.lock()) {
                    SlotState::Ready(instance) => Some((identifier, instance)),
                    _ => None,
                }
            })
            .collect()
    }

    #[inline]
    fn is_cacheable(&self) -> bool {
        true
    }
}

/// A scope which creates a new instance of a given bean on each request. Stateful beans usually
/// should be stored in a prototype scope.
#[derive(Default, Copy, Clone, Eq, PartialEq)]
pub struct PrototypeScope;

impl Scope for PrototypeScope {
    #[inline]
    fn instance(&self, _identifier: &BeanIdentifier) -> Option<BeanAnyPtr> {
        None
    }

    #[inline]
    fn get_or_create(
        &self,
        _identifier: &BeanIdentifier,
        creator: &mut dyn FnMut() -> Result<BeanAnyPtr, BeanContextError>,
    ) -> Result<BeanAnyPtr, BeanContextError> {
        creator()
    }

    #[inline]
    fn remove(&self, _identifier: &BeanIdentifier) -> Option<BeanAnyPtr> {
        None
    }

    #[inline]
    fn clear(&self) -> Vec<(BeanIdentifier, BeanAnyPtr)> {
        vec![]
    }

    #[inline]
    fn is_cacheable(&self) -> bool {
        false
    }
}

/// Factory for custom [Scope]s.
#[cfg_attr(test, automock)]
pub trait ScopeFactory {
    fn create_scope(&self) -> ScopePtr;
}

#[derive(Copy, Clone, Eq, PartialEq, Default)]
pub struct SingletonScopeFactory;

impl ScopeFactory for SingletonScopeFactory {
    fn create_scope(&self) -> ScopePtr {
        Arc::<SingletonScope>::default()
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Default)]
pub struct PrototypeScopeFactory;

impl ScopeFactory for PrototypeScopeFactory {
    fn create_scope(&self) -> ScopePtr {
        Arc::<PrototypeScope>::default()
    }
}

#[cfg(test)]
mod tests {
    use crate::bean::{BeanIdentifier, BeanType};
    use crate::error::BeanContextError;
    use crate::provider::{BeanAnyPtr, BeanPtr};
    use crate::scope::{PrototypeScopeFactory, ScopeFactory, SingletonScopeFactory};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    fn identifier(index: usize) -> BeanIdentifier {
        BeanIdentifier {
            bean_type: BeanType::of::<u8>(),
            name: None,
            index,
        }
    }

    #[test]
    fn should_support_singletons() {
        let scope = SingletonScopeFactory.create_scope();
        let identifier = identifier(0);

        let first = scope
            .get_or_create(&identifier, &mut || Ok(BeanPtr::new(0_u8) as BeanAnyPtr))
            .unwrap();
        let second = scope
            .get_or_create(&identifier, &mut || Ok(BeanPtr::new(1_u8) as BeanAnyPtr))
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(scope.instance(&identifier).is_some());
        assert!(scope.is_cacheable());
    }

    #[test]
    fn should_support_prototypes() {
        let scope = PrototypeScopeFactory.create_scope();
        let identifier = identifier(0);

        let first = scope
            .get_or_create(&identifier, &mut || Ok(BeanPtr::new(0_u8) as BeanAnyPtr))
            .unwrap();
        let second = scope
            .get_or_create(&identifier, &mut || Ok(BeanPtr::new(0_u8) as BeanAnyPtr))
            .unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert!(scope.instance(&identifier).is_none());
        assert!(!scope.is_cacheable());
    }

    #[test]
    fn should_allow_retry_after_failure() {
        let scope = SingletonScopeFactory.create_scope();
        let identifier = identifier(0);

        assert!(scope
            .get_or_create(&identifier, &mut || Err(BeanContextError::ContextClosed))
            .is_err());
        assert!(scope
            .get_or_create(&identifier, &mut || Ok(BeanPtr::new(0_u8) as BeanAnyPtr))
            .is_ok());
    }

    #[test]
    fn should_detect_reentrant_creation() {
        let scope = SingletonScopeFactory.create_scope();
        let identifier = identifier(0);

        let result = scope.get_or_create(&identifier, &mut || {
            scope.get_or_create(&identifier, &mut || Ok(BeanPtr::new(0_u8) as BeanAnyPtr))
        });

        assert!(matches!(
            result,
            Err(BeanContextError::CircularDependency { .. })
        ));
    }

    #[test]
    fn should_detect_cycles_across_threads() {
        let scope = SingletonScopeFactory.create_scope();
        let barrier = Arc::new(Barrier::new(2));

        let handles = [(0, 1), (1, 0)]
            .into_iter()
            .map(|(own, other)| {
                let scope = scope.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    scope.get_or_create(&identifier(own), &mut || {
                        barrier.wait();
                        scope.get_or_create(&identifier(other), &mut || {
                            Ok(BeanPtr::new(other as u8) as BeanAnyPtr)
                        })
                    })
                })
            })
            .collect::<Vec<_>>();

        let results = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect::<Vec<_>>();

        assert_eq!(
            results
                .iter()
                .filter(|result| matches!(
                    result,
                    Err(BeanContextError::CircularDependency { .. })
                ))
                .count(),
            1
        );
        assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    }

    #[test]
    fn should_clear_instances() {
        let scope = SingletonScopeFactory.create_scope();
        scope
            .get_or_create(&identifier(0), &mut || Ok(BeanPtr::new(0_u8) as BeanAnyPtr))
            .unwrap();
        scope
            .get_or_create(&identifier(1), &mut || Ok(BeanPtr::new(1_u8) as BeanAnyPtr))
            .unwrap();

        assert!(scope.remove(&identifier(0)).is_some());
        assert_eq!(scope.clear().len(), 1);
        assert!(scope.instance(&identifier(1)).is_none());
    }

    #[test]
    fn should_create_singleton_once_across_threads() {
        let scope = SingletonScopeFactory.create_scope();
        let created = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles = (0..8)
            .map(|_| {
                let scope = scope.clone();
                let created = created.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    scope
                        .get_or_create(&identifier(0), &mut || {
                            created.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(10));
                            Ok(BeanPtr::new(0_u8) as BeanAnyPtr)
                        })
                        .unwrap()
                })
            })
            .collect::<Vec<_>>();

        let instances = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect::<Vec<_>>();

        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert!(instances
            .iter()
            .all(|instance| Arc::ptr_eq(instance, &instances[0])));
    }
}
