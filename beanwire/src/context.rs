//! Core functionality for creating and managing bean instances. [BeanContext] uses definitions
//! from the [BeanDefinitionRegistry] and [scopes](crate::scope) to create, store and finally
//! destroy instances.
//!
//! ## Resolution
//!
//! Every request goes through the same steps: candidate definitions exposing the requested type
//! are found, their [conditions](crate::condition) are evaluated, the [qualifier](crate::qualifier)
//! narrows them down and finally the selected definitions are instantiated through their scope.
//! Instantiation resolves constructor arguments, runs the constructor (possibly wrapped in
//! construction interceptors), performs field and method injections, calls post-construct
//! callbacks and, for intercepted beans, wraps the instance in a proxy.
//!
//! ## Lifecycle
//!
//! [BeanContext::start] creates all eager beans, optionally in parallel. [BeanContext::close]
//! destroys all cached instances in reverse creation order, calling their pre-destroy callbacks.
//!
//! ```
//! use beanwire::bean::BeanDefinition;
//! use beanwire::context::BeanContextBuilder;
//! use beanwire::injection::InjectionPoint;
//! use beanwire::provider::{BeanPtr, TypedBeanProvider};
//!
//! struct Engine;
//!
//! struct Vehicle {
//!     engine: BeanPtr<Engine>,
//! }
//!
//! let context = BeanContextBuilder::empty()
//!     .with_definition(
//!         BeanDefinition::builder::<Engine>()
//!             .constructor(|_| Ok(Engine))
//!             .build()
//!             .unwrap(),
//!     )
//!     .with_definition(
//!         BeanDefinition::builder::<Vehicle>()
//!             .constructor_arg(InjectionPoint::bean::<Engine>("engine"))
//!             .constructor(|arguments| {
//!                 Ok(Vehicle {
//!                     engine: arguments.bean(0)?,
//!                 })
//!             })
//!             .build()
//!             .unwrap(),
//!     )
//!     .build()
//!     .unwrap();
//!
//! context.start().unwrap();
//! let vehicle = context.get_bean::<Vehicle>(None).unwrap();
//! assert!(BeanPtr::ptr_eq(&vehicle.engine, &context.get_bean::<Engine>(None).unwrap()));
//! context.close().unwrap();
//! ```

use crate::aop::{
    ConstructorInvocation, InterceptedMethods, Interceptor, InterceptorPtr, MethodMetadata,
};
use crate::bean::{
    BeanDefinition, BeanIdentifier, BeanRequest, Cardinality, Interception, ProxyKind,
};
use crate::condition::{ConditionCache, ConditionEvaluator};
use crate::environment::{
    KnownTypes, MapPropertySource, PropertySourcePtr, TypePresencePtr,
};
use crate::error::{BeanContextError, BeanDefinitionError, BeanDefinitionRegistryError};
use crate::event::{ContextEvent, ContextEventListenerPtr, EventPublisher};
use crate::injection::{Arguments, ExplicitArguments, InjectionPoint, Requirement};
use crate::provider::{downcast_value, BeanAnyPtr, BeanPtr, BeanProvider, CastValue, ErrorPtr};
use crate::qualifier;
use crate::registry::{BeanDefinitionPtr, BeanDefinitionRegistry};
use crate::resolution::ResolutionContext;
use crate::scope::{
    PrototypeScopeFactory, ScopeFactory, ScopePtr, SingletonScopeFactory, PROTOTYPE, REFRESH,
    SINGLETON,
};
use fxhash::{FxHashMap, FxHashSet};
use itertools::Itertools;
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use std::any::Any;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

pub type ScopeFactoryPtr = Box<dyn ScopeFactory + Send + Sync>;

pub type ScopeFactoryRegistry = FxHashMap<String, ScopeFactoryPtr>;

/// Builder for [BeanContext] with sensible defaults, for easy construction.
pub struct BeanContextBuilder {
    definitions: Vec<BeanDefinition>,
    scope_factories: ScopeFactoryRegistry,
    property_source: PropertySourcePtr,
    type_presence: TypePresencePtr,
    listeners: Vec<ContextEventListenerPtr>,
    parallel_initialization: bool,
}

impl BeanContextBuilder {
    /// Creates a new builder containing all automatically registered definitions.
    pub fn new() -> Result<Self, BeanDefinitionError> {
        BeanDefinitionRegistry::static_definitions()
            .map(|definitions| Self::empty().with_definitions(definitions))
    }

    /// Creates a new builder without any definitions.
    pub fn empty() -> Self {
        Self {
            definitions: vec![],
            scope_factories: [
                (
                    SINGLETON.to_string(),
                    Box::<SingletonScopeFactory>::default() as ScopeFactoryPtr,
                ),
                (
                    PROTOTYPE.to_string(),
                    Box::<PrototypeScopeFactory>::default() as ScopeFactoryPtr,
                ),
                (
                    REFRESH.to_string(),
                    Box::<SingletonScopeFactory>::default() as ScopeFactoryPtr,
                ),
            ]
            .into_iter()
            .collect(),
            property_source: Arc::new(MapPropertySource::default()),
            type_presence: Arc::new(KnownTypes::default()),
            listeners: vec![],
            parallel_initialization: false,
        }
    }

    /// Adds a definition to register.
    pub fn with_definition(mut self, definition: BeanDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    pub fn with_definitions<I: IntoIterator<Item = BeanDefinition>>(
        mut self,
        definitions: I,
    ) -> Self {
        self.definitions.extend(definitions);
        self
    }

    /// Sets new scope factories.
    pub fn with_scope_factories(mut self, scope_factories: ScopeFactoryRegistry) -> Self {
        self.scope_factories = scope_factories;
        self
    }

    /// Adds a new scope factory.
    pub fn with_scope_factory<T: ToString>(mut self, name: T, factory: ScopeFactoryPtr) -> Self {
        self.scope_factories.insert(name.to_string(), factory);
        self
    }

    pub fn with_property_source(mut self, property_source: PropertySourcePtr) -> Self {
        self.property_source = property_source;
        self
    }

    pub fn with_type_presence(mut self, type_presence: TypePresencePtr) -> Self {
        self.type_presence = type_presence;
        self
    }

    pub fn with_listener(mut self, listener: ContextEventListenerPtr) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Creates eager beans on multiple threads when starting.
    pub fn with_parallel_initialization(mut self, parallel_initialization: bool) -> Self {
        self.parallel_initialization = parallel_initialization;
        self
    }

    /// Registers all definitions and builds resulting [BeanContext].
    pub fn build(self) -> Result<BeanContext, BeanDefinitionRegistryError> {
        let mut registry = BeanDefinitionRegistry::default();
        for definition in self.definitions {
            registry.register(definition)?;
        }
        registry.freeze();

        let scopes = self
            .scope_factories
            .iter()
            .map(|(name, factory)| (name.clone(), factory.create_scope()))
            .collect();

        Ok(BeanContext {
            registry,
            property_source: self.property_source,
            type_presence: self.type_presence,
            scopes,
            events: EventPublisher::new(self.listeners),
            parallel_initialization: self.parallel_initialization,
            condition_cache: Default::default(),
            disposables: Default::default(),
            proxies: Default::default(),
            state: RwLock::new(ContextState::Created),
        })
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ContextState {
    Created,
    Running,
    Closed,
}

/// A created instance which needs to be destroyed with its scope.
struct DisposableBean {
    identifier: BeanIdentifier,
    scope: String,
    definition: BeanDefinitionPtr,
    instance: BeanAnyPtr,
}

/// Generic container for beans. Resolves dependencies between beans, creates instances and manages
/// their lifecycle.
///
/// Singleton creation blocks other threads requesting the same bean until it completes. A
/// constructor must not wait for another thread which resolves beans from the same context, or
/// both will deadlock.
pub struct BeanContext {
    registry: BeanDefinitionRegistry,
    property_source: PropertySourcePtr,
    type_presence: TypePresencePtr,
    scopes: FxHashMap<String, ScopePtr>,
    events: EventPublisher,
    parallel_initialization: bool,
    condition_cache: ConditionCache,
    disposables: Mutex<Vec<DisposableBean>>,
    proxies: Mutex<FxHashMap<usize, Weak<dyn Any + Send + Sync>>>,
    state: RwLock<ContextState>,
}

impl BeanContext {
    #[inline]
    pub fn registry(&self) -> &BeanDefinitionRegistry {
        &self.registry
    }

    /// Creates all eager beans. Fails with the first error encountered, in which case the context
    /// gets closed.
    pub fn start(&self) -> Result<(), BeanContextError> {
        {
            let mut state = self.state.write();
            match *state {
                ContextState::Created => *state = ContextState::Running,
                ContextState::Running => return Ok(()),
                ContextState::Closed => return Err(BeanContextError::ContextClosed),
            }
        }

        info!(definitions = self.registry.len(), "Starting bean context");

        let result = self.eager_definitions().and_then(|eager| {
            debug!(count = eager.len(), "Creating eager beans");
            if self.parallel_initialization {
                eager
                    .par_iter()
                    .try_for_each(|definition| self.initialize(definition))
            } else {
                eager
                    .iter()
                    .try_for_each(|definition| self.initialize(definition))
            }
        });

        if let Err(error) = result {
            warn!(%error, "Bean context failed to start");
            if let Err(close_error) = self.close() {
                warn!(error = %close_error, "Error closing bean context after failed start");
            }
            return Err(error);
        }

        self.events.publish(ContextEvent::Started);
        Ok(())
    }

    fn eager_definitions(&self) -> Result<Vec<BeanDefinitionPtr>, BeanContextError> {
        let evaluator = self.evaluator();
        let mut eager = vec![];
        for definition in self.registry.definitions().filter(|definition| definition.eager) {
            if evaluator.is_eligible(definition)? {
                eager.push(definition.clone());
            } else {
                debug!(bean = %definition.identifier(), "Skipping eager bean with unmet conditions");
            }
        }

        Ok(eager)
    }

    fn initialize(&self, definition: &BeanDefinitionPtr) -> Result<(), BeanContextError> {
        let mut resolution = ResolutionContext::new();
        self.resolve_definition(definition, &mut resolution)
            .map(|_| ())
    }

    /// Destroys all cached instances in reverse creation order. Errors from individual beans don't
    /// stop the process, but are reported together afterwards.
    pub fn close(&self) -> Result<(), BeanContextError> {
        {
            let mut state = self.state.write();
            if *state == ContextState::Closed {
                return Ok(());
            }
            *state = ContextState::Closed;
        }

        info!("Closing bean context");

        let disposables = std::mem::take(&mut *self.disposables.lock());
        let failures = self.destroy(disposables);

        for scope in self.scopes.values() {
            scope.clear();
        }
        self.proxies.lock().clear();

        self.events.publish(ContextEvent::Stopped);

        if failures.is_empty() {
            Ok(())
        } else {
            Err(BeanContextError::DestructionFailed(failures))
        }
    }

    /// Discards all instances of given scope, destroying them. They get recreated on next request.
    pub fn refresh(&self, scope_name: &str) -> Result<(), BeanContextError> {
        self.ensure_open()?;

        if scope_name == SINGLETON {
            return Err(BeanContextError::UnrefreshableScope(scope_name.to_string()));
        }

        let scope = self
            .scopes
            .get(scope_name)
            .ok_or_else(|| BeanContextError::UnrecognizedScope(scope_name.to_string()))?;

        let evicted: FxHashSet<BeanIdentifier> = scope
            .clear()
            .into_iter()
            .map(|(identifier, _)| identifier)
            .collect();

        info!(scope = scope_name, count = evicted.len(), "Refreshing scope");

        let refreshed = {
            let mut disposables = self.disposables.lock();
            let (refreshed, kept): (Vec<_>, Vec<_>) =
                disposables.drain(..).partition(|disposable| {
                    disposable.scope == scope_name && evicted.contains(&disposable.identifier)
                });
            *disposables = kept;
            refreshed
        };

        let failures = self.destroy(refreshed);
        if failures.is_empty() {
            Ok(())
        } else {
            Err(BeanContextError::DestructionFailed(failures))
        }
    }

    fn destroy(&self, disposables: Vec<DisposableBean>) -> Vec<BeanContextError> {
        disposables
            .into_iter()
            .rev()
            .filter_map(|disposable| {
                debug!(bean = %disposable.identifier, "Destroying bean");

                let result = disposable
                    .definition
                    .pre_destroy
                    .iter()
                    .try_for_each(|callback| callback(disposable.instance.as_ref()));

                self.events
                    .publish(ContextEvent::BeanDestroyed(disposable.identifier.clone()));

                result.err().map(|source| {
                    let error = BeanContextError::BeanDestruction {
                        bean: disposable.identifier.to_string(),
                        source,
                    };
                    warn!(%error, "Error destroying bean");
                    error
                })
            })
            .collect()
    }

    /// Checks if given bean is a proxy created by this context.
    pub fn is_proxy<T: ?Sized>(&self, bean: &BeanPtr<T>) -> bool {
        let address = BeanPtr::as_ptr(bean) as *const () as usize;
        self.proxies
            .lock()
            .get(&address)
            .and_then(Weak::upgrade)
            .map(|proxy| BeanPtr::as_ptr(&proxy) as *const () as usize == address)
            .unwrap_or(false)
    }

    fn register_proxy(&self, proxy: &BeanAnyPtr) {
        let mut proxies = self.proxies.lock();
        proxies.retain(|_, proxy| proxy.strong_count() > 0);
        proxies.insert(
            BeanPtr::as_ptr(proxy) as *const () as usize,
            BeanPtr::downgrade(proxy),
        );
    }

    fn ensure_open(&self) -> Result<(), BeanContextError> {
        if *self.state.read() == ContextState::Closed {
            Err(BeanContextError::ContextClosed)
        } else {
            Ok(())
        }
    }

    fn evaluator(&self) -> ConditionEvaluator<'_> {
        ConditionEvaluator::new(
            &self.registry,
            self.property_source.as_ref(),
            self.type_presence.as_ref(),
        )
        .with_cache(&self.condition_cache)
    }

    /// Finds eligible definitions matching the request. Condition evaluation errors make a
    /// candidate ineligible, but are reported if no candidate is left for a required request.
    fn candidates(&self, request: &BeanRequest) -> Result<Vec<BeanDefinitionPtr>, BeanContextError> {
        let evaluator = self.evaluator();
        let mut failures = vec![];

        let eligible = self
            .registry
            .find_candidates(request.bean_type.id())
            .into_iter()
            .filter(|definition| match evaluator.is_eligible(definition) {
                Ok(eligible) => eligible,
                Err(error) => {
                    warn!(bean = %definition.identifier(), %error, "Cannot evaluate bean conditions");
                    failures.push(error);
                    false
                }
            })
            .collect_vec();

        match qualifier::select(request, eligible, &self.registry) {
            Err(BeanContextError::NoSuchBean { .. }) if !failures.is_empty() => {
                Err(failures.swap_remove(0))
            }
            result => result,
        }
    }

    fn resolve_request(
        &self,
        request: &BeanRequest,
        resolution: &mut ResolutionContext,
    ) -> Result<Vec<CastValue>, BeanContextError> {
        self.candidates(request)?
            .iter()
            .map(|definition| {
                self.resolve_definition(definition, resolution)
                    .and_then(|instance| definition.cast(&request.bean_type, instance))
            })
            .collect()
    }

    fn resolve_definition(
        &self,
        definition: &BeanDefinitionPtr,
        resolution: &mut ResolutionContext,
    ) -> Result<BeanAnyPtr, BeanContextError> {
        let identifier = definition.identifier();
        let scope = self
            .scopes
            .get(&definition.scope)
            .ok_or_else(|| BeanContextError::UnrecognizedScope(definition.scope.clone()))?;

        resolution.push(&identifier)?;
        let tracked = scope.is_cacheable();
        let result = scope.get_or_create(&identifier, &mut || {
            self.instantiate(definition, &identifier, resolution, tracked)
        });
        resolution.pop();

        result
    }

    fn instantiate(
        &self,
        definition: &BeanDefinitionPtr,
        identifier: &BeanIdentifier,
        resolution: &mut ResolutionContext,
        tracked: bool,
    ) -> Result<BeanAnyPtr, BeanContextError> {
        debug!(bean = %identifier, "Creating bean");

        let mut arguments = if resolution.depth() == 1 {
            resolution.take_arguments()
        } else {
            None
        };

        let (instance, raw) = match &definition.interception {
            Some(Interception {
                kind: ProxyKind::Introduction,
                methods,
                factory,
            }) => {
                let methods = self.intercepted_methods(methods, resolution)?;
                let proxy = factory(None, methods)
                    .map_err(|source| BeanContextError::instantiation(definition, None, source))?;
                self.register_proxy(&proxy);
                (proxy.clone(), proxy)
            }
            interception => {
                let raw = self.construct(definition, &mut arguments, resolution)?;
                match interception {
                    Some(Interception {
                        methods, factory, ..
                    }) => {
                        let methods = self.intercepted_methods(methods, resolution)?;
                        let proxy = factory(Some(raw.clone()), methods).map_err(|source| {
                            BeanContextError::instantiation(definition, None, source)
                        })?;
                        self.register_proxy(&proxy);
                        (proxy, raw)
                    }
                    None => (raw.clone(), raw),
                }
            }
        };

        if tracked {
            self.disposables.lock().push(DisposableBean {
                identifier: identifier.clone(),
                scope: definition.scope.clone(),
                definition: definition.clone(),
                instance: raw,
            });
        }

        self.events
            .publish(ContextEvent::BeanCreated(identifier.clone()));

        Ok(instance)
    }

    fn construct(
        &self,
        definition: &BeanDefinitionPtr,
        overrides: &mut Option<ExplicitArguments>,
        resolution: &mut ResolutionContext,
    ) -> Result<BeanAnyPtr, BeanContextError> {
        let constructor = definition.constructor.as_ref().ok_or_else(|| {
            BeanContextError::instantiation(
                definition,
                None,
                Arc::new(BeanDefinitionError::MissingConstructor(
                    definition.bean_type.name().to_string(),
                )),
            )
        })?;

        let mut arguments = self.resolve_arguments(
            definition,
            &definition.constructor_arguments,
            overrides,
            resolution,
        )?;

        let constructed = if definition.construct_bindings.is_empty() {
            constructor(&mut arguments)
        } else {
            let interceptors = self
                .resolve_interceptors(resolution)?
                .into_iter()
                .filter(|interceptor| {
                    definition
                        .construct_bindings
                        .iter()
                        .any(|binding| binding == interceptor.binding())
                })
                .sorted_by_key(|interceptor| interceptor.order())
                .collect_vec();

            ConstructorInvocation::new(
                &definition.bean_type,
                &mut arguments,
                &interceptors,
                constructor.as_ref(),
            )
            .proceed()
        };

        let mut bean = constructed
            .map_err(|source| BeanContextError::instantiation(definition, None, source))?;

        for injection in &definition.injections {
            let mut arguments =
                self.resolve_arguments(definition, &injection.points, &mut None, resolution)?;
            (injection.inject)(bean.as_mut(), &mut arguments).map_err(|source| {
                BeanContextError::instantiation(definition, Some(injection.name.clone()), source)
            })?;
        }

        for callback in &definition.post_construct {
            callback(bean.as_mut()).map_err(|source| {
                BeanContextError::instantiation(
                    definition,
                    Some("post-construct".to_string()),
                    source,
                )
            })?;
        }

        Ok(BeanAnyPtr::from(bean))
    }

    fn resolve_arguments(
        &self,
        definition: &BeanDefinition,
        points: &[InjectionPoint],
        overrides: &mut Option<ExplicitArguments>,
        resolution: &mut ResolutionContext,
    ) -> Result<Arguments, BeanContextError> {
        let mut entries = Vec::with_capacity(points.len());
        for point in points {
            let value = match overrides
                .as_mut()
                .and_then(|overrides| overrides.take(&point.name))
            {
                Some(value) => value,
                None => self.resolve_injection_point(definition, point, resolution)?,
            };
            entries.push((point.name.clone(), value));
        }

        Ok(Arguments::new(entries))
    }

    fn resolve_injection_point(
        &self,
        definition: &BeanDefinition,
        point: &InjectionPoint,
        resolution: &mut ResolutionContext,
    ) -> Result<CastValue, BeanContextError> {
        match &point.requirement {
            Requirement::Bean { request, assemble } => {
                let values = match self.resolve_request(request, resolution) {
                    Ok(values) => values,
                    Err(
                        error @ (BeanContextError::NoSuchBean { .. }
                        | BeanContextError::AmbiguousBean { .. }),
                    ) if request.cardinality == Cardinality::Optional && !error.has_dependent() => {
                        debug!(
                            injection_point = %point.describe(&definition.bean_type),
                            %error,
                            "Optional dependency not available"
                        );
                        vec![]
                    }
                    Err(error) => {
                        return Err(error.with_dependent(point.describe(&definition.bean_type)))
                    }
                };

                assemble(values, request.cardinality)
            }
            Requirement::Property {
                key,
                default,
                required,
            } => {
                let value = self
                    .property_source
                    .property(key)
                    .or_else(|| default.clone());

                if *required {
                    value
                        .map(|value| Box::new(value) as CastValue)
                        .ok_or_else(|| BeanContextError::MissingProperty {
                            key: key.clone(),
                            dependent: point.describe(&definition.bean_type),
                        })
                } else {
                    Ok(Box::new(value))
                }
            }
        }
    }

    fn resolve_interceptors(
        &self,
        resolution: &mut ResolutionContext,
    ) -> Result<Vec<InterceptorPtr>, BeanContextError> {
        let request =
            BeanRequest::new::<dyn Interceptor + Send + Sync>(None, Cardinality::Collection);
        self.resolve_request(&request, resolution)?
            .into_iter()
            .map(downcast_value::<dyn Interceptor + Send + Sync>)
            .collect()
    }

    fn intercepted_methods(
        &self,
        methods: &[MethodMetadata],
        resolution: &mut ResolutionContext,
    ) -> Result<InterceptedMethods, BeanContextError> {
        let interceptors = self.resolve_interceptors(resolution)?;
        Ok(InterceptedMethods::new(methods, &interceptors))
    }
}

impl BeanProvider for BeanContext {
    fn instances(&self, request: &BeanRequest) -> Result<Vec<CastValue>, BeanContextError> {
        self.ensure_open()?;
        self.resolve_request(request, &mut ResolutionContext::new())
    }

    fn create_instance(
        &self,
        request: &BeanRequest,
        arguments: ExplicitArguments,
    ) -> Result<CastValue, BeanContextError> {
        self.ensure_open()?;

        let single = BeanRequest {
            cardinality: Cardinality::Required,
            ..request.clone()
        };
        let definition = self
            .candidates(&single)?
            .into_iter()
            .next()
            .ok_or_else(|| BeanContextError::no_such_bean(request))?;

        let identifier = definition.identifier();
        let mut resolution = ResolutionContext::with_arguments(arguments);
        resolution.push(&identifier)?;
        let instance = self.instantiate(&definition, &identifier, &mut resolution, false);
        resolution.pop();

        definition.cast(&request.bean_type, instance?)
    }

    fn contains(&self, request: &BeanRequest) -> bool {
        self.ensure_open().is_ok()
            && self
                .candidates(request)
                .map(|candidates| !candidates.is_empty())
                .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use crate::bean::BeanDefinition;
    use crate::context::BeanContextBuilder;
    use crate::error::BeanContextError;
    use crate::event::{ContextEvent, ContextEventListener};
    use crate::injection::{ExplicitArguments, InjectionPoint};
    use crate::provider::{BeanPtr, ErrorPtr, TypedBeanProvider};
    use crate::scope::REFRESH;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct Counter {
        value: u8,
    }

    struct Holder {
        counter: BeanPtr<Counter>,
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<ContextEvent>>,
    }

    impl ContextEventListener for Recorder {
        fn on_event(&self, event: &ContextEvent) {
            self.events.lock().push(event.clone());
        }
    }

    fn counter() -> BeanDefinition {
        BeanDefinition::builder::<Counter>()
            .constructor_arg(InjectionPoint::property("value", "counter.value").with_default(1))
            .constructor(|arguments| {
                Ok(Counter {
                    value: arguments.parse(0)?,
                })
            })
            .build()
            .unwrap()
    }

    fn holder() -> BeanDefinition {
        BeanDefinition::builder::<Holder>()
            .constructor_arg(InjectionPoint::bean::<Counter>("counter"))
            .constructor(|arguments| {
                Ok(Holder {
                    counter: arguments.bean(0)?,
                })
            })
            .build()
            .unwrap()
    }

    #[test]
    fn should_reuse_singletons() {
        let context = BeanContextBuilder::empty()
            .with_definition(counter())
            .with_definition(holder())
            .build()
            .unwrap();

        let holder = context.get_bean::<Holder>(None).unwrap();
        let counter = context.get_bean::<Counter>(None).unwrap();
        assert!(BeanPtr::ptr_eq(&holder.counter, &counter));
        assert_eq!(counter.value, 1);
    }

    #[test]
    fn should_create_fresh_instances_with_explicit_arguments() {
        let context = BeanContextBuilder::empty()
            .with_definition(counter())
            .with_definition(holder())
            .build()
            .unwrap();

        let singleton = context.get_bean::<Counter>(None).unwrap();
        let created = context
            .create_bean::<Counter>(None, ExplicitArguments::new().with("value", "7".to_string()))
            .unwrap();

        assert_eq!(created.value, 7);
        assert!(!BeanPtr::ptr_eq(&singleton, &created));
        assert!(BeanPtr::ptr_eq(
            &singleton,
            &context.get_bean::<Counter>(None).unwrap()
        ));
    }

    #[test]
    fn should_name_unmet_dependency() {
        let context = BeanContextBuilder::empty()
            .with_definition(holder())
            .build()
            .unwrap();

        match context.get_bean::<Holder>(None) {
            Err(BeanContextError::NoSuchBean { dependent, .. }) => {
                assert_eq!(dependent.as_deref(), Some("Holder.counter"))
            }
            result => panic!("unexpected result: {:?}", result.err()),
        }
    }

    #[test]
    fn should_publish_lifecycle_events() {
        let recorder = Arc::new(Recorder::default());
        let context = BeanContextBuilder::empty()
            .with_definition(
                BeanDefinition::builder::<Counter>()
                    .context()
                    .constructor(|_| Ok(Counter { value: 0 }))
                    .build()
                    .unwrap(),
            )
            .with_listener(recorder.clone())
            .build()
            .unwrap();

        context.start().unwrap();
        context.close().unwrap();

        let events = recorder.events.lock();
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], ContextEvent::BeanCreated(_)));
        assert_eq!(events[1], ContextEvent::Started);
        assert!(matches!(events[2], ContextEvent::BeanDestroyed(_)));
        assert_eq!(events[3], ContextEvent::Stopped);
    }

    #[test]
    fn should_reject_requests_after_close() {
        let context = BeanContextBuilder::empty()
            .with_definition(counter())
            .build()
            .unwrap();

        assert!(context.contains_bean::<Counter>(None));
        context.close().unwrap();

        assert!(matches!(
            context.get_bean::<Counter>(None),
            Err(BeanContextError::ContextClosed)
        ));
        assert!(matches!(context.start(), Err(BeanContextError::ContextClosed)));
        assert!(!context.contains_bean::<Counter>(None));
    }

    #[test]
    fn should_refresh_scope() {
        let destroyed = Arc::new(Mutex::new(0));
        let destroyed_clone = destroyed.clone();
        let context = BeanContextBuilder::empty()
            .with_definition(
                BeanDefinition::builder::<Counter>()
                    .scope(REFRESH)
                    .constructor(|_| Ok(Counter { value: 0 }))
                    .pre_destroy(move |_| {
                        *destroyed_clone.lock() += 1;
                        Ok(())
                    })
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();

        let first = context.get_bean::<Counter>(None).unwrap();
        context.refresh(REFRESH).unwrap();
        let second = context.get_bean::<Counter>(None).unwrap();

        assert!(!BeanPtr::ptr_eq(&first, &second));
        assert_eq!(*destroyed.lock(), 1);
    }

    #[test]
    fn should_report_construction_errors() {
        let context = BeanContextBuilder::empty()
            .with_definition(
                BeanDefinition::builder::<Counter>()
                    .constructor(|_| Err(Arc::new(BeanContextError::ContextClosed) as ErrorPtr))
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();

        assert!(matches!(
            context.get_bean::<Counter>(None),
            Err(BeanContextError::BeanInstantiation { .. })
        ));
    }
}
