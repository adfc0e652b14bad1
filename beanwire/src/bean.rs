//! A [BeanDefinition] is the immutable recipe for producing instances of a single bean: its type,
//! identity, qualifiers, scope, injection points, conditions and lifecycle callbacks. Definitions
//! are usually assembled with a [BeanDefinitionBuilder], either by hand or by `#[derive(Bean)]`
//! when the `derive` feature is enabled.
//!
//! ## Exposed types
//!
//! A bean can be requested by any type it *exposes*. The stored type is always exposed, while
//! additional types, usually `dyn Trait`s, are declared with [BeanDefinitionBuilder::exposes]:
//!
//! ```
//! use beanwire::bean::BeanDefinition;
//! use beanwire::provider::BeanPtr;
//!
//! trait Engine {
//!     fn start(&self) -> String;
//! }
//!
//! struct V8Engine;
//!
//! impl Engine for V8Engine {
//!     fn start(&self) -> String {
//!         "Starting V8".to_string()
//!     }
//! }
//!
//! let definition = BeanDefinition::builder::<V8Engine>()
//!     .named("v8")
//!     .constructor(|_| Ok(V8Engine))
//!     .exposes::<dyn Engine + Send + Sync>(|engine| engine as BeanPtr<dyn Engine + Send + Sync>)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(definition.name.as_deref(), Some("v8"));
//! ```
//!
//! ## Bean identity
//!
//! Each registered definition is identified by a [BeanIdentifier], which combines the bean type,
//! optional name and a registration index unique within a registry. Scopes cache instances by
//! identifiers, so two definitions of the same type never share instances.

use crate::aop::{InterceptedMethods, MethodMetadata};
use crate::condition::Condition;
use crate::error::{BeanContextError, BeanDefinitionError};
use crate::injection::{Arguments, InjectionPoint, InjectionTarget};
use crate::provider::{BeanAnyPtr, BeanPtr, CastFunction, CastValue, ErrorPtr};
use crate::qualifier::Qualifier;
use crate::scope::{PROTOTYPE, SINGLETON};
use derivative::Derivative;
use std::any::{type_name, Any, TypeId};
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

/// Constructs a raw bean instance from resolved constructor arguments.
pub type ConstructorFn =
    Arc<dyn Fn(&mut Arguments) -> Result<Box<dyn Any + Send + Sync>, ErrorPtr> + Send + Sync>;

/// Injects resolved arguments into an already constructed instance.
pub type InjectionFn =
    Arc<dyn Fn(&mut (dyn Any + Send + Sync), &mut Arguments) -> Result<(), ErrorPtr> + Send + Sync>;

pub type PostConstructFn =
    Arc<dyn Fn(&mut (dyn Any + Send + Sync)) -> Result<(), ErrorPtr> + Send + Sync>;

pub type PreDestroyFn = Arc<dyn Fn(&(dyn Any + Send + Sync)) -> Result<(), ErrorPtr> + Send + Sync>;

/// Wraps a raw instance (absent for introductions) into a proxy dispatching through interceptors.
pub type ProxyFactory = Arc<
    dyn Fn(Option<BeanAnyPtr>, InterceptedMethods) -> Result<BeanAnyPtr, ErrorPtr> + Send + Sync,
>;

/// Runtime type information about a bean or a requested type.
#[derive(Clone, Copy, Debug)]
pub struct BeanType {
    id: TypeId,
    name: &'static str,
}

impl BeanType {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without module path, generic arguments or auto trait bounds, e.g. `Engine` for
    /// `dyn my_crate::Engine + Send + Sync`.
    pub fn simple_name(&self) -> &'static str {
        let name = self.name.strip_prefix("dyn ").unwrap_or(self.name);
        let name = name.split(" + ").next().unwrap_or(name);
        let name = name.split('<').next().unwrap_or(name);
        name.rsplit("::").next().unwrap_or(name)
    }
}

impl PartialEq for BeanType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for BeanType {}

impl Hash for BeanType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Display for BeanType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.simple_name())
    }
}

/// How many instances a request expects.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Cardinality {
    /// Exactly one instance.
    Required,
    /// Zero or one instance.
    Optional,
    /// All matching instances.
    Collection,
}

/// A request for bean instances of a given type.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct BeanRequest {
    pub bean_type: BeanType,
    pub qualifier: Option<Qualifier>,
    pub cardinality: Cardinality,
}

impl BeanRequest {
    pub fn new<T: ?Sized + 'static>(qualifier: Option<Qualifier>, cardinality: Cardinality) -> Self {
        Self {
            bean_type: BeanType::of::<T>(),
            qualifier,
            cardinality,
        }
    }
}

impl Display for BeanRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.qualifier {
            Some(qualifier) => write!(f, "{} qualified {}", self.bean_type, qualifier),
            None => write!(f, "{}", self.bean_type),
        }
    }
}

/// Unique identity of a registered bean definition, used as the caching key in scopes.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct BeanIdentifier {
    pub bean_type: BeanType,
    pub name: Option<String>,
    pub index: usize,
}

impl Display for BeanIdentifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}('{}')", self.bean_type, name),
            None => write!(f, "{}", self.bean_type),
        }
    }
}

/// Concrete bean implementation to construct with [crate::context::BeanContext]. Usually derived
/// with `#[derive(Bean)]`.
pub trait Bean: Sized + Send + Sync + 'static {
    /// Assembles the definition of this bean.
    fn definition() -> Result<BeanDefinition, BeanDefinitionError>;
}

/// A type which can be used to request a bean.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct ExposedType {
    pub bean_type: BeanType,
    #[derivative(Debug = "ignore")]
    pub cast: CastFunction,
}

/// Additional injection performed after construction, e.g. a field or method injection.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct Injection {
    pub name: String,
    pub points: Vec<InjectionPoint>,
    #[derivative(Debug = "ignore")]
    pub inject: InjectionFn,
}

/// Marks a bean as produced by a method of another (factory) bean.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FactoryMethod {
    pub factory_type: BeanType,
    pub method: String,
}

/// Declares that a bean takes the place of other definitions. Optionally restricted to
/// definitions produced by a given factory or having a given name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Replaces {
    pub bean_type: BeanType,
    pub factory: Option<BeanType>,
    pub name: Option<String>,
}

impl Replaces {
    pub fn bean<T: ?Sized + 'static>() -> Self {
        Self {
            bean_type: BeanType::of::<T>(),
            factory: None,
            name: None,
        }
    }

    pub fn with_factory<F: ?Sized + 'static>(mut self) -> Self {
        self.factory = Some(BeanType::of::<F>());
        self
    }

    pub fn with_name<T: ToString>(mut self, name: T) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Checks if given definition is replaced by this declaration.
    pub fn matches(&self, definition: &BeanDefinition) -> bool {
        (definition.bean_type == self.bean_type || definition.exposes(self.bean_type.id()))
            && self.factory.map_or(true, |factory| {
                definition
                    .factory
                    .as_ref()
                    .map_or(false, |method| method.factory_type == factory)
            })
            && self
                .name
                .as_ref()
                .map_or(true, |name| definition.name.as_ref() == Some(name))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ProxyKind {
    /// Wraps a constructed target instance.
    Around,
    /// Has no target - every method is implemented by interceptors.
    Introduction,
}

/// Interception setup of a proxied bean.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct Interception {
    pub kind: ProxyKind,
    pub methods: Vec<MethodMetadata>,
    #[derivative(Debug = "ignore")]
    pub factory: ProxyFactory,
}

/// Definition of a bean, used to create its instances.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct BeanDefinition {
    pub bean_type: BeanType,
    pub name: Option<String>,
    pub annotations: Vec<String>,
    pub scope: String,
    pub eager: bool,
    pub is_primary: bool,
    pub is_secondary: bool,
    /// Lower comes first in collections.
    pub order: i32,
    pub type_arguments: Vec<BeanType>,
    pub constructor_arguments: Vec<InjectionPoint>,
    pub injections: Vec<Injection>,
    pub conditions: Vec<Condition>,
    pub factory: Option<FactoryMethod>,
    pub replaces: Option<Replaces>,
    #[derivative(Debug = "ignore")]
    pub constructor: Option<ConstructorFn>,
    /// Interceptor bindings applied around construction.
    pub construct_bindings: Vec<String>,
    #[derivative(Debug = "ignore")]
    pub post_construct: Vec<PostConstructFn>,
    #[derivative(Debug = "ignore")]
    pub pre_destroy: Vec<PreDestroyFn>,
    pub interception: Option<Interception>,
    pub exposed: Vec<ExposedType>,
    pub(crate) index: usize,
}

impl BeanDefinition {
    /// Starts building a definition for bean type `B`.
    pub fn builder<B: Send + Sync + 'static>() -> BeanDefinitionBuilder<B, B> {
        BeanDefinitionBuilder::new(Self::empty(BeanType::of::<B>()))
    }

    /// Starts building a definition of a bean produced by `method` of factory bean `F`. The factory
    /// instance is resolved as the first constructor argument, so additional arguments start at
    /// index 1.
    pub fn factory_method<F, B, C>(method: &str, produce: C) -> BeanDefinitionBuilder<B, B>
    where
        F: ?Sized + Send + Sync + 'static,
        B: Send + Sync + 'static,
        C: Fn(&F, &mut Arguments) -> Result<B, ErrorPtr> + Send + Sync + 'static,
    {
        let mut definition = Self::empty(BeanType::of::<B>());
        definition.factory = Some(FactoryMethod {
            factory_type: BeanType::of::<F>(),
            method: method.to_string(),
        });

        BeanDefinitionBuilder::new(definition)
            .constructor_arg(InjectionPoint::bean::<F>("factory"))
            .constructor(move |arguments| {
                let factory = arguments.bean::<F>(0)?;
                produce(&*factory, arguments)
            })
    }

    /// Starts building a definition of an introduction proxy `P` - a bean without a target
    /// instance, whose methods are entirely implemented by interceptors.
    pub fn introduction<P, C>(methods: Vec<MethodMetadata>, create: C) -> BeanDefinitionBuilder<P, P>
    where
        P: Send + Sync + 'static,
        C: Fn(InterceptedMethods) -> P + Send + Sync + 'static,
    {
        let mut definition = Self::empty(BeanType::of::<P>());
        definition.interception = Some(Interception {
            kind: ProxyKind::Introduction,
            methods,
            factory: Arc::new(move |_: Option<BeanAnyPtr>, methods: InterceptedMethods| {
                Ok(BeanPtr::new(create(methods)) as BeanAnyPtr)
            }),
        });

        BeanDefinitionBuilder::new(definition)
    }

    fn empty(bean_type: BeanType) -> Self {
        Self {
            bean_type,
            name: None,
            annotations: vec![],
            scope: SINGLETON.to_string(),
            eager: false,
            is_primary: false,
            is_secondary: false,
            order: 0,
            type_arguments: vec![],
            constructor_arguments: vec![],
            injections: vec![],
            conditions: vec![],
            factory: None,
            replaces: None,
            constructor: None,
            construct_bindings: vec![],
            post_construct: vec![],
            pre_destroy: vec![],
            interception: None,
            exposed: vec![],
            index: 0,
        }
    }

    /// Registration index assigned by the registry.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn identifier(&self) -> BeanIdentifier {
        BeanIdentifier {
            bean_type: self.bean_type,
            name: self.name.clone(),
            index: self.index,
        }
    }

    /// Checks if this bean can be requested as given type.
    pub fn exposes(&self, type_id: TypeId) -> bool {
        self.exposed
            .iter()
            .any(|exposed| exposed.bean_type.id() == type_id)
    }

    /// Casts an instance of this bean to a `BeanPtr` of one of the exposed types.
    pub fn cast(
        &self,
        bean_type: &BeanType,
        instance: BeanAnyPtr,
    ) -> Result<CastValue, BeanContextError> {
        self.exposed
            .iter()
            .find(|exposed| exposed.bean_type == *bean_type)
            .ok_or_else(|| BeanContextError::IncompatibleBean(bean_type.name().to_string()))
            .and_then(|exposed| {
                (exposed.cast)(instance)
                    .map_err(|_| BeanContextError::IncompatibleBean(bean_type.name().to_string()))
            })
    }
}

fn incompatible_instance<T: ?Sized>() -> ErrorPtr {
    Arc::new(BeanContextError::IncompatibleBean(
        type_name::<T>().to_string(),
    ))
}

fn exposure<S: Send + Sync + 'static, T: ?Sized + Send + Sync + 'static>(
    convert: impl Fn(BeanPtr<S>) -> BeanPtr<T> + Send + Sync + 'static,
) -> ExposedType {
    ExposedType {
        bean_type: BeanType::of::<T>(),
        cast: Arc::new(move |instance: BeanAnyPtr| {
            instance
                .downcast::<S>()
                .map(|instance| Box::new(convert(instance)) as CastValue)
        }),
    }
}

/// Builder for [BeanDefinition]s. `B` is the constructed bean type, while `S` is the type of the
/// instance stored in scopes - either `B` itself, or a proxy wrapping it when intercepted.
pub struct BeanDefinitionBuilder<B, S = B> {
    definition: BeanDefinition,
    _phantom: PhantomData<fn() -> (B, S)>,
}

impl<B: Send + Sync + 'static, S: Send + Sync + 'static> BeanDefinitionBuilder<B, S> {
    fn new(definition: BeanDefinition) -> Self {
        Self {
            definition,
            _phantom: PhantomData,
        }
    }

    pub fn named<T: ToString>(mut self, name: T) -> Self {
        self.definition.name = Some(name.to_string());
        self
    }

    /// Adds an annotation, which can be matched by [Qualifier::Annotation].
    pub fn annotated<T: ToString>(mut self, annotation: T) -> Self {
        self.definition.annotations.push(annotation.to_string());
        self
    }

    pub fn scope<T: ToString>(mut self, scope: T) -> Self {
        self.definition.scope = scope.to_string();
        self
    }

    pub fn prototype(self) -> Self {
        self.scope(PROTOTYPE)
    }

    /// Marks the bean as a context bean - a singleton created when the context starts.
    pub fn context(self) -> Self {
        self.scope(SINGLETON).eager()
    }

    pub fn eager(mut self) -> Self {
        self.definition.eager = true;
        self
    }

    pub fn primary(mut self) -> Self {
        self.definition.is_primary = true;
        self
    }

    pub fn secondary(mut self) -> Self {
        self.definition.is_secondary = true;
        self
    }

    pub fn order(mut self, order: i32) -> Self {
        self.definition.order = order;
        self
    }

    /// Sets generic type arguments of the bean, matched by [Qualifier::TypeArguments].
    pub fn type_arguments(mut self, type_arguments: Vec<BeanType>) -> Self {
        self.definition.type_arguments = type_arguments;
        self
    }

    /// Adds the next constructor argument.
    pub fn constructor_arg(mut self, point: InjectionPoint) -> Self {
        let index = self.definition.constructor_arguments.len();
        self.definition
            .constructor_arguments
            .push(point.with_target(InjectionTarget::ConstructorArgument(index)));
        self
    }

    pub fn constructor<C>(mut self, constructor: C) -> Self
    where
        C: Fn(&mut Arguments) -> Result<B, ErrorPtr> + Send + Sync + 'static,
    {
        self.definition.constructor = Some(Arc::new(move |arguments: &mut Arguments| {
            constructor(arguments).map(|bean| Box::new(bean) as Box<dyn Any + Send + Sync>)
        }));
        self
    }

    /// Injects a single value after construction, using the given setter.
    pub fn inject_field<V, F>(mut self, point: InjectionPoint, setter: F) -> Self
    where
        V: Any,
        F: Fn(&mut B, V) + Send + Sync + 'static,
    {
        let name = point.name.clone();
        self.definition.injections.push(Injection {
            name,
            points: vec![point.with_target(InjectionTarget::Field)],
            inject: Arc::new(move |bean: &mut (dyn Any + Send + Sync), arguments: &mut Arguments| {
                let bean = bean
                    .downcast_mut::<B>()
                    .ok_or_else(incompatible_instance::<B>)?;
                setter(bean, arguments.take::<V>(0)?);
                Ok(())
            }),
        });
        self
    }

    /// Calls given method after construction with resolved arguments.
    pub fn inject_method<F>(mut self, method: &str, points: Vec<InjectionPoint>, inject: F) -> Self
    where
        F: Fn(&mut B, &mut Arguments) -> Result<(), ErrorPtr> + Send + Sync + 'static,
    {
        let points = points
            .into_iter()
            .enumerate()
            .map(|(index, point)| {
                point.with_target(InjectionTarget::MethodArgument {
                    method: method.to_string(),
                    index,
                })
            })
            .collect();

        self.definition.injections.push(Injection {
            name: method.to_string(),
            points,
            inject: Arc::new(move |bean: &mut (dyn Any + Send + Sync), arguments: &mut Arguments| {
                let bean = bean
                    .downcast_mut::<B>()
                    .ok_or_else(incompatible_instance::<B>)?;
                inject(bean, arguments)
            }),
        });
        self
    }

    /// Adds a condition which needs to pass for the bean to be eligible.
    pub fn requires(mut self, condition: Condition) -> Self {
        self.definition.conditions.push(condition);
        self
    }

    pub fn replaces(mut self, replaces: Replaces) -> Self {
        self.definition.replaces = Some(replaces);
        self
    }

    /// Runs interceptors with given binding around construction.
    pub fn around_construct<T: ToString>(mut self, binding: T) -> Self {
        self.definition.construct_bindings.push(binding.to_string());
        self
    }

    pub fn post_construct<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut B) -> Result<(), ErrorPtr> + Send + Sync + 'static,
    {
        self.definition.post_construct.push(Arc::new(move |bean: &mut (dyn Any + Send + Sync)| {
            bean.downcast_mut::<B>()
                .ok_or_else(incompatible_instance::<B>)
                .and_then(|bean| callback(bean))
        }));
        self
    }

    pub fn pre_destroy<F>(mut self, callback: F) -> Self
    where
        F: Fn(&B) -> Result<(), ErrorPtr> + Send + Sync + 'static,
    {
        self.definition.pre_destroy.push(Arc::new(move |bean: &(dyn Any + Send + Sync)| {
            bean.downcast_ref::<B>()
                .ok_or_else(incompatible_instance::<B>)
                .and_then(|bean| callback(bean))
        }));
        self
    }

    /// Wraps constructed instances in proxy `P`, which dispatches given methods through the
    /// interceptors bound to them. Previously exposed types are discarded, since the proxy is
    /// stored instead of the bean.
    pub fn intercepted<P, F>(
        mut self,
        methods: Vec<MethodMetadata>,
        create: F,
    ) -> BeanDefinitionBuilder<B, P>
    where
        P: Send + Sync + 'static,
        F: Fn(BeanPtr<B>, InterceptedMethods) -> P + Send + Sync + 'static,
    {
        self.definition.exposed.clear();
        self.definition.interception = Some(Interception {
            kind: ProxyKind::Around,
            methods,
            factory: Arc::new(move |target: Option<BeanAnyPtr>, methods: InterceptedMethods| {
                let target = target
                    .ok_or_else(incompatible_instance::<B>)?
                    .downcast::<B>()
                    .map_err(|_| incompatible_instance::<B>())?;
                Ok(BeanPtr::new(create(target, methods)) as BeanAnyPtr)
            }),
        });

        BeanDefinitionBuilder::new(self.definition)
    }

    /// Exposes the bean as type `T`, usually a `dyn Trait`.
    pub fn exposes<T: ?Sized + Send + Sync + 'static>(
        mut self,
        convert: impl Fn(BeanPtr<S>) -> BeanPtr<T> + Send + Sync + 'static,
    ) -> Self {
        let exposed = exposure(convert);
        if !self.definition.exposes(exposed.bean_type.id()) {
            self.definition.exposed.push(exposed);
        }
        self
    }

    pub fn build(mut self) -> Result<BeanDefinition, BeanDefinitionError> {
        let is_introduction = matches!(
            &self.definition.interception,
            Some(Interception {
                kind: ProxyKind::Introduction,
                ..
            })
        );

        if self.definition.constructor.is_none() && !is_introduction {
            return Err(BeanDefinitionError::MissingConstructor(
                self.definition.bean_type.name().to_string(),
            ));
        }

        if !self.definition.exposes(TypeId::of::<S>()) {
            self.definition
                .exposed
                .insert(0, exposure::<S, S>(|instance| instance));
        }

        Ok(self.definition)
    }
}
