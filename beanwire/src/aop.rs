//! Method interception support. An [Interceptor] is a bean which gets called around invocations of
//! methods bound to it by a binding name. Interceptors for a method form an [InterceptorChain],
//! ordered by [Interceptor::order], through which the invocation passes before reaching the
//! target. Each interceptor decides whether to [proceed](MethodInvocation::proceed), and can
//! inspect or replace arguments and the result.
//!
//! Intercepted beans are stored as proxies - types written for the intercepted trait, which
//! dispatch their methods through [InterceptedMethods]:
//!
//! ```
//! use beanwire::aop::{InterceptedMethods, InvocationArguments, MethodMetadata};
//! use beanwire::provider::{BeanPtr, ErrorPtr};
//!
//! trait Greeter {
//!     fn greet(&self, name: String) -> Result<String, ErrorPtr>;
//! }
//!
//! struct SimpleGreeter;
//!
//! impl Greeter for SimpleGreeter {
//!     fn greet(&self, name: String) -> Result<String, ErrorPtr> {
//!         Ok(format!("Hello {name}"))
//!     }
//! }
//!
//! const GREET: MethodMetadata = MethodMetadata::new("Greeter", "greet", &["logged"]);
//!
//! struct GreeterProxy {
//!     target: BeanPtr<SimpleGreeter>,
//!     methods: InterceptedMethods,
//! }
//!
//! impl Greeter for GreeterProxy {
//!     fn greet(&self, name: String) -> Result<String, ErrorPtr> {
//!         self.methods.invoke(
//!             &GREET,
//!             InvocationArguments::new().with(name),
//!             |arguments| self.target.greet(arguments.argument::<String>(0)?),
//!         )
//!     }
//! }
//! ```

use crate::bean::BeanType;
use crate::error::AopError;
use crate::injection::Arguments;
use crate::provider::ErrorPtr;
use derivative::Derivative;
use fxhash::FxHashMap;
use itertools::Itertools;
use std::any::{type_name, Any};
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type InterceptorPtr = Arc<dyn Interceptor + Send + Sync>;

/// Type-erased return value of an intercepted method.
pub type InvocationResult = Result<Box<dyn Any + Send>, ErrorPtr>;

/// Type-erased raw instance produced by a constructor.
pub type ConstructionResult = Result<Box<dyn Any + Send + Sync>, ErrorPtr>;

type InvocationTarget<'a> = dyn FnMut(&mut InvocationArguments) -> InvocationResult + 'a;

type ConstructorTarget<'a> = dyn Fn(&mut Arguments) -> ConstructionResult + Send + Sync + 'a;

/// Static description of an interceptable method.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct MethodMetadata {
    pub declaring_type: &'static str,
    pub name: &'static str,
    /// Interceptor bindings applied to this method.
    pub bindings: &'static [&'static str],
}

impl MethodMetadata {
    pub const fn new(
        declaring_type: &'static str,
        name: &'static str,
        bindings: &'static [&'static str],
    ) -> Self {
        Self {
            declaring_type,
            name,
            bindings,
        }
    }

    pub fn is_bound_to(&self, binding: &str) -> bool {
        self.bindings.contains(&binding)
    }

    #[inline]
    fn key(&self) -> (&'static str, &'static str) {
        (self.declaring_type, self.name)
    }
}

impl Display for MethodMetadata {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.declaring_type, self.name)
    }
}

/// Advice applied to intercepted methods and constructors.
pub trait Interceptor {
    /// Binding name which selects the methods this interceptor applies to.
    fn binding(&self) -> &str;

    /// Position in the chain - lower runs first (outermost).
    fn order(&self) -> i32 {
        0
    }

    fn intercept(&self, invocation: &mut MethodInvocation<'_>) -> InvocationResult {
        invocation.proceed()
    }

    fn intercept_construct(&self, invocation: &mut ConstructorInvocation<'_>) -> ConstructionResult {
        invocation.proceed()
    }
}

/// Arguments of an intercepted invocation, which interceptors can read and replace.
#[derive(Default, Derivative)]
#[derivative(Debug)]
pub struct InvocationArguments {
    #[derivative(Debug = "ignore")]
    values: Vec<Box<dyn Any + Send>>,
}

impl InvocationArguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<V: Any + Send>(mut self, value: V) -> Self {
        self.values.push(Box::new(value));
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get<V: Any>(&self, index: usize) -> Option<&V> {
        self.values.get(index).and_then(|value| value.downcast_ref())
    }

    pub fn get_mut<V: Any>(&mut self, index: usize) -> Option<&mut V> {
        self.values
            .get_mut(index)
            .and_then(|value| value.downcast_mut())
    }

    /// Replaces the argument at given index. Returns false if there's no such argument.
    pub fn set<V: Any + Send>(&mut self, index: usize, value: V) -> bool {
        match self.values.get_mut(index) {
            Some(current) => {
                *current = Box::new(value);
                true
            }
            None => false,
        }
    }

    /// Returns a copy of the argument at given index.
    pub fn argument<V: Any + Clone>(&self, index: usize) -> Result<V, ErrorPtr> {
        self.get::<V>(index).cloned().ok_or_else(|| {
            Arc::new(AopError::ArgumentUnavailable {
                index,
                expected: type_name::<V>().to_string(),
            }) as ErrorPtr
        })
    }
}

/// A single invocation passing through an interceptor chain.
pub struct MethodInvocation<'a> {
    method: &'a MethodMetadata,
    arguments: InvocationArguments,
    interceptors: &'a [InterceptorPtr],
    position: usize,
    target: Option<&'a mut InvocationTarget<'a>>,
}

impl MethodInvocation<'_> {
    #[inline]
    pub fn method(&self) -> &MethodMetadata {
        self.method
    }

    #[inline]
    pub fn arguments(&self) -> &InvocationArguments {
        &self.arguments
    }

    #[inline]
    pub fn arguments_mut(&mut self) -> &mut InvocationArguments {
        &mut self.arguments
    }

    /// Checks if the invocation ends in a real target, as opposed to an introduction.
    #[inline]
    pub fn has_target(&self) -> bool {
        self.target.is_some()
    }

    /// Passes the invocation to the next interceptor, or to the target at the end of the chain.
    /// Can be called multiple times, e.g. to retry.
    pub fn proceed(&mut self) -> InvocationResult {
        let interceptors = self.interceptors;
        match interceptors.get(self.position) {
            Some(interceptor) => {
                self.position += 1;
                let result = interceptor.intercept(self);
                self.position -= 1;
                result
            }
            None => match self.target.as_mut() {
                Some(target) => target(&mut self.arguments),
                None => Err(Arc::new(AopError::NoTarget {
                    method: self.method.to_string(),
                })),
            },
        }
    }
}

/// A constructor invocation passing through interceptors.
pub struct ConstructorInvocation<'a> {
    bean: &'a BeanType,
    arguments: &'a mut Arguments,
    interceptors: &'a [InterceptorPtr],
    position: usize,
    constructor: &'a ConstructorTarget<'a>,
}

impl<'a> ConstructorInvocation<'a> {
    pub fn new(
        bean: &'a BeanType,
        arguments: &'a mut Arguments,
        interceptors: &'a [InterceptorPtr],
        constructor: &'a ConstructorTarget<'a>,
    ) -> Self {
        Self {
            bean,
            arguments,
            interceptors,
            position: 0,
            constructor,
        }
    }

    #[inline]
    pub fn bean(&self) -> &BeanType {
        self.bean
    }

    #[inline]
    pub fn arguments(&self) -> &Arguments {
        &*self.arguments
    }

    #[inline]
    pub fn arguments_mut(&mut self) -> &mut Arguments {
        &mut *self.arguments
    }

    pub fn proceed(&mut self) -> ConstructionResult {
        let interceptors = self.interceptors;
        match interceptors.get(self.position) {
            Some(interceptor) => {
                self.position += 1;
                let result = interceptor.intercept_construct(self);
                self.position -= 1;
                result
            }
            None => (self.constructor)(&mut *self.arguments),
        }
    }
}

/// Interceptors applying to a single method, sorted by their order. Interceptors with equal order
/// keep their relative position.
#[derive(Clone, Default, Derivative)]
#[derivative(Debug)]
pub struct InterceptorChain {
    #[derivative(Debug = "ignore")]
    interceptors: Vec<InterceptorPtr>,
}

impl InterceptorChain {
    pub fn new(interceptors: Vec<InterceptorPtr>) -> Self {
        Self {
            interceptors: interceptors
                .into_iter()
                .sorted_by_key(|interceptor| interceptor.order())
                .collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Runs the invocation through the chain, ending at `target`.
    pub fn invoke<R, F>(
        &self,
        method: &MethodMetadata,
        arguments: InvocationArguments,
        mut target: F,
    ) -> Result<R, ErrorPtr>
    where
        R: Any + Send,
        F: FnMut(&mut InvocationArguments) -> Result<R, ErrorPtr>,
    {
        let mut target = |arguments: &mut InvocationArguments| -> InvocationResult {
            target(arguments).map(|value| Box::new(value) as Box<dyn Any + Send>)
        };
        self.run(method, arguments, Some(&mut target))
    }

    /// Runs the invocation through the chain without a target. One of the interceptors needs to
    /// produce the result.
    pub fn invoke_introduction<R: Any + Send>(
        &self,
        method: &MethodMetadata,
        arguments: InvocationArguments,
    ) -> Result<R, ErrorPtr> {
        self.run(method, arguments, None)
    }

    fn run<'a, R: Any + Send>(
        &'a self,
        method: &'a MethodMetadata,
        arguments: InvocationArguments,
        target: Option<&'a mut InvocationTarget<'a>>,
    ) -> Result<R, ErrorPtr> {
        let mut invocation = MethodInvocation {
            method,
            arguments,
            interceptors: &self.interceptors,
            position: 0,
            target,
        };

        invocation.proceed()?.downcast::<R>().map(|value| *value).map_err(|_| {
            Arc::new(AopError::IncompatibleReturnValue {
                method: method.to_string(),
                expected: type_name::<R>().to_string(),
            }) as ErrorPtr
        })
    }
}

/// Interceptor chains of all intercepted methods of a proxy.
#[derive(Clone, Debug, Default)]
pub struct InterceptedMethods {
    chains: FxHashMap<(&'static str, &'static str), InterceptorChain>,
}

impl InterceptedMethods {
    /// Builds chains for given methods out of the interceptors bound to them.
    pub fn new(methods: &[MethodMetadata], interceptors: &[InterceptorPtr]) -> Self {
        Self {
            chains: methods
                .iter()
                .map(|method| {
                    (
                        method.key(),
                        InterceptorChain::new(
                            interceptors
                                .iter()
                                .filter(|interceptor| method.is_bound_to(interceptor.binding()))
                                .cloned()
                                .collect(),
                        ),
                    )
                })
                .collect(),
        }
    }

    pub fn chain(&self, method: &MethodMetadata) -> Option<&InterceptorChain> {
        self.chains.get(&method.key())
    }

    /// Invokes given method through its chain. Methods without a chain call the target directly.
    pub fn invoke<R, F>(
        &self,
        method: &MethodMetadata,
        mut arguments: InvocationArguments,
        mut target: F,
    ) -> Result<R, ErrorPtr>
    where
        R: Any + Send,
        F: FnMut(&mut InvocationArguments) -> Result<R, ErrorPtr>,
    {
        match self.chain(method) {
            Some(chain) => chain.invoke(method, arguments, target),
            None => target(&mut arguments),
        }
    }

    pub fn invoke_introduction<R: Any + Send>(
        &self,
        method: &MethodMetadata,
        arguments: InvocationArguments,
    ) -> Result<R, ErrorPtr> {
        match self.chain(method) {
            Some(chain) => chain.invoke_introduction(method, arguments),
            None => InterceptorChain::default().invoke_introduction(method, arguments),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::aop::{
        InterceptedMethods, Interceptor, InterceptorChain, InterceptorPtr, InvocationArguments,
        InvocationResult, MethodInvocation, MethodMetadata,
    };
    use crate::error::AopError;
    use crate::provider::ErrorPtr;
    use parking_lot::Mutex;
    use std::sync::Arc;

    const GREET: MethodMetadata = MethodMetadata::new("Greeter", "greet", &["recorded"]);
    const OTHER: MethodMetadata = MethodMetadata::new("Greeter", "other", &["other"]);
    const WELCOME_GREET: MethodMetadata = MethodMetadata::new("Welcome", "greet", &[]);

    struct Recording {
        order: i32,
        calls: Arc<Mutex<Vec<i32>>>,
    }

    impl Interceptor for Recording {
        fn binding(&self) -> &str {
            "recorded"
        }

        fn order(&self) -> i32 {
            self.order
        }

        fn intercept(&self, invocation: &mut MethodInvocation<'_>) -> InvocationResult {
            self.calls.lock().push(self.order);
            invocation.proceed()
        }
    }

    struct ShortCircuit;

    impl Interceptor for ShortCircuit {
        fn binding(&self) -> &str {
            "recorded"
        }

        fn intercept(&self, _invocation: &mut MethodInvocation<'_>) -> InvocationResult {
            Ok(Box::new("cached".to_string()))
        }
    }

    struct Uppercase;

    impl Interceptor for Uppercase {
        fn binding(&self) -> &str {
            "recorded"
        }

        fn intercept(&self, invocation: &mut MethodInvocation<'_>) -> InvocationResult {
            let name = invocation
                .arguments()
                .argument::<String>(0)?
                .to_uppercase();
            invocation.arguments_mut().set(0, name);
            invocation.proceed()
        }
    }

    fn recording(orders: &[i32], calls: &Arc<Mutex<Vec<i32>>>) -> Vec<InterceptorPtr> {
        orders
            .iter()
            .map(|order| {
                Arc::new(Recording {
                    order: *order,
                    calls: calls.clone(),
                }) as InterceptorPtr
            })
            .collect()
    }

    fn greet(arguments: &mut InvocationArguments) -> Result<String, ErrorPtr> {
        Ok(format!("Hello {}", arguments.argument::<String>(0)?))
    }

    #[test]
    fn should_run_interceptors_in_order() {
        let calls = Arc::new(Mutex::new(vec![]));
        let chain = InterceptorChain::new(recording(&[10, 5, 20], &calls));

        let result = chain
            .invoke(
                &GREET,
                InvocationArguments::new().with("John".to_string()),
                greet,
            )
            .unwrap();

        assert_eq!(result, "Hello John");
        assert_eq!(*calls.lock(), [5, 10, 20]);
    }

    #[test]
    fn should_short_circuit() {
        let calls = Arc::new(Mutex::new(vec![]));
        let mut interceptors = recording(&[-1, 10], &calls);
        interceptors.push(Arc::new(ShortCircuit));
        let chain = InterceptorChain::new(interceptors);

        let mut target_called = false;
        let result = chain
            .invoke(&GREET, InvocationArguments::new(), |_| {
                target_called = true;
                Ok("target".to_string())
            })
            .unwrap();

        assert_eq!(result, "cached");
        assert_eq!(*calls.lock(), [-1]);
        assert!(!target_called);
    }

    #[test]
    fn should_replace_arguments() {
        let chain = InterceptorChain::new(vec![Arc::new(Uppercase) as InterceptorPtr]);

        let result = chain
            .invoke(
                &GREET,
                InvocationArguments::new().with("John".to_string()),
                greet,
            )
            .unwrap();

        assert_eq!(result, "Hello JOHN");
    }

    #[test]
    fn should_fail_introduction_without_result() {
        let chain = InterceptorChain::default();

        let error = chain
            .invoke_introduction::<String>(&GREET, InvocationArguments::new())
            .unwrap_err();

        assert_eq!(error.to_string(), AopError::NoTarget {
            method: "Greeter::greet".to_string()
        }
        .to_string());
    }

    #[test]
    fn should_reject_incompatible_return_value() {
        let chain = InterceptorChain::new(vec![Arc::new(ShortCircuit) as InterceptorPtr]);

        assert!(chain
            .invoke_introduction::<u8>(&GREET, InvocationArguments::new())
            .is_err());
    }

    #[test]
    fn should_bind_interceptors_to_methods() {
        let calls = Arc::new(Mutex::new(vec![]));
        let methods = InterceptedMethods::new(&[GREET, OTHER], &recording(&[1, 2], &calls));

        assert_eq!(methods.chain(&GREET).map(InterceptorChain::len), Some(2));
        assert_eq!(methods.chain(&OTHER).map(InterceptorChain::len), Some(0));

        methods
            .invoke(&OTHER, InvocationArguments::new(), |_| Ok(()))
            .unwrap();
        assert!(calls.lock().is_empty());
    }

    #[test]
    fn should_keep_same_named_methods_of_different_types_apart() {
        let calls = Arc::new(Mutex::new(vec![]));
        let methods =
            InterceptedMethods::new(&[GREET, WELCOME_GREET], &recording(&[1, 2], &calls));

        assert_eq!(methods.chain(&GREET).map(InterceptorChain::len), Some(2));
        assert_eq!(methods.chain(&WELCOME_GREET).map(InterceptorChain::len), Some(0));

        methods
            .invoke(
                &WELCOME_GREET,
                InvocationArguments::new().with("John".to_string()),
                greet,
            )
            .unwrap();
        assert!(calls.lock().is_empty());
    }
}
