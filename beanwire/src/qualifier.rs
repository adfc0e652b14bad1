//! Qualifiers narrow down the candidates for a bean request when more than one bean exposes the
//! requested type. Selection of a single candidate then follows a fixed order: a unique primary
//! bean wins, otherwise secondary beans are discarded, and whatever remains needs to be a single
//! candidate.
//!
//! ## Named matching
//!
//! [Qualifier::Named] first looks for beans declared with exactly the given name. If there are
//! none, the bean type names are compared instead, ignoring case, `_` and `-`. Both the name
//! itself and the name followed by the requested type are accepted, so `v8` matches a
//! `V8Engine` bean when `dyn Engine` is requested.

use crate::bean::{BeanRequest, BeanType, Cardinality};
use crate::error::BeanContextError;
use crate::registry::BeanDefinitionPtr;
use itertools::Itertools;
use std::any::TypeId;
use std::fmt::{Display, Formatter};

/// Answers subtype questions for type argument matching.
pub trait TypeHierarchy {
    /// Checks if a value of type `from` can be used where `to` is expected.
    fn is_assignable(&self, from: TypeId, to: TypeId) -> bool;
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum TypeArgument {
    Exact(BeanType),
    Wildcard,
}

impl TypeArgument {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::Exact(BeanType::of::<T>())
    }
}

impl Display for TypeArgument {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeArgument::Exact(bean_type) => write!(f, "{bean_type}"),
            TypeArgument::Wildcard => f.write_str("?"),
        }
    }
}

/// Predicate narrowing a set of candidate beans.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Qualifier {
    Named(String),
    /// Candidates whose bean type is exactly the given one.
    Type(BeanType),
    Annotation(String),
    TypeArguments(Vec<TypeArgument>),
    Any,
    /// Conjunction of qualifiers.
    All(Vec<Qualifier>),
}

impl Qualifier {
    pub fn named<T: ToString>(name: T) -> Self {
        Self::Named(name.to_string())
    }

    pub fn by_type<T: ?Sized + 'static>() -> Self {
        Self::Type(BeanType::of::<T>())
    }

    pub fn annotation<T: ToString>(annotation: T) -> Self {
        Self::Annotation(annotation.to_string())
    }

    /// Combines two qualifiers into a conjunction.
    pub fn and(self, other: Qualifier) -> Self {
        match (self, other) {
            (Qualifier::Any, qualifier) | (qualifier, Qualifier::Any) => qualifier,
            (Qualifier::All(mut first), Qualifier::All(second)) => {
                first.extend(second);
                Qualifier::All(first)
            }
            (Qualifier::All(mut first), second) => {
                first.push(second);
                Qualifier::All(first)
            }
            (first, Qualifier::All(mut second)) => {
                second.insert(0, first);
                Qualifier::All(second)
            }
            (first, second) => Qualifier::All(vec![first, second]),
        }
    }

    /// Returns the candidates satisfying this qualifier, preserving their relative order.
    pub fn filter(
        &self,
        requested: &BeanType,
        candidates: Vec<BeanDefinitionPtr>,
        hierarchy: &dyn TypeHierarchy,
    ) -> Vec<BeanDefinitionPtr> {
        match self {
            Qualifier::Named(name) => {
                let (exact, other): (Vec<_>, Vec<_>) = candidates
                    .into_iter()
                    .partition(|candidate| candidate.name.as_deref() == Some(name.as_str()));

                if !exact.is_empty() {
                    return exact;
                }

                let name = normalize(name);
                let qualified_name = format!("{}{}", name, normalize(requested.simple_name()));
                other
                    .into_iter()
                    .filter(|candidate| {
                        let type_name = normalize(candidate.bean_type.simple_name());
                        type_name == name || type_name == qualified_name
                    })
                    .collect()
            }
            Qualifier::Type(bean_type) => candidates
                .into_iter()
                .filter(|candidate| candidate.bean_type == *bean_type)
                .collect(),
            Qualifier::Annotation(annotation) => candidates
                .into_iter()
                .filter(|candidate| candidate.annotations.contains(annotation))
                .collect(),
            Qualifier::TypeArguments(arguments) => candidates
                .into_iter()
                .filter(|candidate| {
                    candidate.type_arguments.len() == arguments.len()
                        && candidate.type_arguments.iter().zip(arguments).all(
                            |(actual, expected)| match expected {
                                TypeArgument::Wildcard => true,
                                TypeArgument::Exact(expected) => {
                                    hierarchy.is_assignable(actual.id(), expected.id())
                                }
                            },
                        )
                })
                .collect(),
            Qualifier::Any => candidates,
            Qualifier::All(qualifiers) => qualifiers
                .iter()
                .fold(candidates, |candidates, qualifier| {
                    qualifier.filter(requested, candidates, hierarchy)
                }),
        }
    }
}

impl Display for Qualifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Qualifier::Named(name) => write!(f, "by name '{name}'"),
            Qualifier::Type(bean_type) => write!(f, "by type {bean_type}"),
            Qualifier::Annotation(annotation) => write!(f, "by annotation {annotation}"),
            Qualifier::TypeArguments(arguments) => {
                write!(f, "by type arguments <{}>", arguments.iter().join(", "))
            }
            Qualifier::Any => f.write_str("by any"),
            Qualifier::All(qualifiers) => write!(f, "{}", qualifiers.iter().join(" and ")),
        }
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Applies the qualifier of a request to the candidates and selects the result according to the
/// request cardinality. Candidates are ordered by their declared order, then registration.
pub fn select(
    request: &BeanRequest,
    candidates: Vec<BeanDefinitionPtr>,
    hierarchy: &dyn TypeHierarchy,
) -> Result<Vec<BeanDefinitionPtr>, BeanContextError> {
    let candidates = match &request.qualifier {
        Some(qualifier) => qualifier.filter(&request.bean_type, candidates, hierarchy),
        None => candidates,
    }
    .into_iter()
    .sorted_by_key(|candidate| (candidate.order, candidate.index()))
    .collect_vec();

    match request.cardinality {
        Cardinality::Collection => Ok(candidates),
        Cardinality::Optional if candidates.is_empty() => Ok(candidates),
        _ if candidates.is_empty() => Err(BeanContextError::no_such_bean(request)),
        _ => select_single(request, candidates).map(|candidate| vec![candidate]),
    }
}

fn select_single(
    request: &BeanRequest,
    mut candidates: Vec<BeanDefinitionPtr>,
) -> Result<BeanDefinitionPtr, BeanContextError> {
    if candidates.len() == 1 {
        return Ok(candidates.remove(0));
    }

    let mut primaries = candidates
        .iter()
        .filter(|candidate| candidate.is_primary)
        .collect_vec();
    match primaries.len() {
        0 => {}
        1 => return Ok(primaries.remove(0).clone()),
        _ => return Err(ambiguous(request, primaries.into_iter())),
    }

    let mut regular = candidates
        .iter()
        .filter(|candidate| !candidate.is_secondary)
        .collect_vec();
    if regular.len() == 1 {
        return Ok(regular.remove(0).clone());
    }

    Err(ambiguous(request, candidates.iter()))
}

fn ambiguous<'a>(
    request: &BeanRequest,
    candidates: impl Iterator<Item = &'a BeanDefinitionPtr>,
) -> BeanContextError {
    BeanContextError::AmbiguousBean {
        bean_type: request.bean_type.name().to_string(),
        qualifier: request.qualifier.clone(),
        candidates: candidates
            .map(|candidate| candidate.identifier().to_string())
            .collect(),
        dependent: None,
    }
}

#[cfg(test)]
mod tests {
    use crate::bean::{BeanDefinition, BeanRequest, BeanType, Cardinality};
    use crate::error::BeanContextError;
    use crate::provider::ErrorPtr;
    use crate::qualifier::{select, Qualifier, TypeArgument, TypeHierarchy};
    use crate::registry::BeanDefinitionPtr;
    use std::any::TypeId;
    use std::sync::Arc;

    trait Engine {}

    struct V8Engine;
    struct V6Engine;
    struct Number;
    struct Integer;

    struct Identity;

    impl TypeHierarchy for Identity {
        fn is_assignable(&self, from: TypeId, to: TypeId) -> bool {
            from == to || (from == TypeId::of::<Integer>() && to == TypeId::of::<Number>())
        }
    }

    fn definition<T: Send + Sync + 'static>(
        index: usize,
        configure: impl FnOnce(BeanDefinition) -> BeanDefinition,
    ) -> BeanDefinitionPtr {
        let mut definition = BeanDefinition::builder::<T>()
            .constructor(|_| Err(Arc::new(BeanContextError::ContextClosed) as ErrorPtr))
            .build()
            .unwrap();
        definition.index = index;
        Arc::new(configure(definition))
    }

    fn request(qualifier: Option<Qualifier>, cardinality: Cardinality) -> BeanRequest {
        BeanRequest::new::<dyn Engine + Send + Sync>(qualifier, cardinality)
    }

    fn indices(selected: &[BeanDefinitionPtr]) -> Vec<usize> {
        selected.iter().map(|definition| definition.index()).collect()
    }

    #[test]
    fn should_prefer_exact_names() {
        let candidates = vec![
            definition::<V8Engine>(0, |mut d| {
                d.name = Some("v6".to_string());
                d
            }),
            definition::<V6Engine>(1, |d| d),
        ];

        let selected = select(
            &request(Some(Qualifier::named("v6")), Cardinality::Required),
            candidates,
            &Identity,
        )
        .unwrap();
        assert_eq!(indices(&selected), [0]);
    }

    #[test]
    fn should_fall_back_to_type_names() {
        let candidates = vec![definition::<V8Engine>(0, |d| d), definition::<V6Engine>(1, |d| d)];

        let selected = select(
            &request(Some(Qualifier::named("V6")), Cardinality::Required),
            candidates.clone(),
            &Identity,
        )
        .unwrap();
        assert_eq!(indices(&selected), [1]);

        let selected = select(
            &request(Some(Qualifier::named("v8_engine")), Cardinality::Required),
            candidates,
            &Identity,
        )
        .unwrap();
        assert_eq!(indices(&selected), [0]);
    }

    #[test]
    fn should_select_primary() {
        let candidates = vec![
            definition::<V8Engine>(0, |d| d),
            definition::<V6Engine>(1, |mut d| {
                d.is_primary = true;
                d.order = 10;
                d
            }),
        ];

        let selected =
            select(&request(None, Cardinality::Required), candidates, &Identity).unwrap();
        assert_eq!(indices(&selected), [1]);
    }

    #[test]
    fn should_reject_multiple_primaries() {
        let candidates = vec![
            definition::<V8Engine>(0, |mut d| {
                d.is_primary = true;
                d
            }),
            definition::<V6Engine>(1, |mut d| {
                d.is_primary = true;
                d
            }),
        ];

        assert!(matches!(
            select(&request(None, Cardinality::Required), candidates, &Identity),
            Err(BeanContextError::AmbiguousBean { .. })
        ));
    }

    #[test]
    fn should_skip_secondary() {
        let candidates = vec![
            definition::<V8Engine>(0, |mut d| {
                d.is_secondary = true;
                d
            }),
            definition::<V6Engine>(1, |d| d),
        ];

        let selected =
            select(&request(None, Cardinality::Required), candidates, &Identity).unwrap();
        assert_eq!(indices(&selected), [1]);
    }

    #[test]
    fn should_report_ambiguity() {
        let candidates = vec![definition::<V8Engine>(0, |d| d), definition::<V6Engine>(1, |d| d)];

        match select(&request(None, Cardinality::Required), candidates, &Identity) {
            Err(BeanContextError::AmbiguousBean { candidates, .. }) => {
                assert_eq!(candidates, ["V8Engine", "V6Engine"])
            }
            result => panic!("unexpected result: {result:?}"),
        }
    }

    #[test]
    fn should_report_missing_beans() {
        assert!(matches!(
            select(&request(None, Cardinality::Required), vec![], &Identity),
            Err(BeanContextError::NoSuchBean { .. })
        ));
        assert!(select(&request(None, Cardinality::Optional), vec![], &Identity)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn should_order_collections() {
        let candidates = vec![
            definition::<V8Engine>(0, |mut d| {
                d.order = 5;
                d
            }),
            definition::<V6Engine>(1, |mut d| {
                d.order = -1;
                d
            }),
            definition::<Number>(2, |mut d| {
                d.order = 5;
                d
            }),
        ];

        let selected =
            select(&request(None, Cardinality::Collection), candidates, &Identity).unwrap();
        assert_eq!(indices(&selected), [1, 0, 2]);
    }

    #[test]
    fn should_filter_by_annotation_and_type() {
        let candidates = vec![
            definition::<V8Engine>(0, |mut d| {
                d.annotations.push("fast".to_string());
                d
            }),
            definition::<V6Engine>(1, |mut d| {
                d.annotations.push("fast".to_string());
                d
            }),
        ];

        let selected = select(
            &request(
                Some(Qualifier::annotation("fast").and(Qualifier::by_type::<V6Engine>())),
                Cardinality::Required,
            ),
            candidates,
            &Identity,
        )
        .unwrap();
        assert_eq!(indices(&selected), [1]);
    }

    #[test]
    fn should_match_type_arguments() {
        let candidates = vec![
            definition::<V8Engine>(0, |mut d| {
                d.type_arguments = vec![BeanType::of::<Integer>()];
                d
            }),
            definition::<V6Engine>(1, |mut d| {
                d.type_arguments = vec![BeanType::of::<String>()];
                d
            }),
        ];

        let selected = select(
            &request(
                Some(Qualifier::TypeArguments(vec![TypeArgument::of::<Number>()])),
                Cardinality::Collection,
            ),
            candidates.clone(),
            &Identity,
        )
        .unwrap();
        assert_eq!(indices(&selected), [0]);

        let selected = select(
            &request(
                Some(Qualifier::TypeArguments(vec![TypeArgument::Wildcard])),
                Cardinality::Collection,
            ),
            candidates,
            &Identity,
        )
        .unwrap();
        assert_eq!(indices(&selected), [0, 1]);
    }

    #[test]
    fn should_flatten_conjunctions() {
        assert_eq!(
            Qualifier::Any.and(Qualifier::named("a")),
            Qualifier::named("a")
        );
        assert_eq!(
            Qualifier::named("a")
                .and(Qualifier::annotation("b"))
                .and(Qualifier::annotation("c")),
            Qualifier::All(vec![
                Qualifier::named("a"),
                Qualifier::annotation("b"),
                Qualifier::annotation("c")
            ])
        );
    }
}
