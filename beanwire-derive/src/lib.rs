use crate::bean::expand_bean;
use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput, Error};

mod attributes;
mod bean;

/// Generates a [Bean](../beanwire/bean/trait.Bean.html) implementation and registers its definition
/// for automatic discovery. Fields are injected as constructor arguments: `BeanPtr<T>` fields
/// require a single bean, `Option<BeanPtr<T>>` fields an optional one and `Vec<BeanPtr<T>>` fields
/// all matching beans.
///
/// Struct attributes (`#[bean(...)]`): `name = "..."`, `scope = "..."`, `annotation = "..."`,
/// `primary`, `secondary`, `eager`, `order = <expr>`, `condition = "path::to::fn"`,
/// `exposes = ["dyn Trait + Send + Sync"]`, `replaces = "Type"`, `post_construct = "method"` and
/// `pre_destroy = "method"`.
///
/// Field attributes: `name = "..."` to require a named bean, `property = "key"` with optional
/// `default_value = "..."` to inject a parsed property, and `default` or `default = "fn_path"` to
/// skip injection.
#[proc_macro_derive(Bean, attributes(bean))]
pub fn generate_bean(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_bean(&input)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}
