use crate::attributes::{BeanAttributes, DefaultDefinition, FieldAttributes, BEAN};
use convert_case::{Case, Casing};
use itertools::Itertools;
use proc_macro2::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{
    Attribute, Data, DataStruct, DeriveInput, Error, Field, Fields, GenericArgument, Ident,
    PathArguments, Result, Type,
};

enum FieldKind<'a> {
    Bean(&'a Type),
    OptionalBean(&'a Type),
    Beans(&'a Type),
}

/// Returns the single generic argument of `ty` if it's `wrapper<T>`.
fn wrapped_type<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(path) = ty else {
        return None;
    };

    let segment = path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }

    let PathArguments::AngleBracketed(arguments) = &segment.arguments else {
        return None;
    };

    arguments
        .args
        .iter()
        .filter_map(|argument| match argument {
            GenericArgument::Type(ty) => Some(ty),
            _ => None,
        })
        .exactly_one()
        .ok()
}

fn field_kind(ty: &Type) -> FieldKind {
    if let Some(inner) = wrapped_type(ty, "Option") {
        FieldKind::OptionalBean(inner)
    } else if let Some(inner) = wrapped_type(ty, "Vec") {
        FieldKind::Beans(inner)
    } else {
        FieldKind::Bean(ty)
    }
}

fn extract_field_attributes(field: &Field) -> Result<FieldAttributes> {
    field
        .attrs
        .iter()
        .find(|attribute| attribute.path().is_ident(BEAN))
        .map(FieldAttributes::try_from)
        .transpose()
        .map(Option::unwrap_or_default)
}

fn extract_bean_attributes(attributes: &[Attribute]) -> Result<BeanAttributes> {
    attributes
        .iter()
        .find(|attribute| attribute.path().is_ident(BEAN))
        .map(BeanAttributes::try_from)
        .transpose()
        .map(Option::unwrap_or_default)
}

/// Injection point declaration and the expression taking the resolved value from arguments.
struct FieldInjection {
    point: Option<TokenStream>,
    value: TokenStream,
}

fn generate_injection(field: &Field, name: &str, index: usize) -> Result<FieldInjection> {
    let attributes = extract_field_attributes(field)?;
    match &attributes.default {
        Some(DefaultDefinition::Expr(path)) => {
            return Ok(FieldInjection {
                point: None,
                value: quote!(#path()),
            })
        }
        Some(DefaultDefinition::Default) => {
            return Ok(FieldInjection {
                point: None,
                value: quote!(::std::default::Default::default()),
            })
        }
        None => {}
    }

    let ty = &field.ty;

    if let Some(key) = &attributes.property {
        let default_value = attributes
            .default_value
            .as_ref()
            .map(|value| quote!(.with_default(#value)));

        return Ok(match wrapped_type(ty, "Option") {
            Some(_) => FieldInjection {
                point: Some(quote! {
                    ::beanwire::injection::InjectionPoint::property(#name, #key)
                        #default_value
                        .optional()
                }),
                value: quote!(arguments.parse_optional(#index)?),
            },
            None => FieldInjection {
                point: Some(quote! {
                    ::beanwire::injection::InjectionPoint::property(#name, #key)
                        #default_value
                }),
                value: quote!(arguments.parse(#index)?),
            },
        });
    }

    if let Some(value) = &attributes.default_value {
        return Err(Error::new(
            value.span(),
            "Default values are only supported for properties!",
        ));
    }

    let qualifier = attributes
        .name
        .as_ref()
        .map(|qualifier| quote!(.named(#qualifier)));

    Ok(match field_kind(ty) {
        FieldKind::Bean(ty) => FieldInjection {
            point: Some(quote! {
                ::beanwire::injection::InjectionPoint::bean::<<#ty as ::std::ops::Deref>::Target>(#name)
                    #qualifier
            }),
            value: quote!(arguments.bean(#index)?),
        },
        FieldKind::OptionalBean(ty) => FieldInjection {
            point: Some(quote! {
                ::beanwire::injection::InjectionPoint::bean::<<#ty as ::std::ops::Deref>::Target>(#name)
                    #qualifier
                    .optional()
            }),
            value: quote!(arguments.optional_bean(#index)?),
        },
        FieldKind::Beans(ty) => FieldInjection {
            point: Some(quote! {
                ::beanwire::injection::InjectionPoint::bean::<<#ty as ::std::ops::Deref>::Target>(#name)
                    #qualifier
                    .collection()
            }),
            value: quote!(arguments.beans(#index)?),
        },
    })
}

/// Generates constructor arguments and the construction expression for given fields.
fn generate_construction(fields: &Fields) -> Result<(Vec<TokenStream>, TokenStream)> {
    let mut points = vec![];
    let mut values = vec![];

    for (position, field) in fields.iter().enumerate() {
        let name = field
            .ident
            .as_ref()
            .map(Ident::to_string)
            .unwrap_or_else(|| position.to_string());

        let injection = generate_injection(field, &name, points.len())?;
        points.extend(injection.point);
        values.push((field.ident.as_ref(), injection.value));
    }

    let construction = match fields {
        Fields::Named(_) => {
            let fields = values
                .into_iter()
                .map(|(ident, value)| quote!(#ident: #value))
                .collect_vec();
            quote! {
                Self {
                    #(#fields),*
                }
            }
        }
        Fields::Unnamed(_) => {
            let fields = values.into_iter().map(|(_, value)| value).collect_vec();
            quote!(Self(#(#fields),*))
        }
        Fields::Unit => quote!(Self),
    };

    Ok((points, construction))
}

fn generate_modifiers(attributes: &BeanAttributes) -> Vec<TokenStream> {
    let mut modifiers = vec![];

    if let Some(scope) = &attributes.scope {
        modifiers.push(quote!(.scope(#scope)));
    }

    modifiers.extend(
        attributes
            .annotations
            .iter()
            .map(|annotation| quote!(.annotated(#annotation))),
    );

    if attributes.is_primary {
        modifiers.push(quote!(.primary()));
    }

    if attributes.is_secondary {
        modifiers.push(quote!(.secondary()));
    }

    if attributes.eager {
        modifiers.push(quote!(.eager()));
    }

    if let Some(order) = &attributes.order {
        modifiers.push(quote!(.order(#order)));
    }

    modifiers.extend(
        attributes
            .conditions
            .iter()
            .map(|condition| quote!(.requires(#condition()))),
    );

    if let Some(replaces) = &attributes.replaces {
        modifiers.push(quote!(.replaces(::beanwire::bean::Replaces::bean::<#replaces>())));
    }

    if let Some(method) = &attributes.post_construct {
        modifiers.push(quote!(.post_construct(|bean: &mut Self| bean.#method())));
    }

    if let Some(method) = &attributes.pre_destroy {
        modifiers.push(quote!(.pre_destroy(|bean: &Self| bean.#method())));
    }

    modifiers
}

pub fn expand_bean(input: &DeriveInput) -> Result<TokenStream> {
    let Data::Struct(DataStruct { fields, .. }) = &input.data else {
        return Err(Error::new(input.span(), "Can only derive Bean on structs!"));
    };

    if !input.generics.params.is_empty() {
        return Err(Error::new(
            input.generics.span(),
            "Cannot derive Bean on generic structs!",
        ));
    }

    let ident = &input.ident;
    let attributes = extract_bean_attributes(&input.attrs)?;
    let name = attributes
        .name
        .as_ref()
        .map(|name| name.value())
        .unwrap_or_else(|| ident.to_string().to_case(Case::Snake));

    let (points, construction) = generate_construction(fields)?;
    let arguments = if points.is_empty() {
        quote!(_)
    } else {
        quote!(arguments)
    };

    let modifiers = generate_modifiers(&attributes);
    let exposes = &attributes.exposes;

    Ok(quote! {
        #[automatically_derived]
        impl ::beanwire::bean::Bean for #ident {
            fn definition() -> ::std::result::Result<::beanwire::bean::BeanDefinition, ::beanwire::error::BeanDefinitionError> {
                ::beanwire::bean::BeanDefinition::builder::<Self>()
                    .named(#name)
                    #(#modifiers)*
                    #(.constructor_arg(#points))*
                    .constructor(|#arguments: &mut ::beanwire::injection::Arguments| {
                        ::std::result::Result::Ok(#construction)
                    })
                    #(.exposes::<#exposes>(|bean| bean as ::beanwire::provider::BeanPtr<#exposes>))*
                    .build()
            }
        }

        const _: () = {
            ::beanwire::registry::internal::submit! {
                ::beanwire::registry::internal::BeanDefinitionRegisterer {
                    register: <#ident as ::beanwire::bean::Bean>::definition
                }
            };
        };
    })
}
