use syn::meta::ParseNestedMeta;
use syn::{Attribute, Error, Expr, ExprArray, ExprLit, ExprPath, Ident, Lit, LitStr, Token, Type};

pub const BEAN: &str = "bean";

pub enum DefaultDefinition {
    Default,
    Expr(ExprPath),
}

#[derive(Default)]
pub struct FieldAttributes {
    pub default: Option<DefaultDefinition>,
    pub name: Option<LitStr>,
    pub property: Option<LitStr>,
    pub default_value: Option<LitStr>,
}

impl TryFrom<&Attribute> for FieldAttributes {
    type Error = Error;

    fn try_from(value: &Attribute) -> Result<Self, Self::Error> {
        let mut attributes = Self::default();
        value.parse_nested_meta(|meta| {
            if meta.path.is_ident("default") {
                if meta.input.peek(Token![=]) {
                    let value = meta.value()?;
                    let expr: LitStr = value.parse()?;
                    attributes.default = Some(DefaultDefinition::Expr(expr.parse()?));
                } else {
                    attributes.default = Some(DefaultDefinition::Default);
                }
            } else if meta.path.is_ident("name") {
                attributes.name = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("property") {
                attributes.property = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("default_value") {
                attributes.default_value = Some(meta.value()?.parse()?);
            } else {
                return Err(meta.error("Unsupported field attribute!"));
            }

            Ok(())
        })?;

        if attributes.default.is_some()
            && (attributes.name.is_some() || attributes.property.is_some())
        {
            return Err(Error::new_spanned(
                value,
                "Default fields cannot be injected!",
            ));
        }

        Ok(attributes)
    }
}

#[derive(Default)]
pub struct BeanAttributes {
    pub name: Option<LitStr>,
    pub scope: Option<LitStr>,
    pub annotations: Vec<LitStr>,
    pub is_primary: bool,
    pub is_secondary: bool,
    pub eager: bool,
    pub order: Option<Expr>,
    pub conditions: Vec<ExprPath>,
    pub exposes: Vec<Type>,
    pub replaces: Option<Type>,
    pub post_construct: Option<Ident>,
    pub pre_destroy: Option<Ident>,
}

fn parse_types(meta: &ParseNestedMeta) -> Result<Vec<Type>, Error> {
    let array: ExprArray = meta.value()?.parse()?;
    array
        .elems
        .iter()
        .map(|elem| {
            if let Expr::Lit(ExprLit {
                lit: Lit::Str(string),
                ..
            }) = elem
            {
                string.parse()
            } else {
                Err(Error::new_spanned(elem, "Expected a type name string!"))
            }
        })
        .collect()
}

fn parse_ident(meta: &ParseNestedMeta) -> Result<Ident, Error> {
    let name: LitStr = meta.value()?.parse()?;
    name.parse()
}

impl TryFrom<&Attribute> for BeanAttributes {
    type Error = Error;

    fn try_from(value: &Attribute) -> Result<Self, Self::Error> {
        let mut attributes = Self::default();
        value.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                attributes.name = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("scope") {
                attributes.scope = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("annotation") {
                attributes.annotations.push(meta.value()?.parse()?);
            } else if meta.path.is_ident("primary") {
                attributes.is_primary = true;
            } else if meta.path.is_ident("secondary") {
                attributes.is_secondary = true;
            } else if meta.path.is_ident("eager") {
                attributes.eager = true;
            } else if meta.path.is_ident("order") {
                attributes.order = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("condition") {
                let path: LitStr = meta.value()?.parse()?;
                attributes.conditions.push(path.parse()?);
            } else if meta.path.is_ident("exposes") {
                attributes.exposes.extend(parse_types(&meta)?);
            } else if meta.path.is_ident("replaces") {
                let ty: LitStr = meta.value()?.parse()?;
                attributes.replaces = Some(ty.parse()?);
            } else if meta.path.is_ident("post_construct") {
                attributes.post_construct = Some(parse_ident(&meta)?);
            } else if meta.path.is_ident("pre_destroy") {
                attributes.pre_destroy = Some(parse_ident(&meta)?);
            } else {
                return Err(meta.error("Unsupported bean attribute!"));
            }

            Ok(())
        })?;

        if attributes.is_primary && attributes.is_secondary {
            return Err(Error::new_spanned(
                value,
                "Bean cannot be both primary and secondary!",
            ));
        }

        Ok(attributes)
    }
}
