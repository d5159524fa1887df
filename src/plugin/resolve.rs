//! Turning registry type names and attribute declarations into concrete types.

use super::api::{Lookup, SemanticApi};
use crate::typeck::env::SymbolNode;
use crate::typeck::types::{Type, TypeInfo};

/// Alias and re-export chains longer than this are treated as not-a-type.
const MAX_ALIAS_DEPTH: u8 = 8;

/// Outcome of resolving a type name.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeBinding {
    /// Not populated yet; the payload is the name that could not be resolved.
    Deferred(String),
    /// A type variable, `Any`, or anything that is not a nominal class. Checks are skipped.
    NotAType,
    Concrete(Type),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrLookup {
    Found(TypeBinding),
    NotFound,
}

/// Resolve `name` as written in the checked class's module.
pub fn resolve_type_name(api: &dyn SemanticApi, name: &str) -> TypeBinding {
    match api.lookup_qualified(name) {
        Lookup::NotReady => TypeBinding::Deferred(name.to_string()),
        Lookup::Ready(node) => bind_node(api, node, 0),
    }
}

/// Bind an analyzed type. `Unbound` names are looked up again in their own module.
pub fn bind_type(api: &dyn SemanticApi, ty: &Type) -> TypeBinding {
    bind_type_at(api, ty, 0)
}

fn bind_type_at(api: &dyn SemanticApi, ty: &Type, depth: u8) -> TypeBinding {
    match ty {
        Type::Instance { fullname, .. } => wildcard_instance(api, fullname),
        Type::Unbound { name, module } if depth < MAX_ALIAS_DEPTH => match api.lookup_in(module, name) {
            Lookup::NotReady => TypeBinding::Deferred(name.clone()),
            Lookup::Ready(node) => bind_node(api, node, depth + 1),
        },
        _ => TypeBinding::NotAType,
    }
}

/// Bind every `Unbound` name nested anywhere in `ty`. Names that are not a nominal
/// class become `Any`. Fails with the first name that is still not ready.
pub fn bind_nested(api: &dyn SemanticApi, ty: &Type) -> Result<Type, String> {
    let bound = match ty {
        Type::Unbound { .. } => match bind_type(api, ty) {
            TypeBinding::Concrete(bound) => bound,
            TypeBinding::NotAType => Type::Any,
            TypeBinding::Deferred(name) => return Err(name),
        },
        Type::Instance { fullname, args } => Type::Instance {
            fullname: fullname.clone(),
            args: args.iter().map(|a| bind_nested(api, a)).collect::<Result<_, _>>()?,
        },
        Type::Union(items) => Type::union(items.iter().map(|t| bind_nested(api, t)).collect::<Result<_, _>>()?),
        Type::Callable { params, ret } => Type::Callable {
            params: params
                .as_ref()
                .map(|ps| ps.iter().map(|p| bind_nested(api, p)).collect::<Result<Vec<_>, _>>())
                .transpose()?,
            ret: Box::new(bind_nested(api, ret)?),
        },
        Type::Any | Type::NoneType | Type::TypeVar(_) => ty.clone(),
    };
    Ok(bound)
}

fn bind_node(api: &dyn SemanticApi, node: SymbolNode, depth: u8) -> TypeBinding {
    match node {
        SymbolNode::TypeInfo(fullname) => wildcard_instance(api, &fullname),
        SymbolNode::Alias(target) => bind_type_at(api, &target, depth),
        _ => TypeBinding::NotAType,
    }
}

/// `C[Any, ...]` with one `Any` per declared type parameter.
fn wildcard_instance(api: &dyn SemanticApi, fullname: &str) -> TypeBinding {
    let arity = api.type_info(fullname).map_or(0, |info| info.type_vars.len());
    TypeBinding::Concrete(Type::instance(fullname, vec![Type::Any; arity]))
}

enum Member<'a> {
    Attr(&'a Type),
    Method,
    /// Some ancestor could not be resolved, so any name may exist.
    Dynamic,
    Missing,
}

fn member<'a>(api: &'a dyn SemanticApi, info: &'a TypeInfo, name: &str) -> Member<'a> {
    let mut dynamic = false;
    for fullname in &info.mro {
        let Some(ancestor) = api.type_info(fullname) else { continue };
        if let Some(ty) = ancestor.attrs.get(name) {
            return Member::Attr(ty);
        }
        if ancestor.methods.contains(name) {
            return Member::Method;
        }
        dynamic |= ancestor.fallback_to_any;
    }
    if dynamic { Member::Dynamic } else { Member::Missing }
}

/// Walk a dotted attribute path through the class and its ancestors.
pub fn resolve_attribute_type(api: &dyn SemanticApi, info: &TypeInfo, path: &str) -> AttrLookup {
    let mut owner = info;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        let ty = match member(api, owner, segment) {
            Member::Missing => return AttrLookup::NotFound,
            Member::Method | Member::Dynamic => return AttrLookup::Found(TypeBinding::NotAType),
            Member::Attr(ty) => ty,
        };
        // Declared type arguments are kept; only a nominal class can emit signals.
        let bound = match bind_nested(api, ty) {
            Ok(bound @ Type::Instance { .. }) => TypeBinding::Concrete(bound),
            Ok(_) => TypeBinding::NotAType,
            Err(name) => TypeBinding::Deferred(name),
        };
        if segments.peek().is_none() {
            return AttrLookup::Found(bound);
        }
        owner = match bound {
            TypeBinding::Concrete(Type::Instance { fullname, .. }) => match api.type_info(&fullname) {
                Some(next) => next,
                None => return AttrLookup::Found(TypeBinding::NotAType),
            },
            other => return AttrLookup::Found(other),
        };
    }
    AttrLookup::NotFound
}
