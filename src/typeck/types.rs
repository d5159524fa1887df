use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::parser::ast::Variance;
use crate::span::Span;

/// A semantic type as seen by the checker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// A nominal class instantiated with type arguments.
    Instance { fullname: String, args: Vec<Type> },
    Any,
    NoneType,
    Union(Vec<Type>),
    TypeVar(String),
    /// `Callable[[params], ret]`; `params: None` is `Callable[..., ret]`.
    Callable { params: Option<Vec<Type>>, ret: Box<Type> },
    /// A name that was not ready (or not found) when the annotation was analyzed.
    /// `module` is the scope the name must be resolved in.
    Unbound { name: String, module: String },
}

impl Type {
    pub fn instance(fullname: impl Into<String>, args: Vec<Type>) -> Self {
        Type::Instance { fullname: fullname.into(), args }
    }

    /// Build a union, flattening nested unions and dropping duplicates.
    pub fn union(items: Vec<Type>) -> Self {
        let mut flat: Vec<Type> = Vec::new();
        for item in items {
            match item {
                Type::Union(inner) => {
                    for t in inner {
                        if !flat.contains(&t) {
                            flat.push(t);
                        }
                    }
                }
                other => {
                    if !flat.contains(&other) {
                        flat.push(other);
                    }
                }
            }
        }
        match flat.len() {
            0 => Type::Any,
            1 => flat.remove(0),
            _ => Type::Union(flat),
        }
    }

    /// Replace type variables according to `subst`; unmapped variables are kept.
    pub fn substitute(&self, subst: &HashMap<String, Type>) -> Type {
        match self {
            Type::TypeVar(name) => subst.get(name).cloned().unwrap_or_else(|| self.clone()),
            Type::Instance { fullname, args } => Type::Instance {
                fullname: fullname.clone(),
                args: args.iter().map(|a| a.substitute(subst)).collect(),
            },
            Type::Union(items) => Type::union(items.iter().map(|t| t.substitute(subst)).collect()),
            Type::Callable { params, ret } => Type::Callable {
                params: params.as_ref().map(|ps| ps.iter().map(|p| p.substitute(subst)).collect()),
                ret: Box::new(ret.substitute(subst)),
            },
            Type::Any | Type::NoneType | Type::Unbound { .. } => self.clone(),
        }
    }

    /// Type variables in order of first appearance.
    pub fn collect_type_vars(&self, out: &mut Vec<String>) {
        match self {
            Type::TypeVar(name) => {
                if !out.contains(name) {
                    out.push(name.clone());
                }
            }
            Type::Instance { args, .. } => args.iter().for_each(|a| a.collect_type_vars(out)),
            Type::Union(items) => items.iter().for_each(|t| t.collect_type_vars(out)),
            Type::Callable { params, ret } => {
                if let Some(params) = params {
                    params.iter().for_each(|p| p.collect_type_vars(out));
                }
                ret.collect_type_vars(out);
            }
            Type::Any | Type::NoneType | Type::Unbound { .. } => {}
        }
    }

    pub fn fullname(&self) -> Option<&str> {
        match self {
            Type::Instance { fullname, .. } => Some(fullname),
            _ => None,
        }
    }
}

/// Last dotted segment of a fully qualified name.
pub fn short_name(fullname: &str) -> &str {
    fullname.rsplit('.').next().unwrap_or(fullname)
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(f: &mut fmt::Formatter<'_>, items: &[Type], sep: &str) -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, "{sep}")?;
                }
                write!(f, "{item}")?;
            }
            Ok(())
        }
        match self {
            Type::Instance { fullname, args } => {
                write!(f, "{}", short_name(fullname))?;
                if !args.is_empty() {
                    write!(f, "[")?;
                    list(f, args, ", ")?;
                    write!(f, "]")?;
                }
                Ok(())
            }
            Type::Any => write!(f, "Any"),
            Type::NoneType => write!(f, "None"),
            Type::Union(items) => list(f, items, " | "),
            Type::TypeVar(name) => write!(f, "{name}"),
            Type::Callable { params: None, ret } => write!(f, "Callable[..., {ret}]"),
            Type::Callable { params: Some(params), ret } => {
                write!(f, "Callable[[")?;
                list(f, params, ", ")?;
                write!(f, "], {ret}]")
            }
            Type::Unbound { name, .. } => write!(f, "{name}"),
        }
    }
}

/// Quoted rendering used in diagnostic messages: `"list[Any]"`.
pub fn format_type(ty: &Type) -> String {
    format!("\"{ty}\"")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeVarDef {
    pub name: String,
    pub variance: Variance,
}

/// A completed class definition.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub name: String,
    pub fullname: String,
    pub module: String,
    pub type_vars: Vec<TypeVarDef>,
    /// Direct bases, expressed in terms of this class's own type variables.
    pub bases: Vec<Type>,
    pub attrs: HashMap<String, Type>,
    pub methods: HashSet<String>,
    /// Fullnames in method resolution order, starting with this class.
    pub mro: Vec<String>,
    /// Some base could not be resolved; unknown attributes and supertypes are treated as `Any`.
    pub fallback_to_any: bool,
    pub span: Span,
}

impl TypeInfo {
    pub fn has_base(&self, fullname: &str) -> bool {
        self.mro.iter().any(|m| m == fullname)
    }
}
