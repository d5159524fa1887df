//! The narrow contract between the signal checker and the host analyzer.
//!
//! The checker never touches host internals directly: everything it needs is a
//! query on [`SemanticApi`], and the host drives it through [`Plugin`] hooks.

use crate::diagnostics::ErrorCode;
use crate::parser::ast::{ClassDef, TypeExpr};
use crate::span::{Span, Spanned};
use crate::typeck::env::{Resolution, SymbolNode};
use crate::typeck::types::{Type, TypeInfo};

/// Result of a qualified lookup from inside a hook.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Ready(SymbolNode),
    /// Not populated yet. The caller should defer; it may become ready on a later pass.
    NotReady,
}

impl From<Resolution> for Lookup {
    fn from(res: Resolution) -> Self {
        match res {
            Resolution::Ready(node) => Lookup::Ready(node),
            Resolution::NotReady | Resolution::NotFound => Lookup::NotReady,
        }
    }
}

pub trait SemanticApi {
    /// Resolve a name as written in the module of the class being checked, falling
    /// back to a fully qualified lookup and then to a unique short class name.
    fn lookup_qualified(&self, name: &str) -> Lookup;

    /// Resolve a name in the scope of another module (used for `Type::Unbound`).
    fn lookup_in(&self, module: &str, name: &str) -> Lookup;

    fn analyze_type(&self, expr: &Spanned<TypeExpr>) -> Type;

    fn type_info(&self, fullname: &str) -> Option<&TypeInfo>;

    /// Ask the host to run this hook again on the next pass. Diagnostics from this run are dropped.
    fn defer(&mut self);

    fn fail(&mut self, code: ErrorCode, message: String, span: Span, method: Option<&str>);

    fn is_subtype(&self, left: &Type, right: &Type) -> bool;

    /// True when this is the last pass: deferring no longer helps.
    fn final_iteration(&self) -> bool;
}

/// What a class decorator hook receives.
pub struct ClassDefContext<'a> {
    pub cls: &'a ClassDef,
    pub info: &'a TypeInfo,
    pub api: &'a mut dyn SemanticApi,
}

pub trait ClassHook {
    fn on_class(&self, ctx: &mut ClassDefContext<'_>);
}

pub trait Plugin {
    /// The hook for classes decorated with `fullname`, if any.
    fn class_decorator_hook(&self, fullname: &str) -> Option<&dyn ClassHook>;
}
