//! Finding handler methods and their `(emitter path, event)` declarations.

use crate::parser::ast::{ClassDef, Decorator, Expr, FuncDef};
use crate::span::{Span, Spanned};

/// One `(emitter path, event)` pair taken from a handler decorator.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerPair {
    pub emitter: String,
    pub event: String,
    /// The decorator the pair came from.
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HandlerDecl<'a> {
    pub method: &'a FuncDef,
    /// Source order, outermost decorator first. Never empty.
    pub pairs: Vec<HandlerPair>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Scanned<'a> {
    Handler(HandlerDecl<'a>),
    /// Handler decorators mixed with other decorators, or used without a call.
    Invalid(&'a FuncDef),
}

/// Scan the methods defined directly in `cls` for handler decorators named `decorator`.
pub fn scan_class<'a>(cls: &'a ClassDef, decorator: &str) -> Vec<Scanned<'a>> {
    cls.methods
        .iter()
        .filter_map(|method| scan_method(&method.node, decorator))
        .collect()
}

fn scan_method<'a>(method: &'a FuncDef, decorator: &str) -> Option<Scanned<'a>> {
    let is_handler = |d: &Spanned<Decorator>| d.node.name() == decorator;
    if !method.decorators.iter().any(is_handler) || !method.is_annotated() {
        return None;
    }
    let homogeneous = method
        .decorators
        .iter()
        .all(|d| is_handler(d) && d.node.args.is_some());
    if !homogeneous {
        return Some(Scanned::Invalid(method));
    }

    let pairs: Vec<HandlerPair> = method.decorators.iter().filter_map(pair_of).collect();
    if pairs.is_empty() {
        return None;
    }
    Some(Scanned::Handler(HandlerDecl { method, pairs }))
}

/// `None` unless the call has exactly two string literal arguments.
fn pair_of(decorator: &Spanned<Decorator>) -> Option<HandlerPair> {
    match decorator.node.args.as_deref()? {
        [emitter, event] => match (&emitter.node, &event.node) {
            (Expr::Str(emitter), Expr::Str(event)) => Some(HandlerPair {
                emitter: emitter.clone(),
                event: event.clone(),
                span: decorator.span,
            }),
            _ => None,
        },
        _ => None,
    }
}
