//! Checking each handler declaration against the signals it subscribes to.

use std::collections::HashSet;

use super::api::{ClassDefContext, ClassHook, SemanticApi};
use super::argmap::{map_positional, unfilled_required};
use super::resolve::{AttrLookup, TypeBinding, bind_nested, resolve_attribute_type, resolve_type_name};
use super::scan::{HandlerDecl, HandlerPair, Scanned, scan_class};
use crate::diagnostics::ErrorCode;
use crate::parser::ast::{ArgKind, FuncDef};
use crate::registry::SignalRegistry;
use crate::span::Span;
use crate::typeck::types::{Type, TypeInfo, format_type};

/// The per-class pipeline: scan, resolve, map, compare.
pub struct SignalChecker<'r> {
    pub registry: &'r SignalRegistry,
    /// Name the first formal of every handler must carry.
    pub receiver: String,
    /// Final segment of the handler decorator's callee.
    pub handler_decorator: String,
}

/// State for one hook invocation. Nothing here outlives the class.
struct Session<'s> {
    api: &'s mut dyn SemanticApi,
    info: &'s TypeInfo,
    reported: HashSet<String>,
}

impl Session<'_> {
    fn fail(&mut self, code: ErrorCode, message: String, span: Span, method: &str) {
        self.api.fail(code, message, span, Some(method));
    }

    /// Defer the class, or report `name` once it can no longer become ready.
    fn unresolved(&mut self, name: &str, span: Span, method: &str) {
        if self.api.final_iteration() {
            if self.reported.insert(name.to_string()) {
                self.fail(ErrorCode::UnresolvedSymbol, format!("Cannot resolve name \"{name}\""), span, method);
            }
        } else {
            tracing::debug!(class = %self.info.name, name, "deferring on unresolved name");
            self.api.defer();
        }
    }
}

/// One expected slot of a signature.
enum Expected {
    Receiver,
    Value(Type),
    /// Unresolved or not a type; the position is not checked.
    Skip,
}

impl SignalChecker<'_> {
    pub fn check_class(&self, ctx: &mut ClassDefContext<'_>) {
        let mut session = Session { api: &mut *ctx.api, info: ctx.info, reported: HashSet::new() };
        for scanned in scan_class(ctx.cls, &self.handler_decorator) {
            match scanned {
                Scanned::Invalid(method) => session.fail(
                    ErrorCode::MixedOrInvalidDecorator,
                    format!("Callbacks may only be decorated by {}", self.handler_decorator),
                    method.name.span,
                    &method.name.node,
                ),
                Scanned::Handler(decl) => {
                    for pair in &decl.pairs {
                        self.check_pair(&mut session, &decl, pair);
                    }
                }
            }
        }
    }

    fn check_pair(&self, session: &mut Session<'_>, decl: &HandlerDecl<'_>, pair: &HandlerPair) {
        let method = &decl.method.name.node;
        let emitter = match resolve_attribute_type(&*session.api, session.info, &pair.emitter) {
            AttrLookup::NotFound => {
                let message = format!("\"{}\" has no attribute \"{}\"", session.info.name, pair.emitter);
                session.fail(ErrorCode::UnknownAttribute, message, pair.span, method);
                return;
            }
            AttrLookup::Found(TypeBinding::Deferred(name)) => return session.unresolved(&name, pair.span, method),
            AttrLookup::Found(TypeBinding::NotAType) => return,
            AttrLookup::Found(TypeBinding::Concrete(ty)) => ty,
        };

        let Some(emitted) = self.signal_types(&emitter, &pair.event) else {
            let message = format!("{} does not have signal \"{}\"", format_type(&emitter), pair.event);
            session.fail(ErrorCode::UnknownEvent, message, pair.span, method);
            return;
        };

        let mut expected = vec![Expected::Receiver];
        let mut supplied = Vec::new();
        for name in emitted {
            match resolve_type_name(&*session.api, name) {
                TypeBinding::Concrete(ty) => {
                    supplied.push(format_type(&ty));
                    expected.push(Expected::Value(ty));
                }
                TypeBinding::Deferred(missing) => {
                    session.unresolved(&missing, pair.span, method);
                    supplied.push(format!("\"{name}\""));
                    expected.push(Expected::Skip);
                }
                TypeBinding::NotAType => {
                    supplied.push(format!("\"{name}\""));
                    expected.push(Expected::Skip);
                }
            }
        }
        let supplied = supplied.join(", ");

        let kinds: Vec<ArgKind> = decl.method.params.iter().map(|p| p.kind).collect();
        let mapping = map_positional(expected.len(), &kinds);
        for (position, slot) in expected.iter().enumerate() {
            if matches!(slot, Expected::Skip) {
                continue;
            }
            let Some(formal) = mapping[position] else {
                let message = format!("Too many arguments for \"{method}\"; Emitted signal will supply [{supplied}]");
                session.fail(ErrorCode::TooManyArguments, message, decl.method.name.span, method);
                return;
            };
            match slot {
                Expected::Receiver => self.check_receiver(session, decl.method, formal),
                Expected::Value(ty) => {
                    if !self.check_value(session, decl.method, position, formal, ty) {
                        return;
                    }
                }
                Expected::Skip => {}
            }
        }

        if !unfilled_required(expected.len(), &kinds).is_empty() {
            let message = format!("Too few arguments for \"{method}\"; Emitted signal will supply [{supplied}]");
            session.fail(ErrorCode::TooManyArguments, message, decl.method.name.span, method);
        }
    }

    /// Emitted type names for `event` on the emitter's own class. Signals are not inherited.
    fn signal_types<'a>(&'a self, emitter: &Type, event: &str) -> Option<&'a [String]> {
        self.registry.signal(emitter.fullname()?, event)
    }

    fn check_receiver(&self, session: &mut Session<'_>, method: &FuncDef, formal: usize) {
        let param = &method.params[formal];
        if param.name.node != self.receiver {
            let message = format!("Argument 1 to {} should be \"{}\"", method.name.node, self.receiver);
            session.fail(ErrorCode::InvalidReceiverName, message, param.name.span, &method.name.node);
        }
    }

    /// Compare one emitted value against its formal. Returns false when the pair was deferred.
    fn check_value(
        &self,
        session: &mut Session<'_>,
        method: &FuncDef,
        position: usize,
        formal: usize,
        expected: &Type,
    ) -> bool {
        let param = &method.params[formal];
        let Some(annotation) = &param.annotation else {
            return true;
        };
        let analyzed = session.api.analyze_type(annotation);
        let actual = match bind_nested(&*session.api, &analyzed) {
            Ok(ty) => ty,
            Err(name) => {
                session.unresolved(&name, annotation.span, &method.name.node);
                return false;
            }
        };
        if !session.api.is_subtype(expected, &actual) {
            let message = format!(
                "Argument {} to \"{}\" has incompatible type {}; Emitted signal will expect type {}.",
                position + 1,
                method.name.node,
                format_type(&actual),
                format_type(expected),
            );
            session.fail(ErrorCode::ArgumentTypeMismatch, message, annotation.span, &method.name.node);
        }
        true
    }
}

impl ClassHook for SignalChecker<'_> {
    fn on_class(&self, ctx: &mut ClassDefContext<'_>) {
        self.check_class(ctx);
    }
}
