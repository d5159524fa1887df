pub mod env;
pub mod prelude;
pub mod resolve;
pub mod subtype;
pub mod types;

use std::collections::{HashMap, HashSet};

use crate::diagnostics::{Diagnostic, ErrorCode};
use crate::parser::ast::{Assign, ClassDef, Import, Item, Module, TypeExpr};
use crate::parser::parse_type_str;
use crate::plugin::api::{ClassDefContext, Lookup, Plugin, SemanticApi};
use crate::span::{Span, Spanned};
use env::{Env, ImportTarget, ModuleScope, Resolution, SpecialForm, SymbolNode};
use resolve::TypeAnalyzer;
use types::{Type, TypeInfo, TypeVarDef};

/// One parsed input together with the module name it is analyzed under.
#[derive(Debug, Clone)]
pub struct ParsedModule {
    pub name: String,
    /// Index into the checked file list; `None` for bundled stubs.
    pub file_id: Option<u32>,
    pub ast: Module,
}

impl ParsedModule {
    /// Attach this module's file to a parser span.
    pub fn span(&self, span: Span) -> Span {
        Span::with_file(span.start, span.end, self.file_id.unwrap_or(0))
    }
}

pub struct AnalysisResult {
    pub env: Env,
    pub diagnostics: Vec<Diagnostic>,
    pub passes: usize,
}

#[derive(Debug, Clone, Copy)]
struct WorkItem {
    module: usize,
    item: usize,
}

/// How the right-hand side of an unannotated assignment reads.
enum AssignKind {
    TypeAlias,
    Value,
    NotReady,
}

/// Fixed-point semantic analysis over a set of modules.
///
/// Each pass completes pending declarations in source order, then runs the
/// plugin hooks of completed classes. A hook that defers is retried on the next
/// pass with its diagnostics dropped. A pass without progress makes the next
/// pass final; on the final pass unresolved names are forced and reported.
pub struct Analyzer<'p> {
    env: Env,
    plugin: Option<&'p dyn Plugin>,
    max_passes: usize,
}

impl<'p> Analyzer<'p> {
    pub fn new(plugin: Option<&'p dyn Plugin>, max_passes: usize) -> Self {
        Self::with_env(prelude::prelude_env(), plugin, max_passes)
    }

    pub fn with_env(env: Env, plugin: Option<&'p dyn Plugin>, max_passes: usize) -> Self {
        Self { env, plugin, max_passes: max_passes.max(1) }
    }

    pub fn analyze(mut self, modules: &[ParsedModule]) -> AnalysisResult {
        let mut pending = Vec::new();
        for (index, module) in modules.iter().enumerate() {
            self.declare(index, module, &mut pending);
        }
        let mut hooks = self.hooked_classes(modules);

        let mut diagnostics = Vec::new();
        let mut passes = 0;
        let mut stalled = false;
        while passes < self.max_passes {
            passes += 1;
            let final_pass = stalled || passes == self.max_passes;
            let before = pending.len();
            pending.retain(|w: &WorkItem| !self.complete(&modules[w.module], w.item, final_pass, &mut diagnostics));
            let mut progressed = pending.len() < before;

            hooks.retain(|w: &WorkItem| match self.run_hook(&modules[w.module], w.item, final_pass) {
                Some(found) => {
                    diagnostics.extend(found);
                    progressed = true;
                    false
                }
                None => true,
            });

            tracing::debug!(
                pass = passes,
                final_pass,
                pending = pending.len(),
                hooks = hooks.len(),
                "pass finished"
            );
            if final_pass || (pending.is_empty() && hooks.is_empty()) {
                break;
            }
            stalled = !progressed;
        }

        diagnostics.sort_by_key(|d| (d.span.file_id, d.span.start));
        AnalysisResult { env: self.env, diagnostics, passes }
    }

    fn declare(&mut self, index: usize, module: &ParsedModule, pending: &mut Vec<WorkItem>) {
        if self.env.module(&module.name).is_none() {
            self.env.add_module(ModuleScope::new(&module.name, module.file_id));
        }
        let Some(scope) = self.env.module_mut(&module.name) else {
            return;
        };
        for (item_index, item) in module.ast.items.iter().enumerate() {
            let work = WorkItem { module: index, item: item_index };
            match item {
                Item::Import(import) => declare_import(scope, &import.node),
                Item::Class(class) => {
                    scope.declare(class.node.name.node.clone());
                    pending.push(work);
                }
                Item::Function(func) => scope.define(func.node.name.node.clone(), SymbolNode::Function),
                Item::TypeVar(tv) => scope.define(
                    tv.node.name.node.clone(),
                    SymbolNode::TypeVar(TypeVarDef { name: tv.node.name.node.clone(), variance: tv.node.variance }),
                ),
                Item::Assign(assign) => {
                    scope.declare(assign.node.name.node.clone());
                    pending.push(work);
                }
            }
        }
    }

    fn hooked_classes(&self, modules: &[ParsedModule]) -> Vec<WorkItem> {
        let Some(plugin) = self.plugin else {
            return Vec::new();
        };
        let mut hooks = Vec::new();
        for (index, module) in modules.iter().enumerate() {
            let Some(scope) = self.env.module(&module.name) else { continue };
            for (item_index, item) in module.ast.items.iter().enumerate() {
                let Item::Class(class) = item else { continue };
                let hooked = class
                    .node
                    .decorators
                    .iter()
                    .any(|d| plugin.class_decorator_hook(&scope.qualify(&d.node.callee.node)).is_some());
                if hooked {
                    hooks.push(WorkItem { module: index, item: item_index });
                }
            }
        }
        hooks
    }

    /// Run the hooks of one class. `None` means "try again next pass".
    fn run_hook(&self, module: &ParsedModule, item: usize, final_pass: bool) -> Option<Vec<Diagnostic>> {
        let Item::Class(class) = &module.ast.items[item] else {
            return Some(Vec::new());
        };
        let fullname = format!("{}.{}", module.name, class.node.name.node);
        // The class itself has not completed yet.
        let info = self.env.type_info(&fullname)?;
        let (Some(plugin), Some(scope)) = (self.plugin, self.env.module(&module.name)) else {
            return Some(Vec::new());
        };

        let mut api = HookApi {
            env: &self.env,
            module: &module.name,
            file_id: module.file_id.unwrap_or(0),
            class_name: &class.node.name.node,
            final_iteration: final_pass,
            deferred: false,
            diagnostics: Vec::new(),
        };
        for decorator in &class.node.decorators {
            let Some(hook) = plugin.class_decorator_hook(&scope.qualify(&decorator.node.callee.node)) else {
                continue;
            };
            let mut ctx = ClassDefContext { cls: &class.node, info, api: &mut api };
            hook.on_class(&mut ctx);
        }

        if api.deferred && !final_pass {
            tracing::debug!(class = %fullname, dropped = api.diagnostics.len(), "class hook deferred");
            return None;
        }
        tracing::debug!(class = %fullname, diagnostics = api.diagnostics.len(), "class hook completed");
        Some(api.diagnostics)
    }

    fn complete(&mut self, module: &ParsedModule, item: usize, final_pass: bool, diags: &mut Vec<Diagnostic>) -> bool {
        match &module.ast.items[item] {
            Item::Class(class) => self.complete_class(module, class, final_pass, diags),
            Item::Assign(assign) => self.complete_assign(module, &assign.node, final_pass),
            _ => true,
        }
    }

    fn complete_class(
        &mut self,
        module: &ParsedModule,
        class: &Spanned<ClassDef>,
        final_pass: bool,
        diags: &mut Vec<Diagnostic>,
    ) -> bool {
        let def = &class.node;
        let name = &def.name.node;
        let fullname = format!("{}.{name}", module.name);
        let analyzer = TypeAnalyzer::new(&self.env, &module.name);

        let mut bases = Vec::new();
        let mut declared_vars: Option<Vec<String>> = None;
        let mut missing = Vec::new();
        let mut fallback_to_any = false;
        for base in &def.bases {
            let head = match &base.node {
                TypeExpr::Name(head) | TypeExpr::Subscript { base: head, .. } => head.as_str(),
                _ => {
                    fallback_to_any = true;
                    continue;
                }
            };
            match self.env.lookup_dotted(&module.name, head) {
                Resolution::Ready(SymbolNode::Special(SpecialForm::Generic | SpecialForm::Protocol)) => {
                    let vars = declared_vars.get_or_insert_with(Vec::new);
                    if let TypeExpr::Subscript { args, .. } = &base.node {
                        for arg in args {
                            if let Type::TypeVar(v) = analyzer.analyze(arg) {
                                if !vars.contains(&v) {
                                    vars.push(v);
                                }
                            }
                        }
                    }
                }
                Resolution::Ready(_) => match analyzer.analyze(base) {
                    ty @ Type::Instance { .. } => bases.push(ty),
                    _ => fallback_to_any = true,
                },
                Resolution::NotReady if !final_pass => return false,
                Resolution::NotReady | Resolution::NotFound => missing.push(base),
            }
        }

        let is_object = fullname == "builtins.object";
        if bases.is_empty() && !is_object {
            if self.env.type_info("builtins.object").is_none() && !final_pass {
                return false;
            }
            bases.push(Type::instance("builtins.object", vec![]));
        }
        for base in missing {
            fallback_to_any = true;
            tracing::warn!(class = %fullname, base = %base.node, "unresolved base class");
            if module.file_id.is_some() {
                diags.push(Diagnostic {
                    code: ErrorCode::UnresolvedSymbol,
                    message: format!("Cannot resolve base class \"{}\" of \"{name}\"", base.node),
                    class_name: name.clone(),
                    method_name: None,
                    span: module.span(base.span),
                });
            }
        }

        let var_names = declared_vars.unwrap_or_else(|| {
            let mut found = Vec::new();
            bases.iter().for_each(|b| b.collect_type_vars(&mut found));
            found
        });
        let type_vars = var_names.into_iter().map(|v| self.type_var_def(&module.name, v)).collect();

        let mut attrs = HashMap::new();
        for attr in &def.attrs {
            attrs
                .entry(attr.name.node.clone())
                .or_insert_with(|| analyzer.analyze(&attr.annotation));
        }
        let methods: HashSet<String> = def.methods.iter().map(|m| m.node.name.node.clone()).collect();

        // Depth-first, left to right; a class shared by several bases keeps its last position.
        let mut order = vec![fullname.clone()];
        for base in &bases {
            if let Some(info) = base.fullname().and_then(|f| self.env.type_info(f)) {
                order.extend(info.mro.iter().cloned());
            }
        }
        let mro = order
            .iter()
            .enumerate()
            .filter(|(i, m)| !order[i + 1..].contains(m))
            .map(|(_, m)| m.clone())
            .collect();

        let info = TypeInfo {
            name: name.clone(),
            fullname: fullname.clone(),
            module: module.name.clone(),
            type_vars,
            bases,
            attrs,
            methods,
            mro,
            fallback_to_any,
            span: module.span(def.name.span),
        };
        tracing::trace!(class = %fullname, "class completed");
        self.env.insert_type(info);
        true
    }

    fn type_var_def(&self, module: &str, name: String) -> TypeVarDef {
        match self.env.lookup_dotted(module, &name) {
            Resolution::Ready(SymbolNode::TypeVar(def)) => def,
            _ => TypeVarDef { name, variance: Default::default() },
        }
    }

    fn complete_assign(&mut self, module: &ParsedModule, assign: &Assign, final_pass: bool) -> bool {
        let analyze = |env: &Env, expr: &Spanned<TypeExpr>| TypeAnalyzer::new(env, &module.name).analyze(expr);
        let node = if assign.is_explicit_alias() {
            match &assign.value {
                Some(value) if !final_pass && !self.names_ready(&module.name, value) => return false,
                Some(value) => SymbolNode::Alias(analyze(&self.env, value)),
                None => SymbolNode::Alias(Type::Any),
            }
        } else if let Some(annotation) = &assign.annotation {
            SymbolNode::Var(analyze(&self.env, annotation))
        } else if let Some(value) = &assign.value {
            match self.assign_kind(&module.name, value) {
                AssignKind::TypeAlias if !final_pass && !self.names_ready(&module.name, value) => return false,
                AssignKind::TypeAlias => SymbolNode::Alias(analyze(&self.env, value)),
                AssignKind::NotReady if !final_pass => return false,
                AssignKind::NotReady | AssignKind::Value => SymbolNode::Var(Type::Any),
            }
        } else {
            SymbolNode::Var(Type::Any)
        };
        if let Some(scope) = self.env.module_mut(&module.name) {
            scope.define(assign.name.node.clone(), node);
        }
        true
    }

    fn assign_kind(&self, module: &str, value: &Spanned<TypeExpr>) -> AssignKind {
        match &value.node {
            TypeExpr::Name(head) | TypeExpr::Subscript { base: head, .. } => {
                match self.env.lookup_dotted(module, head) {
                    Resolution::Ready(SymbolNode::TypeInfo(_) | SymbolNode::Alias(_)) => AssignKind::TypeAlias,
                    Resolution::Ready(SymbolNode::Special(form)) => match form {
                        SpecialForm::TypeVar | SpecialForm::Generic | SpecialForm::Protocol | SpecialForm::TypeAlias => {
                            AssignKind::Value
                        }
                        _ => AssignKind::TypeAlias,
                    },
                    Resolution::Ready(_) => AssignKind::Value,
                    Resolution::NotReady => AssignKind::NotReady,
                    // Unknown names stay aliases so later lookups surface them as unresolved.
                    Resolution::NotFound => AssignKind::TypeAlias,
                }
            }
            TypeExpr::Union(_) => AssignKind::TypeAlias,
            _ => AssignKind::Value,
        }
    }

    /// No name referenced by `expr` is declared-but-incomplete.
    fn names_ready(&self, module: &str, expr: &Spanned<TypeExpr>) -> bool {
        let mut heads = Vec::new();
        collect_heads(&expr.node, &mut heads);
        heads
            .iter()
            .all(|h| self.env.lookup_dotted(module, h) != Resolution::NotReady)
    }
}

fn declare_import(scope: &mut ModuleScope, import: &Import) {
    match import {
        Import::Module { path, alias: Some(alias) } => {
            scope.add_import(alias.clone(), ImportTarget::Module(path.clone()));
        }
        Import::Module { path, alias: None } => {
            let top = path.split('.').next().unwrap_or(path);
            scope.add_import(top, ImportTarget::Module(top.to_string()));
        }
        Import::From { module, names } => {
            for (name, alias) in names {
                if name == "*" {
                    scope.add_star_import(module.clone());
                    continue;
                }
                let local = alias.as_ref().unwrap_or(name).clone();
                let target = if module.is_empty() {
                    ImportTarget::Module(name.clone())
                } else {
                    ImportTarget::Symbol { module: module.clone(), name: name.clone() }
                };
                scope.add_import(local, target);
            }
        }
    }
}

/// Every name a type expression refers to, including inside forward references.
fn collect_heads(expr: &TypeExpr, out: &mut Vec<String>) {
    match expr {
        TypeExpr::Name(name) => out.push(name.clone()),
        TypeExpr::Subscript { base, args } => {
            out.push(base.clone());
            let last = types::short_name(base);
            if last == "Literal" {
                return;
            }
            let checked = if last == "Annotated" { &args[..args.len().min(1)] } else { &args[..] };
            checked.iter().for_each(|a| collect_heads(&a.node, out));
        }
        TypeExpr::Union(items) | TypeExpr::List(items) => items.iter().for_each(|a| collect_heads(&a.node, out)),
        TypeExpr::Str(forward) => {
            if let Ok(inner) = parse_type_str(forward) {
                collect_heads(&inner.node, out);
            }
        }
        TypeExpr::None | TypeExpr::Ellipsis | TypeExpr::Literal(_) => {}
    }
}

/// A name as written in `module`, then as a fullname, then as a unique short class name.
pub(crate) fn lookup_qualified(env: &Env, module: &str, name: &str) -> Resolution {
    let res = match env.lookup_dotted(module, name) {
        Resolution::NotFound => env.lookup_fullname(name),
        found => found,
    };
    match res {
        Resolution::NotFound if !name.contains('.') => env.lookup_short_name(name),
        found => found,
    }
}

/// The host side of [`SemanticApi`] for one hook invocation.
struct HookApi<'a> {
    env: &'a Env,
    module: &'a str,
    file_id: u32,
    class_name: &'a str,
    final_iteration: bool,
    deferred: bool,
    diagnostics: Vec<Diagnostic>,
}

impl SemanticApi for HookApi<'_> {
    fn lookup_qualified(&self, name: &str) -> Lookup {
        lookup_qualified(self.env, self.module, name).into()
    }

    fn lookup_in(&self, module: &str, name: &str) -> Lookup {
        self.env.lookup_dotted(module, name).into()
    }

    fn analyze_type(&self, expr: &Spanned<TypeExpr>) -> Type {
        TypeAnalyzer::new(self.env, self.module).analyze(expr)
    }

    fn type_info(&self, fullname: &str) -> Option<&TypeInfo> {
        self.env.type_info(fullname)
    }

    fn defer(&mut self) {
        self.deferred = true;
    }

    fn fail(&mut self, code: ErrorCode, message: String, span: Span, method: Option<&str>) {
        self.diagnostics.push(Diagnostic {
            code,
            message,
            class_name: self.class_name.to_string(),
            method_name: method.map(str::to_string),
            span: Span::with_file(span.start, span.end, self.file_id),
        });
    }

    fn is_subtype(&self, left: &Type, right: &Type) -> bool {
        subtype::is_subtype(self.env, left, right)
    }

    fn final_iteration(&self) -> bool {
        self.final_iteration
    }
}
