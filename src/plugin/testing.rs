//! An in-memory host for exercising the checker on a single module `m`.

use super::api::{ClassDefContext, ClassHook, Lookup, SemanticApi};
use crate::diagnostics::{Diagnostic, ErrorCode};
use crate::parser::ast::{ClassDef, Item, TypeExpr};
use crate::parser::parse_module;
use crate::span::{Span, Spanned};
use crate::typeck::env::Env;
use crate::typeck::resolve::TypeAnalyzer;
use crate::typeck::types::{Type, TypeInfo};
use crate::typeck::{Analyzer, ParsedModule, lookup_qualified, subtype};

pub(crate) struct FakeApi {
    env: Env,
    module: ParsedModule,
    pub final_iteration: bool,
    pub deferred: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl FakeApi {
    pub fn new(src: &str) -> Self {
        let module = ParsedModule { name: "m".to_string(), file_id: Some(0), ast: parse_module(src).unwrap() };
        let env = Analyzer::new(None, 20).analyze(std::slice::from_ref(&module)).env;
        Self { env, module, final_iteration: false, deferred: false, diagnostics: Vec::new() }
    }

    pub fn info(&self, fullname: &str) -> &TypeInfo {
        self.env.type_info(fullname).unwrap()
    }

    fn class(&self, name: &str) -> ClassDef {
        self.module
            .ast
            .items
            .iter()
            .find_map(|item| match item {
                Item::Class(c) if c.node.name.node == name => Some(c.node.clone()),
                _ => None,
            })
            .unwrap()
    }

    pub fn run_hook(&mut self, hook: &dyn ClassHook, class: &str) {
        let cls = self.class(class);
        let info = self.info(&format!("m.{class}")).clone();
        let mut ctx = ClassDefContext { cls: &cls, info: &info, api: self };
        hook.on_class(&mut ctx);
    }
}

impl SemanticApi for FakeApi {
    fn lookup_qualified(&self, name: &str) -> Lookup {
        lookup_qualified(&self.env, "m", name).into()
    }

    fn lookup_in(&self, module: &str, name: &str) -> Lookup {
        self.env.lookup_dotted(module, name).into()
    }

    fn analyze_type(&self, expr: &Spanned<TypeExpr>) -> Type {
        TypeAnalyzer::new(&self.env, "m").analyze(expr)
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
            class_name: String::new(),
            method_name: method.map(str::to_string),
            span,
        });
    }

    fn is_subtype(&self, left: &Type, right: &Type) -> bool {
        subtype::is_subtype(&self.env, left, right)
    }

    fn final_iteration(&self) -> bool {
        self.final_iteration
    }
}
