use std::collections::{HashMap, HashSet};

use super::types::{Type, TypeInfo, TypeVarDef};

pub const BUILTINS: &str = "builtins";

/// Import chains deeper than this are treated as unresolvable (cyclic re-exports).
const MAX_IMPORT_DEPTH: u8 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialForm {
    Any,
    Optional,
    Union,
    Generic,
    Protocol,
    TypeVar,
    TypeAlias,
    ClassVar,
    Final,
    Callable,
    Literal,
    Annotated,
    /// `typing.List` and friends: an alias of the named builtin class.
    Alias(&'static str),
}

/// What a name refers to once its declaration has completed.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolNode {
    /// A class; the payload is its fullname.
    TypeInfo(String),
    Alias(Type),
    TypeVar(TypeVarDef),
    Var(Type),
    Function,
    Module(String),
    Special(SpecialForm),
}

/// Outcome of a name lookup inside the host.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Ready(SymbolNode),
    /// Declared, but its declaration has not completed yet.
    NotReady,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportTarget {
    Module(String),
    Symbol { module: String, name: String },
}

#[derive(Debug, Clone, Default)]
pub struct ModuleScope {
    pub name: String,
    pub file_id: Option<u32>,
    symbols: HashMap<String, SymbolNode>,
    declared: HashSet<String>,
    imports: HashMap<String, ImportTarget>,
    star_imports: Vec<String>,
}

impl ModuleScope {
    pub fn new(name: impl Into<String>, file_id: Option<u32>) -> Self {
        Self { name: name.into(), file_id, ..Default::default() }
    }

    pub fn define(&mut self, name: impl Into<String>, node: SymbolNode) {
        self.symbols.insert(name.into(), node);
    }

    /// Record that `name` will be defined once its declaration completes.
    pub fn declare(&mut self, name: impl Into<String>) {
        self.declared.insert(name.into());
    }

    pub fn add_import(&mut self, local: impl Into<String>, target: ImportTarget) {
        self.imports.insert(local.into(), target);
    }

    pub fn add_star_import(&mut self, module: impl Into<String>) {
        self.star_imports.push(module.into());
    }

    pub fn symbol(&self, name: &str) -> Option<&SymbolNode> {
        self.symbols.get(name)
    }

    /// Fully qualified form of a dotted reference, using this module's imports.
    /// Works whether or not the referenced module is loaded.
    pub fn qualify(&self, dotted: &str) -> String {
        let (first, rest) = match dotted.split_once('.') {
            Some((first, rest)) => (first, Some(rest)),
            None => (dotted, None),
        };
        let head = match self.imports.get(first) {
            Some(ImportTarget::Module(m)) => m.clone(),
            Some(ImportTarget::Symbol { module, name }) => format!("{module}.{name}"),
            None if self.symbols.contains_key(first) || self.declared.contains(first) => {
                format!("{}.{first}", self.name)
            }
            None => first.to_string(),
        };
        match rest {
            Some(rest) => format!("{head}.{rest}"),
            None => head,
        }
    }
}

/// All module scopes plus every completed class.
#[derive(Debug, Clone, Default)]
pub struct Env {
    modules: HashMap<String, ModuleScope>,
    order: Vec<String>,
    types: HashMap<String, TypeInfo>,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_module(&mut self, scope: ModuleScope) {
        if !self.modules.contains_key(&scope.name) {
            self.order.push(scope.name.clone());
        }
        self.modules.insert(scope.name.clone(), scope);
    }

    pub fn module(&self, name: &str) -> Option<&ModuleScope> {
        self.modules.get(name)
    }

    pub fn module_mut(&mut self, name: &str) -> Option<&mut ModuleScope> {
        self.modules.get_mut(name)
    }

    pub fn is_module(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn type_info(&self, fullname: &str) -> Option<&TypeInfo> {
        self.types.get(fullname)
    }

    /// Register a completed class and make its name ready in its module.
    pub fn insert_type(&mut self, info: TypeInfo) {
        if let Some(scope) = self.modules.get_mut(&info.module) {
            scope.define(info.name.clone(), SymbolNode::TypeInfo(info.fullname.clone()));
        }
        self.types.insert(info.fullname.clone(), info);
    }

    /// Resolve a possibly dotted name as written inside `module`.
    pub fn lookup_dotted(&self, module: &str, dotted: &str) -> Resolution {
        let mut segments = dotted.split('.');
        let Some(first) = segments.next() else {
            return Resolution::NotFound;
        };
        let head = self.lookup_in(module, first, 0, true);
        self.walk_members(head, segments)
    }

    /// Resolve a fully qualified name such as `PySide6.QtWidgets.QPushButton`.
    pub fn lookup_fullname(&self, fullname: &str) -> Resolution {
        let mut split = fullname.len();
        while let Some(dot) = fullname[..split].rfind('.') {
            let (module, rest) = (&fullname[..dot], &fullname[dot + 1..]);
            if self.is_module(module) {
                return self.walk_members(Resolution::Ready(SymbolNode::Module(module.to_string())), rest.split('.'));
            }
            split = dot;
        }
        if self.is_module(fullname) {
            return Resolution::Ready(SymbolNode::Module(fullname.to_string()));
        }
        Resolution::NotFound
    }

    /// Find a class by its short name in any loaded module, in load order.
    pub fn lookup_short_name(&self, name: &str) -> Resolution {
        let mut pending = false;
        for module in &self.order {
            let Some(scope) = self.modules.get(module) else { continue };
            match scope.symbols.get(name) {
                Some(node @ SymbolNode::TypeInfo(_)) => return Resolution::Ready(node.clone()),
                Some(_) => {}
                None if scope.declared.contains(name) => pending = true,
                None => {}
            }
        }
        if pending { Resolution::NotReady } else { Resolution::NotFound }
    }

    fn walk_members<'s>(&self, head: Resolution, segments: impl Iterator<Item = &'s str>) -> Resolution {
        let mut current = head;
        for seg in segments {
            current = match current {
                Resolution::Ready(SymbolNode::Module(m)) => {
                    let sub = format!("{m}.{seg}");
                    if self.is_module(&sub) {
                        Resolution::Ready(SymbolNode::Module(sub))
                    } else {
                        self.lookup_in(&m, seg, 0, false)
                    }
                }
                // Members of classes and variables are not part of the type namespace.
                Resolution::Ready(_) => Resolution::NotFound,
                other => return other,
            };
        }
        current
    }

    fn lookup_in(&self, module: &str, name: &str, depth: u8, with_builtins: bool) -> Resolution {
        if depth > MAX_IMPORT_DEPTH {
            return Resolution::NotFound;
        }
        let Some(scope) = self.modules.get(module) else {
            return Resolution::NotFound;
        };
        if let Some(node) = scope.symbols.get(name) {
            return Resolution::Ready(node.clone());
        }
        if scope.declared.contains(name) {
            return Resolution::NotReady;
        }
        if let Some(target) = scope.imports.get(name) {
            return match target {
                ImportTarget::Module(m) => Resolution::Ready(SymbolNode::Module(m.clone())),
                ImportTarget::Symbol { module: from, name: imported } => {
                    let sub = format!("{from}.{imported}");
                    if self.is_module(&sub) {
                        Resolution::Ready(SymbolNode::Module(sub))
                    } else {
                        self.lookup_in(from, imported, depth + 1, false)
                    }
                }
            };
        }
        if !name.starts_with('_') {
            for star in &scope.star_imports {
                match self.lookup_in(star, name, depth + 1, false) {
                    Resolution::NotFound => continue,
                    found => return found,
                }
            }
        }
        if with_builtins && module != BUILTINS {
            return self.lookup_in(BUILTINS, name, depth + 1, false);
        }
        Resolution::NotFound
    }
}
