use crate::parser::ast::TypeExpr;
use crate::parser::parse_type_str;
use crate::span::Spanned;
use super::env::{Env, Resolution, SpecialForm, SymbolNode};
use super::types::Type;

/// Turns annotation expressions into semantic types within one module's scope.
///
/// Analysis never defers: a name that is not ready yet becomes `Type::Unbound`,
/// which the subtype relation treats as `Any` and which callers may resolve later.
pub struct TypeAnalyzer<'a> {
    env: &'a Env,
    module: &'a str,
}

impl<'a> TypeAnalyzer<'a> {
    pub fn new(env: &'a Env, module: &'a str) -> Self {
        Self { env, module }
    }

    pub fn analyze(&self, expr: &Spanned<TypeExpr>) -> Type {
        match &expr.node {
            TypeExpr::None => Type::NoneType,
            TypeExpr::Ellipsis | TypeExpr::List(_) => Type::Any,
            TypeExpr::Str(forward) => match parse_type_str(forward) {
                Ok(inner) => self.analyze(&inner),
                Err(_) => Type::Any,
            },
            TypeExpr::Name(name) => self.named(name, &[]),
            TypeExpr::Subscript { base, args } => self.named(base, args),
            TypeExpr::Union(items) => Type::union(items.iter().map(|t| self.analyze(t)).collect()),
            TypeExpr::Literal(raw) => literal_type(raw),
        }
    }

    fn named(&self, name: &str, args: &[Spanned<TypeExpr>]) -> Type {
        match self.env.lookup_dotted(self.module, name) {
            Resolution::Ready(node) => self.from_node(node, args),
            Resolution::NotReady | Resolution::NotFound => Type::Unbound {
                name: name.to_string(),
                module: self.module.to_string(),
            },
        }
    }

    fn from_node(&self, node: SymbolNode, args: &[Spanned<TypeExpr>]) -> Type {
        match node {
            SymbolNode::TypeInfo(fullname) => self.instantiate(&fullname, args),
            SymbolNode::Alias(target) => self.apply_alias(&target, args),
            SymbolNode::TypeVar(def) => Type::TypeVar(def.name),
            SymbolNode::Special(form) => self.special(form, args),
            // Variables, functions and modules are not valid types.
            SymbolNode::Var(_) | SymbolNode::Function | SymbolNode::Module(_) => Type::Any,
        }
    }

    /// Instantiate a class; missing type arguments become `Any`, extra ones are dropped.
    pub fn instantiate(&self, fullname: &str, args: &[Spanned<TypeExpr>]) -> Type {
        let arity = self.env.type_info(fullname).map_or(0, |info| info.type_vars.len());
        let mut analyzed: Vec<Type> = if fullname == "builtins.tuple" {
            tuple_item(args.iter().map(|a| (&a.node, self.analyze(a))).collect())
        } else {
            args.iter().map(|a| self.analyze(a)).collect()
        };
        analyzed.resize(arity, Type::Any);
        Type::instance(fullname, analyzed)
    }

    /// Generic aliases bind their free type variables in order of first appearance.
    fn apply_alias(&self, target: &Type, args: &[Spanned<TypeExpr>]) -> Type {
        let mut vars = Vec::new();
        target.collect_type_vars(&mut vars);
        if vars.is_empty() {
            return target.clone();
        }
        let mut supplied = args.iter().map(|a| self.analyze(a));
        let subst = vars
            .into_iter()
            .map(|v| (v, supplied.next().unwrap_or(Type::Any)))
            .collect();
        target.substitute(&subst)
    }

    fn special(&self, form: SpecialForm, args: &[Spanned<TypeExpr>]) -> Type {
        let first = || args.first().map_or(Type::Any, |a| self.analyze(a));
        match form {
            SpecialForm::Any => Type::Any,
            SpecialForm::Optional => Type::union(vec![first(), Type::NoneType]),
            SpecialForm::Union => Type::union(args.iter().map(|a| self.analyze(a)).collect()),
            SpecialForm::ClassVar | SpecialForm::Final | SpecialForm::Annotated => first(),
            SpecialForm::Literal => Type::union(args.iter().map(|a| self.literal_arg(a)).collect()),
            SpecialForm::Callable => match args {
                [params, ret] => {
                    let params = match &params.node {
                        TypeExpr::List(items) => Some(items.iter().map(|p| self.analyze(p)).collect()),
                        _ => None,
                    };
                    Type::Callable { params, ret: Box::new(self.analyze(ret)) }
                }
                _ => Type::Callable { params: None, ret: Box::new(Type::Any) },
            },
            SpecialForm::Alias(fullname) => self.instantiate(fullname, args),
            SpecialForm::Generic | SpecialForm::Protocol | SpecialForm::TypeVar | SpecialForm::TypeAlias => Type::Any,
        }
    }

    fn literal_arg(&self, arg: &Spanned<TypeExpr>) -> Type {
        match &arg.node {
            TypeExpr::Str(_) => Type::instance("builtins.str", vec![]),
            TypeExpr::Literal(raw) => literal_type(raw),
            TypeExpr::None => Type::NoneType,
            // Enum members and nested Literal[...] are not modelled.
            _ => Type::Any,
        }
    }
}

/// The class of a literal token: `True` is a bool, `1.5` a float, `2j` a complex.
pub fn literal_type(raw: &str) -> Type {
    let name = if raw == "True" || raw == "False" {
        "builtins.bool"
    } else if raw.ends_with(['j', 'J']) {
        "builtins.complex"
    } else if !raw.starts_with("0x") && !raw.starts_with("0X") && raw.contains(['.', 'e', 'E']) {
        "builtins.float"
    } else {
        "builtins.int"
    };
    Type::instance(name, vec![])
}

/// `tuple[int, ...]` keeps its item type; heterogeneous tuples join their items.
fn tuple_item(args: Vec<(&TypeExpr, Type)>) -> Vec<Type> {
    if args.is_empty() {
        return Vec::new();
    }
    if args.len() == 2 && matches!(args[1].0, TypeExpr::Ellipsis) {
        return vec![args[0].1.clone()];
    }
    vec![Type::union(args.into_iter().map(|(_, t)| t).collect())]
}
