use std::fmt;

use crate::span::Spanned;

/// One parsed stub/source module.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Import(Spanned<Import>),
    Class(Spanned<ClassDef>),
    Function(Spanned<FuncDef>),
    TypeVar(Spanned<TypeVarDecl>),
    Assign(Spanned<Assign>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Import {
    /// `import a.b [as c]`
    Module { path: String, alias: Option<String> },
    /// `from a.b import c [as d], ...`; `*` is recorded as the name `*`.
    From { module: String, names: Vec<(String, Option<String>)> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    pub name: Spanned<String>,
    pub decorators: Vec<Spanned<Decorator>>,
    pub bases: Vec<Spanned<TypeExpr>>,
    /// Class-body annotations plus `self.x: T` annotations found in method bodies.
    pub attrs: Vec<AttrDecl>,
    pub methods: Vec<Spanned<FuncDef>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttrDecl {
    pub name: Spanned<String>,
    pub annotation: Spanned<TypeExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncDef {
    pub name: Spanned<String>,
    pub decorators: Vec<Spanned<Decorator>>,
    pub params: Vec<Param>,
    pub returns: Option<Spanned<TypeExpr>>,
}

impl FuncDef {
    /// False for a completely unannotated def; such handlers are never checked.
    pub fn is_annotated(&self) -> bool {
        self.returns.is_some() || self.params.iter().any(|p| p.annotation.is_some())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Spanned<String>,
    pub kind: ArgKind,
    pub annotation: Option<Spanned<TypeExpr>>,
}

/// Formal parameter kinds, in the order Python allows them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgKind {
    /// `x`
    Positional,
    /// `x=default`
    Optional,
    /// `*args`
    Star,
    /// keyword-only `x` after `*`
    Named,
    /// keyword-only `x=default` after `*`
    NamedOpt,
    /// `**kwargs`
    Star2,
}

impl ArgKind {
    pub fn is_positional(self) -> bool {
        matches!(self, ArgKind::Positional | ArgKind::Optional)
    }

    pub fn is_required(self) -> bool {
        matches!(self, ArgKind::Positional | ArgKind::Named)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decorator {
    /// Dotted callee, e.g. `pyside_callbacks.widget_event`.
    pub callee: Spanned<String>,
    /// `None` for a bare `@name`; `Some(args)` for `@name(...)`.
    pub args: Option<Vec<Spanned<Expr>>>,
}

impl Decorator {
    /// Last segment of the callee path.
    pub fn name(&self) -> &str {
        self.callee.node.rsplit('.').next().unwrap_or(&self.callee.node)
    }
}

/// Decorator arguments: only string literals and names carry meaning.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Str(String),
    Name(String),
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// Possibly dotted name: `int`, `QtWidgets.QPushButton`.
    Name(String),
    /// `base[args]`
    Subscript { base: String, args: Vec<Spanned<TypeExpr>> },
    /// A quoted forward reference, kept as written.
    Str(String),
    None,
    Ellipsis,
    /// `[a, b]`, as in `Callable[[a, b], r]`
    List(Vec<Spanned<TypeExpr>>),
    /// `a | b`
    Union(Vec<Spanned<TypeExpr>>),
    /// A literal value inside `Literal[...]`.
    Literal(String),
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, items: &[Spanned<TypeExpr>], sep: &str) -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, "{sep}")?;
                }
                write!(f, "{}", item.node)?;
            }
            Ok(())
        }
        match self {
            TypeExpr::Name(name) => write!(f, "{name}"),
            TypeExpr::Subscript { base, args } => {
                write!(f, "{base}[")?;
                join(f, args, ", ")?;
                write!(f, "]")
            }
            TypeExpr::Str(s) => write!(f, "\"{s}\""),
            TypeExpr::None => write!(f, "None"),
            TypeExpr::Ellipsis => write!(f, "..."),
            TypeExpr::List(items) => {
                write!(f, "[")?;
                join(f, items, ", ")?;
                write!(f, "]")
            }
            TypeExpr::Union(items) => join(f, items, " | "),
            TypeExpr::Literal(raw) => write!(f, "{raw}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Variance {
    #[default]
    Invariant,
    Covariant,
    Contravariant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeVarDecl {
    pub name: Spanned<String>,
    pub variance: Variance,
}

/// `x: T`, `X: TypeAlias = T`, or `X = <expr>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Assign {
    pub name: Spanned<String>,
    pub annotation: Option<Spanned<TypeExpr>>,
    /// The right-hand side when it reads as a type expression.
    pub value: Option<Spanned<TypeExpr>>,
}

impl Assign {
    /// `X: TypeAlias = ...`
    pub fn is_explicit_alias(&self) -> bool {
        matches!(
            self.annotation.as_ref().map(|a| &a.node),
            Some(TypeExpr::Name(n)) if n == "TypeAlias" || n.ends_with(".TypeAlias")
        )
    }
}
