use std::sync::OnceLock;

use crate::parser::ast::Module;
use crate::parser::parse_module;
use super::env::{BUILTINS, Env, ModuleScope, SpecialForm, SymbolNode};
use super::{Analyzer, ParsedModule};

/// Collection protocols every program sees through `typing` / `collections.abc`.
const TYPING_STUB: &str = r#"
T_co = TypeVar("T_co", covariant=True)
_T = TypeVar("_T")
_KT = TypeVar("_KT")
_VT = TypeVar("_VT")
_VT_co = TypeVar("_VT_co", covariant=True)

TYPE_CHECKING: bool

class Hashable: ...
class Sized: ...
class Iterable(Protocol[T_co]): ...
class Iterator(Iterable[T_co], Protocol[T_co]): ...
class Collection(Iterable[T_co], Protocol[T_co]): ...
class Sequence(Collection[T_co], Generic[T_co]): ...
class MutableSequence(Sequence[_T], Generic[_T]): ...
class AbstractSet(Collection[T_co], Generic[T_co]): ...
class MutableSet(AbstractSet[_T], Generic[_T]): ...
class Mapping(Collection[_KT], Generic[_KT, _VT_co]): ...
class MutableMapping(Mapping[_KT, _VT], Generic[_KT, _VT]): ...
"#;

const BUILTINS_STUB: &str = r#"
from typing import Generic, TypeVar
from typing import AbstractSet, MutableMapping, MutableSequence, MutableSet, Sequence

_T = TypeVar("_T")
_T_co = TypeVar("_T_co", covariant=True)
_KT = TypeVar("_KT")
_VT = TypeVar("_VT")

class object:
    def __init__(self) -> None: ...

class type(Generic[_T_co]): ...
class int: ...
class bool(int): ...
class float: ...
class complex: ...
class str: ...
class bytes: ...
class bytearray: ...
class memoryview: ...
class range: ...
class slice: ...
class BaseException: ...
class Exception(BaseException): ...

class list(MutableSequence[_T], Generic[_T]): ...
class tuple(Sequence[_T_co], Generic[_T_co]): ...
class set(MutableSet[_T], Generic[_T]): ...
class frozenset(AbstractSet[_T_co], Generic[_T_co]): ...
class dict(MutableMapping[_KT, _VT], Generic[_KT, _VT]): ...
"#;

const SPECIAL_FORMS: &[(&str, SpecialForm)] = &[
    ("Any", SpecialForm::Any),
    ("Optional", SpecialForm::Optional),
    ("Union", SpecialForm::Union),
    ("Generic", SpecialForm::Generic),
    ("Protocol", SpecialForm::Protocol),
    ("TypeVar", SpecialForm::TypeVar),
    ("TypeAlias", SpecialForm::TypeAlias),
    ("ClassVar", SpecialForm::ClassVar),
    ("Final", SpecialForm::Final),
    ("Callable", SpecialForm::Callable),
    ("Literal", SpecialForm::Literal),
    ("Annotated", SpecialForm::Annotated),
    ("List", SpecialForm::Alias("builtins.list")),
    ("Dict", SpecialForm::Alias("builtins.dict")),
    ("Set", SpecialForm::Alias("builtins.set")),
    ("FrozenSet", SpecialForm::Alias("builtins.frozenset")),
    ("Tuple", SpecialForm::Alias("builtins.tuple")),
    ("Type", SpecialForm::Alias("builtins.type")),
];

static PRELUDE: OnceLock<Env> = OnceLock::new();

/// An environment holding `builtins`, `typing`, `typing_extensions` and
/// `collections.abc`, fully analyzed. Built once per process.
pub fn prelude_env() -> Env {
    PRELUDE.get_or_init(build_prelude).clone()
}

fn stub(name: &str, source: &str) -> ParsedModule {
    let ast = parse_module(source).unwrap_or_else(|err| {
        tracing::error!("bundled `{name}` stub failed to parse: {err}");
        Module::default()
    });
    ParsedModule { name: name.to_string(), file_id: None, ast }
}

fn build_prelude() -> Env {
    let mut env = Env::new();
    let mut typing = ModuleScope::new("typing", None);
    for (name, form) in SPECIAL_FORMS {
        typing.define(*name, SymbolNode::Special(*form));
    }
    env.add_module(typing);
    for reexport in ["typing_extensions", "collections.abc"] {
        let mut scope = ModuleScope::new(reexport, None);
        scope.add_star_import("typing");
        env.add_module(scope);
    }

    let modules = [stub(BUILTINS, BUILTINS_STUB), stub("typing", TYPING_STUB)];
    let result = Analyzer::with_env(env, None, 10).analyze(&modules);
    tracing::debug!(passes = result.passes, "prelude analyzed");
    result.env
}
