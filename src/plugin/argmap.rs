//! Binding positional emitted values to a handler's formal parameters.

use crate::parser::ast::ArgKind;

/// Indexed by expected position: the formal it binds to, or `None` when unmapped.
pub type FormalActualMap = Vec<Option<usize>>;

/// Fixed positional slots bind left to right, then `*args` takes the rest.
/// Keyword-only parameters and `**kwargs` never receive positional values.
pub fn map_positional(expected: usize, formals: &[ArgKind]) -> FormalActualMap {
    let slots: Vec<usize> = formals
        .iter()
        .enumerate()
        .filter(|(_, kind)| kind.is_positional())
        .map(|(index, _)| index)
        .collect();
    let star = formals.iter().position(|kind| *kind == ArgKind::Star);
    (0..expected).map(|i| slots.get(i).copied().or(star)).collect()
}

/// Required positional formals left without a value when `expected` values are supplied.
pub fn unfilled_required(expected: usize, formals: &[ArgKind]) -> Vec<usize> {
    formals
        .iter()
        .enumerate()
        .filter(|(_, kind)| kind.is_positional())
        .skip(expected)
        .filter(|(_, kind)| kind.is_required())
        .map(|(index, _)| index)
        .collect()
}
