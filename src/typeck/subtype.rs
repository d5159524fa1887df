use std::collections::HashMap;

use crate::parser::ast::Variance;
use super::env::Env;
use super::types::{Type, TypeInfo};

/// Implicit conversions the checker accepts between unrelated classes.
const PROMOTIONS: &[(&str, &str)] = &[
    ("builtins.int", "builtins.float"),
    ("builtins.int", "builtins.complex"),
    ("builtins.float", "builtins.complex"),
    ("builtins.bytearray", "builtins.bytes"),
    ("builtins.memoryview", "builtins.bytes"),
];

/// Is a value of type `left` acceptable where `right` is expected?
pub fn is_subtype(env: &Env, left: &Type, right: &Type) -> bool {
    match (left, right) {
        (Type::Any | Type::Unbound { .. } | Type::TypeVar(_), _)
        | (_, Type::Any | Type::Unbound { .. } | Type::TypeVar(_)) => true,
        (Type::Union(items), _) => items.iter().all(|l| is_subtype(env, l, right)),
        (_, Type::Union(items)) => items.iter().any(|r| is_subtype(env, left, r)),
        (Type::NoneType, Type::NoneType) => true,
        (Type::NoneType, Type::Instance { fullname, .. }) => fullname == "builtins.object",
        (Type::Instance { .. }, Type::NoneType) => false,
        (Type::Instance { fullname: lname, args: largs }, Type::Instance { fullname: rname, args: rargs }) => {
            instance_subtype(env, lname, largs, rname, rargs)
        }
        (Type::Callable { params: lp, ret: lr }, Type::Callable { params: rp, ret: rr }) => {
            let params_ok = match (lp, rp) {
                (Some(lp), Some(rp)) => {
                    lp.len() == rp.len() && lp.iter().zip(rp).all(|(l, r)| is_subtype(env, r, l))
                }
                _ => true,
            };
            params_ok && is_subtype(env, lr, rr)
        }
        (Type::Callable { .. }, Type::Instance { fullname, .. }) => fullname == "builtins.object",
        _ => false,
    }
}

fn instance_subtype(env: &Env, lname: &str, largs: &[Type], rname: &str, rargs: &[Type]) -> bool {
    if rname == "builtins.object" {
        return true;
    }
    let left_info = env.type_info(lname);
    let ancestors: Vec<&str> = match left_info {
        Some(info) => info.mro.iter().map(String::as_str).collect(),
        None => vec![lname],
    };
    if ancestors.iter().any(|a| PROMOTIONS.contains(&(*a, rname))) {
        return true;
    }

    let Some(mapped) = map_instance_to_supertype(env, lname, largs, rname) else {
        return left_info.is_some_and(|info| inherits_any(env, info));
    };
    let Some(right_info) = env.type_info(rname) else {
        return true;
    };
    mapped
        .iter()
        .zip(rargs)
        .zip(right_info.type_vars.iter().map(|tv| tv.variance))
        .all(|((l, r), variance)| match variance {
            Variance::Covariant => is_subtype(env, l, r),
            Variance::Contravariant => is_subtype(env, r, l),
            Variance::Invariant => is_subtype(env, l, r) && is_subtype(env, r, l),
        })
}

/// Some class in the MRO has an unresolved base.
fn inherits_any(env: &Env, info: &TypeInfo) -> bool {
    info.mro.iter().any(|m| env.type_info(m).is_some_and(|i| i.fallback_to_any))
}

/// Express an instance of `fullname[args]` as an instance of its ancestor `target`,
/// returning the ancestor's type arguments. `None` when `target` is not an ancestor.
pub fn map_instance_to_supertype(env: &Env, fullname: &str, args: &[Type], target: &str) -> Option<Vec<Type>> {
    if fullname == target {
        return Some(args.to_vec());
    }
    let info = env.type_info(fullname)?;
    if !info.has_base(target) {
        return None;
    }
    let subst: HashMap<String, Type> = info
        .type_vars
        .iter()
        .zip(args.iter().cloned().chain(std::iter::repeat(Type::Any)))
        .map(|(tv, arg)| (tv.name.clone(), arg))
        .collect();
    info.bases.iter().find_map(|base| match base.substitute(&subst) {
        Type::Instance { fullname: base_name, args: base_args } => {
            map_instance_to_supertype(env, &base_name, &base_args, target)
        }
        _ => None,
    })
}
