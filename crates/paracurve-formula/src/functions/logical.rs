//! Comparison and selection functions
//!
//! Results are `1` (true) or `0` (false) so they can be multiplied into
//! piecewise definitions.

use crate::error::{FormulaError, FormulaResult};
use crate::value::Number;
use std::cmp::Ordering;

/// Relative tolerance used by `isclose` and `isclosetol`
pub const DEFAULT_REL_TOL: f64 = 1e-9;

fn compare(a: Number, b: Number) -> Option<Ordering> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => Some(x.cmp(&y)),
        _ => a.as_f64().partial_cmp(&b.as_f64()),
    }
}

pub(crate) fn fn_lt(args: &[Number]) -> FormulaResult<Number> {
    Ok(Number::from_bool(compare(args[0], args[1]) == Some(Ordering::Less)))
}

pub(crate) fn fn_lte(args: &[Number]) -> FormulaResult<Number> {
    Ok(Number::from_bool(matches!(
        compare(args[0], args[1]),
        Some(Ordering::Less | Ordering::Equal)
    )))
}

pub(crate) fn fn_gt(args: &[Number]) -> FormulaResult<Number> {
    Ok(Number::from_bool(compare(args[0], args[1]) == Some(Ordering::Greater)))
}

pub(crate) fn fn_gte(args: &[Number]) -> FormulaResult<Number> {
    Ok(Number::from_bool(matches!(
        compare(args[0], args[1]),
        Some(Ordering::Greater | Ordering::Equal)
    )))
}

pub(crate) fn fn_isequal(args: &[Number]) -> FormulaResult<Number> {
    Ok(Number::from_bool(args[0] == args[1]))
}

fn is_close(a: f64, b: f64, rel_tol: f64, abs_tol: f64) -> bool {
    if a == b {
        return true;
    }
    if a.is_infinite() || b.is_infinite() {
        return false;
    }
    let diff = (a - b).abs();
    diff <= (rel_tol * b.abs()).max(rel_tol * a.abs()) || diff <= abs_tol
}

/// ISCLOSE(a, b) - equal within a relative tolerance of 1e-9
pub(crate) fn fn_isclose(args: &[Number]) -> FormulaResult<Number> {
    Ok(Number::from_bool(is_close(
        args[0].as_f64(),
        args[1].as_f64(),
        DEFAULT_REL_TOL,
        0.0,
    )))
}

/// ISCLOSETOL(a, b, tol) - like ISCLOSE, also accepting |a-b| <= tol
pub(crate) fn fn_isclosetol(args: &[Number]) -> FormulaResult<Number> {
    let tol = args[2].as_f64();
    if tol < 0.0 {
        return Err(FormulaError::domain(
            "isclosetol",
            "tolerances must be non-negative",
        ));
    }
    Ok(Number::from_bool(is_close(
        args[0].as_f64(),
        args[1].as_f64(),
        DEFAULT_REL_TOL,
        tol,
    )))
}

/// INTERVAL(a, b, t) - 1 when a <= t < b
pub(crate) fn fn_interval(args: &[Number]) -> FormulaResult<Number> {
    let lower = matches!(
        compare(args[0], args[2]),
        Some(Ordering::Less | Ordering::Equal)
    );
    let upper = compare(args[2], args[1]) == Some(Ordering::Less);
    Ok(Number::from_bool(lower && upper))
}

/// TERNARY(cond, x, y) - `x` when `cond` is non-zero, otherwise `y`
pub(crate) fn fn_ternary(args: &[Number]) -> FormulaResult<Number> {
    Ok(if args[0].is_truthy() { args[1] } else { args[2] })
}

pub(crate) fn fn_all(args: &[Number]) -> FormulaResult<Number> {
    Ok(Number::from_bool(args.iter().all(|a| a.is_truthy())))
}

pub(crate) fn fn_any(args: &[Number]) -> FormulaResult<Number> {
    Ok(Number::from_bool(args.iter().any(|a| a.is_truthy())))
}
