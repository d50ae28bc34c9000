//! Math functions

use super::{float_result, non_negative_integer};
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::apply_binary;
use crate::program::BinaryOperator;
use crate::value::Number;

/// Dead zone around zero for `sgn`, absorbing numerical noise
pub const SGN_EPSILON: f64 = 1e-12;

fn unary(name: &str, args: &[Number], f: fn(f64) -> f64) -> FormulaResult<Number> {
    float_result(name, args, f(args[0].as_f64()))
}

fn binary(name: &str, args: &[Number], f: fn(f64, f64) -> f64) -> FormulaResult<Number> {
    float_result(name, args, f(args[0].as_f64(), args[1].as_f64()))
}

pub(crate) fn fn_sin(args: &[Number]) -> FormulaResult<Number> {
    unary("sin", args, f64::sin)
}

pub(crate) fn fn_cos(args: &[Number]) -> FormulaResult<Number> {
    unary("cos", args, f64::cos)
}

pub(crate) fn fn_tan(args: &[Number]) -> FormulaResult<Number> {
    unary("tan", args, f64::tan)
}

pub(crate) fn fn_asin(args: &[Number]) -> FormulaResult<Number> {
    unary("asin", args, f64::asin)
}

pub(crate) fn fn_acos(args: &[Number]) -> FormulaResult<Number> {
    unary("acos", args, f64::acos)
}

pub(crate) fn fn_atan(args: &[Number]) -> FormulaResult<Number> {
    unary("atan", args, f64::atan)
}

pub(crate) fn fn_sinh(args: &[Number]) -> FormulaResult<Number> {
    unary("sinh", args, f64::sinh)
}

pub(crate) fn fn_cosh(args: &[Number]) -> FormulaResult<Number> {
    unary("cosh", args, f64::cosh)
}

pub(crate) fn fn_tanh(args: &[Number]) -> FormulaResult<Number> {
    unary("tanh", args, f64::tanh)
}

pub(crate) fn fn_asinh(args: &[Number]) -> FormulaResult<Number> {
    unary("asinh", args, f64::asinh)
}

/// ACOSH(x), defined for x >= 1
pub(crate) fn fn_acosh(args: &[Number]) -> FormulaResult<Number> {
    unary("acosh", args, f64::acosh)
}

/// ATANH(x), defined for -1 < x < 1
pub(crate) fn fn_atanh(args: &[Number]) -> FormulaResult<Number> {
    unary("atanh", args, f64::atanh)
}

/// ATAN2(y, x) - angle of the point (x, y)
pub(crate) fn fn_atan2(args: &[Number]) -> FormulaResult<Number> {
    binary("atan2", args, f64::atan2)
}

pub(crate) fn fn_hypot(args: &[Number]) -> FormulaResult<Number> {
    binary("hypot", args, f64::hypot)
}

pub(crate) fn fn_degrees(args: &[Number]) -> FormulaResult<Number> {
    unary("degrees", args, f64::to_degrees)
}

pub(crate) fn fn_radians(args: &[Number]) -> FormulaResult<Number> {
    unary("radians", args, f64::to_radians)
}

pub(crate) fn fn_exp(args: &[Number]) -> FormulaResult<Number> {
    unary("exp", args, f64::exp)
}

pub(crate) fn fn_sqrt(args: &[Number]) -> FormulaResult<Number> {
    unary("sqrt", args, f64::sqrt)
}

fn positive(name: &str, value: Number) -> FormulaResult<f64> {
    let x = value.as_f64();
    if x > 0.0 || x.is_nan() {
        Ok(x)
    } else {
        Err(FormulaError::domain(name, "math domain error"))
    }
}

/// LOG(x, [base]) - natural logarithm, or logarithm to `base`
pub(crate) fn fn_log(args: &[Number]) -> FormulaResult<Number> {
    let x = positive("log", args[0])?;
    match args.get(1) {
        None => float_result("log", args, x.ln()),
        Some(base) => {
            let base = positive("log", *base)?;
            let denominator = base.ln();
            if denominator == 0.0 {
                return Err(FormulaError::domain("log", "division by zero"));
            }
            float_result("log", args, x.ln() / denominator)
        }
    }
}

pub(crate) fn fn_log10(args: &[Number]) -> FormulaResult<Number> {
    let x = positive("log10", args[0])?;
    float_result("log10", args, x.log10())
}

pub(crate) fn fn_log2(args: &[Number]) -> FormulaResult<Number> {
    let x = positive("log2", args[0])?;
    float_result("log2", args, x.log2())
}

/// Round a float to an integer-valued number, failing on NaN/infinity
fn to_integral(name: &str, value: Number, f: fn(f64) -> f64) -> FormulaResult<Number> {
    match value {
        Number::Int(_) => Ok(value),
        Number::Float(x) if x.is_nan() => Err(FormulaError::domain(
            name,
            "cannot convert float NaN to integer",
        )),
        Number::Float(x) if x.is_infinite() => Err(FormulaError::domain(
            name,
            "cannot convert float infinity to integer",
        )),
        Number::Float(x) => Ok(Number::integral(f(x))),
    }
}

pub(crate) fn fn_ceil(args: &[Number]) -> FormulaResult<Number> {
    to_integral("ceil", args[0], f64::ceil)
}

pub(crate) fn fn_floor(args: &[Number]) -> FormulaResult<Number> {
    to_integral("floor", args[0], f64::floor)
}

pub(crate) fn fn_trunc(args: &[Number]) -> FormulaResult<Number> {
    to_integral("trunc", args[0], f64::trunc)
}

/// Round half to even ("banker's rounding")
fn round_half_even(x: f64) -> f64 {
    let rounded = x.round();
    if (x - x.trunc()).abs() == 0.5 {
        2.0 * (x / 2.0).round()
    } else {
        rounded
    }
}

/// ROUND(x, [ndigits])
///
/// Without `ndigits` the result is an integer; ties go to the even
/// neighbour, so `round(2.5) == 2` and `round(3.5) == 4`.
pub(crate) fn fn_round(args: &[Number]) -> FormulaResult<Number> {
    let value = args[0];
    let digits = match args.get(1) {
        None => return to_integral("round", value, round_half_even),
        Some(d) => d.as_integer().ok_or_else(|| {
            FormulaError::domain("round", "ndigits must be an integer")
        })?,
    };

    if value.is_int() && digits >= 0 {
        return Ok(value);
    }

    let x = value.as_f64();
    if !x.is_finite() {
        return Ok(Number::Float(x));
    }
    // Beyond these the scale factor saturates and rounding is a no-op
    let digits = digits.clamp(-308, 308) as i32;
    let result = if digits >= 0 {
        let scale = 10f64.powi(digits);
        round_half_even(x * scale) / scale
    } else {
        let scale = 10f64.powi(-digits);
        round_half_even(x / scale) * scale
    };
    if !result.is_finite() {
        return Ok(Number::Float(x));
    }

    Ok(if value.is_int() {
        Number::integral(result)
    } else {
        Number::Float(result)
    })
}

pub(crate) fn fn_abs(args: &[Number]) -> FormulaResult<Number> {
    Ok(args[0].abs())
}

/// SGN(x) - sign of `x`, treating |x| <= 1e-12 as zero
pub(crate) fn fn_sgn(args: &[Number]) -> FormulaResult<Number> {
    let x = args[0].as_f64();
    let sign = if x < -SGN_EPSILON {
        -1
    } else if x > SGN_EPSILON {
        1
    } else {
        0
    };
    Ok(Number::Int(sign))
}

/// COPYSIGN(x, y) - magnitude of `x` with the sign of `y`
pub(crate) fn fn_copysign(args: &[Number]) -> FormulaResult<Number> {
    binary("copysign", args, f64::copysign)
}

pub(crate) fn fn_multiply(args: &[Number]) -> FormulaResult<Number> {
    apply_binary(BinaryOperator::Multiply, args[0], args[1])
}

/// MOD(a, b) - floored modulo; the result takes the sign of `b`
pub(crate) fn fn_mod(args: &[Number]) -> FormulaResult<Number> {
    let (a, b) = (args[0], args[1]);
    if b.is_zero() {
        return Err(FormulaError::domain("mod", "integer division or modulo by zero"));
    }

    if let (Number::Int(x), Number::Int(y)) = (a, b) {
        if let Some(r) = x.checked_rem(y) {
            let r = if r != 0 && (r < 0) != (y < 0) { r + y } else { r };
            return Ok(Number::Int(r));
        }
    }

    let (x, y) = (a.as_f64(), b.as_f64());
    let mut r = x % y;
    if r != 0.0 && (r < 0.0) != (y < 0.0) {
        r += y;
    }
    float_result("mod", args, r)
}

/// FLOORDIV(a, b) - quotient rounded towards negative infinity
pub(crate) fn fn_floordiv(args: &[Number]) -> FormulaResult<Number> {
    let (a, b) = (args[0], args[1]);
    if b.is_zero() {
        return Err(FormulaError::domain(
            "floordiv",
            "integer division or modulo by zero",
        ));
    }

    if let (Number::Int(x), Number::Int(y)) = (a, b) {
        if let (Some(q), Some(r)) = (x.checked_div(y), x.checked_rem(y)) {
            let q = if r != 0 && (r < 0) != (y < 0) { q - 1 } else { q };
            return Ok(Number::Int(q));
        }
    }

    float_result("floordiv", args, (a.as_f64() / b.as_f64()).floor())
}

/// Product of the integers in `from..=to`, as an integer while it fits
fn product_range(name: &str, from: i64, to: i64) -> FormulaResult<Number> {
    let mut exact: Option<i64> = Some(1);
    let mut approx = 1.0f64;
    for k in from..=to {
        exact = exact.and_then(|p| p.checked_mul(k));
        approx *= k as f64;
        if exact.is_none() && approx.is_infinite() {
            return Err(FormulaError::domain(name, "result too large"));
        }
    }
    Ok(exact.map_or(Number::Float(approx), Number::Int))
}

/// FACTORIAL(n) for non-negative integral n
pub(crate) fn fn_factorial(args: &[Number]) -> FormulaResult<Number> {
    let n = non_negative_integer("factorial", args[0])?;
    product_range("factorial", 2, n)
}

/// PERM(n, k) - ordered selections of k items from n
pub(crate) fn fn_perm(args: &[Number]) -> FormulaResult<Number> {
    let n = non_negative_integer("perm", args[0])?;
    let k = non_negative_integer("perm", args[1])?;
    if k > n {
        return Ok(Number::Int(0));
    }
    product_range("perm", n - k + 1, n)
}

/// COMB(n, k) - unordered selections of k items from n
pub(crate) fn fn_comb(args: &[Number]) -> FormulaResult<Number> {
    let n = non_negative_integer("comb", args[0])?;
    let k = non_negative_integer("comb", args[1])?;
    if k > n {
        return Ok(Number::Int(0));
    }
    let k = k.min(n - k);

    // Multiplicative form keeps every intermediate value integral
    let mut exact: Option<i64> = Some(1);
    let mut approx = 1.0f64;
    for i in 1..=k {
        let factor = n - k + i;
        exact = exact
            .and_then(|c| c.checked_mul(factor))
            .map(|c| c / i);
        approx = approx * factor as f64 / i as f64;
        if exact.is_none() && approx.is_infinite() {
            return Err(FormulaError::domain("comb", "result too large"));
        }
    }
    match exact {
        Some(c) => Ok(Number::Int(c)),
        None => float_result("comb", args, approx.round()),
    }
}

/// GAMMA(x); poles at zero and the negative integers are domain errors
pub(crate) fn fn_gamma(args: &[Number]) -> FormulaResult<Number> {
    let x = args[0].as_f64();
    if x <= 0.0 && x.fract() == 0.0 {
        return Err(FormulaError::domain("gamma", "math domain error"));
    }
    unary("gamma", args, libm::tgamma)
}

/// LGAMMA(x) - natural log of |GAMMA(x)|
pub(crate) fn fn_lgamma(args: &[Number]) -> FormulaResult<Number> {
    let x = args[0].as_f64();
    if x <= 0.0 && x.fract() == 0.0 {
        return Err(FormulaError::domain("lgamma", "math domain error"));
    }
    unary("lgamma", args, libm::lgamma)
}
