//! Variadic aggregate functions

use super::float_result;
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::apply_binary;
use crate::program::BinaryOperator;
use crate::value::Number;

fn floats(args: &[Number]) -> Vec<f64> {
    args.iter().map(|a| a.as_f64()).collect()
}

/// SUM(...) - integer sums stay integral; `sum()` is 0
pub(crate) fn fn_sum(args: &[Number]) -> FormulaResult<Number> {
    args.iter()
        .try_fold(Number::Int(0), |acc, &x| apply_binary(BinaryOperator::Add, acc, x))
}

/// PROD(...) - `prod()` is 1
pub(crate) fn fn_prod(args: &[Number]) -> FormulaResult<Number> {
    args.iter().try_fold(Number::Int(1), |acc, &x| {
        apply_binary(BinaryOperator::Multiply, acc, x)
    })
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// MEAN(...) / AVG(...) - arithmetic mean
pub(crate) fn fn_mean(args: &[Number]) -> FormulaResult<Number> {
    float_result("mean", args, mean(&floats(args)))
}

/// GMEAN(...) - geometric mean of positive values
pub(crate) fn fn_gmean(args: &[Number]) -> FormulaResult<Number> {
    let values = floats(args);
    if values.iter().any(|&x| x <= 0.0) {
        return Err(FormulaError::domain(
            "gmean",
            "geometric mean requires a non-empty dataset containing positive numbers",
        ));
    }
    let log_mean = values.iter().map(|x| x.ln()).sum::<f64>() / values.len() as f64;
    Ok(Number::Float(log_mean.exp()))
}

/// HMEAN(...) - harmonic mean; any zero makes the result zero
pub(crate) fn fn_hmean(args: &[Number]) -> FormulaResult<Number> {
    let values = floats(args);
    if values.iter().any(|&x| x < 0.0) {
        return Err(FormulaError::domain(
            "hmean",
            "harmonic mean does not support negative values",
        ));
    }
    if values.iter().any(|&x| x == 0.0) {
        return Ok(Number::Int(0));
    }
    let reciprocal_sum: f64 = values.iter().map(|x| 1.0 / x).sum();
    Ok(Number::Float(values.len() as f64 / reciprocal_sum))
}

/// MEDIAN(...) - middle value, or the mean of the two middle values
pub(crate) fn fn_median(args: &[Number]) -> FormulaResult<Number> {
    let mut values = args.to_vec();
    values.sort_by(|a, b| {
        a.as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let len = values.len();
    if len % 2 == 1 {
        Ok(values[len / 2])
    } else {
        let (lo, hi) = (values[len / 2 - 1].as_f64(), values[len / 2].as_f64());
        Ok(Number::Float(lo / 2.0 + hi / 2.0))
    }
}

/// MODE(...) - most frequent value; ties go to the first one seen
pub(crate) fn fn_mode(args: &[Number]) -> FormulaResult<Number> {
    let mut counts: Vec<(Number, usize)> = Vec::new();
    for &value in args {
        match counts.iter_mut().find(|(seen, _)| *seen == value) {
            Some((_, count)) => *count += 1,
            None => counts.push((value, 1)),
        }
    }

    let mut best = counts[0];
    for &(value, count) in &counts[1..] {
        if count > best.1 {
            best = (value, count);
        }
    }
    Ok(best.0)
}

/// STDEV(...) - sample standard deviation (n - 1 denominator)
pub(crate) fn fn_stdev(args: &[Number]) -> FormulaResult<Number> {
    let values = floats(args);
    let m = mean(&values);
    let squares: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    float_result("stdev", args, (squares / (values.len() - 1) as f64).sqrt())
}

pub(crate) fn fn_min(args: &[Number]) -> FormulaResult<Number> {
    let mut best = args[0];
    for &x in &args[1..] {
        if x.as_f64() < best.as_f64() {
            best = x;
        }
    }
    Ok(best)
}

pub(crate) fn fn_max(args: &[Number]) -> FormulaResult<Number> {
    let mut best = args[0];
    for &x in &args[1..] {
        if x.as_f64() > best.as_f64() {
            best = x;
        }
    }
    Ok(best)
}
