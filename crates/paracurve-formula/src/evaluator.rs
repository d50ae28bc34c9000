//! Formula evaluator
//!
//! Replays an [`InstructionStream`] as a stack machine: the last produced
//! instruction is popped first and its operands are pulled from the
//! remainder of the stream. Operators waiting for operands sit on an
//! explicit stack, so long operator chains do not grow the call stack. The
//! cursor lives in a per-call [`StackMachine`], so evaluations never share
//! mutable state.

use crate::error::{FormulaError, FormulaResult};
use crate::functions::{FunctionDef, FunctionRegistry};
use crate::parser::compile;
use crate::program::{BinaryOperator, Instruction, InstructionStream};
use crate::value::Number;
use ahash::AHashMap;
use std::sync::OnceLock;

/// Global function registry (lazily initialized)
static FUNCTION_REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();

/// The shared, read-only built-in function registry
pub fn function_registry() -> &'static FunctionRegistry {
    FUNCTION_REGISTRY.get_or_init(FunctionRegistry::new)
}

/// Variable bindings for evaluation
///
/// Names are case-sensitive. A single instance is typically reused across a
/// sequence of evaluations, each result being bound before the next formula
/// runs (see [`evaluate_into`]).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    values: AHashMap<String, Number>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Bindings::set`]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Number>) -> Self {
        self.set(name, value);
        self
    }

    /// Bind `name`, returning the previous value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Number>) -> Option<Number> {
        self.values.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<Number> {
        self.values.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Number> {
        self.values.remove(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Number)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<K: Into<String>, V: Into<Number>> FromIterator<(K, V)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bindings = Bindings::new();
        bindings.extend(iter);
        bindings
    }
}

impl<K: Into<String>, V: Into<Number>> Extend<(K, V)> for Bindings {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.set(name, value);
        }
    }
}

impl<const N: usize> From<[(&str, f64); N]> for Bindings {
    fn from(pairs: [(&str, f64); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// Compile and evaluate a formula
///
/// Empty (or whitespace-only) text evaluates to `0` without being parsed.
///
/// # Example
/// ```rust
/// use paracurve_formula::{evaluate, Bindings};
///
/// let vars = Bindings::from([("a", 1.0), ("b", 2.0)]);
/// assert_eq!(evaluate("a+b*3", &vars).unwrap(), 7.0);
/// assert_eq!(evaluate("", &vars).unwrap(), 0.0);
/// ```
pub fn evaluate(formula: &str, bindings: &Bindings) -> FormulaResult<f64> {
    evaluate_number(formula, bindings).map(Number::as_f64)
}

/// Like [`evaluate`], keeping integral results as [`Number::Int`]
pub fn evaluate_number(formula: &str, bindings: &Bindings) -> FormulaResult<Number> {
    if formula.trim().is_empty() {
        return Ok(Number::Int(0));
    }
    let stream = compile(formula)?;
    execute(&stream, bindings)
}

/// Evaluate `formula` and bind the result as `name`
///
/// Used to compute helper values in order, each one able to reference the
/// names bound before it.
pub fn evaluate_into(
    bindings: &mut Bindings,
    name: impl Into<String>,
    formula: &str,
) -> FormulaResult<Number> {
    let value = evaluate_number(formula, bindings)?;
    bindings.set(name, value);
    Ok(value)
}

/// Run a compiled stream against `bindings`
pub fn execute(stream: &InstructionStream, bindings: &Bindings) -> FormulaResult<Number> {
    let mut machine = StackMachine::new(stream.instructions(), bindings, function_registry());
    let result = machine.eval()?;
    if machine.remaining > 0 {
        return Err(FormulaError::MalformedProgram(format!(
            "{} instruction(s) left after evaluating '{}'",
            machine.remaining,
            stream.source()
        )));
    }
    Ok(result)
}

impl InstructionStream {
    /// Run this stream against `bindings`
    pub fn evaluate(&self, bindings: &Bindings) -> FormulaResult<Number> {
        execute(self, bindings)
    }
}

/// Per-call evaluation state
struct StackMachine<'a> {
    instructions: &'a [Instruction],
    /// Instructions not yet popped; the next pop takes `instructions[remaining - 1]`
    remaining: usize,
    bindings: &'a Bindings,
    registry: &'a FunctionRegistry,
}

impl<'a> StackMachine<'a> {
    fn new(
        instructions: &'a [Instruction],
        bindings: &'a Bindings,
        registry: &'a FunctionRegistry,
    ) -> Self {
        Self {
            instructions,
            remaining: instructions.len(),
            bindings,
            registry,
        }
    }

    fn pop(&mut self) -> FormulaResult<&'a Instruction> {
        if self.remaining == 0 {
            return Err(FormulaError::MalformedProgram(
                "operand missing from instruction stream".into(),
            ));
        }
        self.remaining -= 1;
        Ok(&self.instructions[self.remaining])
    }

    fn eval(&mut self) -> FormulaResult<Number> {
        let mut pending: Vec<Pending<'a>> = Vec::new();

        loop {
            let mut value = match self.pop()? {
                Instruction::Literal(n) => *n,

                Instruction::Constant(c) => Number::Float(c.value()),

                Instruction::Name(name) => self
                    .bindings
                    .get(name)
                    .ok_or_else(|| FormulaError::UnknownIdentifier(name.clone()))?,

                Instruction::Negate => {
                    pending.push(Pending::Negate);
                    continue;
                }

                Instruction::Binary(op) => {
                    pending.push(Pending::Binary { op: *op, rhs: None });
                    continue;
                }

                Instruction::Call { name, argc } => {
                    let func = self
                        .registry
                        .get(name)
                        .ok_or_else(|| FormulaError::UnknownIdentifier(name.clone()))?;
                    func.check_arity(*argc)?;

                    if *argc == 0 {
                        (func.implementation)(&[])?
                    } else {
                        pending.push(Pending::Call {
                            func,
                            argc: *argc,
                            args: Vec::with_capacity(*argc),
                        });
                        continue;
                    }
                }
            };

            // Feed the value to waiting operators until one needs another operand
            loop {
                match pending.pop() {
                    None => return Ok(value),
                    Some(Pending::Negate) => value = value.negate(),
                    Some(Pending::Binary { op, rhs: None }) => {
                        // Operands were produced left first, so the right one arrives first
                        pending.push(Pending::Binary {
                            op,
                            rhs: Some(value),
                        });
                        break;
                    }
                    Some(Pending::Binary { op, rhs: Some(rhs) }) => {
                        value = apply_binary(op, value, rhs)?;
                    }
                    Some(Pending::Call {
                        func,
                        argc,
                        mut args,
                    }) => {
                        args.push(value);
                        if args.len() < argc {
                            pending.push(Pending::Call { func, argc, args });
                            break;
                        }
                        args.reverse();
                        value = (func.implementation)(&args)?;
                    }
                }
            }
        }
    }
}

/// An operator still collecting its operands
enum Pending<'a> {
    Negate,
    Binary {
        op: BinaryOperator,
        rhs: Option<Number>,
    },
    Call {
        func: &'a FunctionDef,
        argc: usize,
        /// Arguments in pop order, last argument first
        args: Vec<Number>,
    },
}

/// Apply an arithmetic operator
///
/// `+ - *` keep two integers integral unless the result overflows; `/`
/// always produces a float. A non-finite result from finite operands is a
/// domain error.
pub(crate) fn apply_binary(op: BinaryOperator, lhs: Number, rhs: Number) -> FormulaResult<Number> {
    let int_op: Option<fn(i64, i64) -> Option<i64>> = match op {
        BinaryOperator::Add => Some(i64::checked_add),
        BinaryOperator::Subtract => Some(i64::checked_sub),
        BinaryOperator::Multiply => Some(i64::checked_mul),
        BinaryOperator::Divide | BinaryOperator::Power => None,
    };
    if let (Some(f), Number::Int(a), Number::Int(b)) = (int_op, lhs, rhs) {
        if let Some(result) = f(a, b) {
            return Ok(Number::Int(result));
        }
    }

    let (a, b) = (lhs.as_f64(), rhs.as_f64());
    let result = match op {
        BinaryOperator::Add => a + b,
        BinaryOperator::Subtract => a - b,
        BinaryOperator::Multiply => a * b,
        BinaryOperator::Divide => {
            if rhs.is_zero() {
                return Err(FormulaError::domain("/", "division by zero"));
            }
            a / b
        }
        BinaryOperator::Power => return power(lhs, rhs),
    };

    if !result.is_finite() && a.is_finite() && b.is_finite() {
        return Err(FormulaError::domain(op.symbol().to_string(), "result too large"));
    }
    Ok(Number::Float(result))
}

fn power(base: Number, exponent: Number) -> FormulaResult<Number> {
    if let (Number::Int(b), Number::Int(e)) = (base, exponent) {
        if let Ok(e) = u32::try_from(e) {
            if let Some(result) = b.checked_pow(e) {
                return Ok(Number::Int(result));
            }
        }
    }

    let (x, y) = (base.as_f64(), exponent.as_f64());
    if x == 0.0 && y < 0.0 {
        return Err(FormulaError::domain(
            "^",
            "zero cannot be raised to a negative power",
        ));
    }

    let result = x.powf(y);
    if result.is_nan() && !x.is_nan() && !y.is_nan() {
        Err(FormulaError::domain(
            "^",
            "negative number cannot be raised to a fractional power",
        ))
    } else if result.is_infinite() && x.is_finite() && y.is_finite() {
        Err(FormulaError::domain("^", "result too large"))
    } else {
        Ok(Number::Float(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn eval(formula: &str) -> FormulaResult<f64> {
        evaluate(formula, &Bindings::new())
    }

    fn assert_approx(result: FormulaResult<f64>, expected: f64) {
        let n = result.unwrap();
        assert!(
            (n - expected).abs() < 1e-9,
            "Expected {} but got {}",
            expected,
            n
        );
    }

    fn error_kind(formula: &str, bindings: &Bindings) -> ErrorKind {
        evaluate(formula, bindings).unwrap_err().kind()
    }

    #[test]
    fn test_evaluate_arithmetic() {
        assert_eq!(eval("1+2").unwrap(), 3.0);
        assert_eq!(eval("10-3").unwrap(), 7.0);
        assert_eq!(eval("4*5").unwrap(), 20.0);
        assert_eq!(eval("20/4").unwrap(), 5.0);
        assert_eq!(eval("2^10").unwrap(), 1024.0);
        assert_eq!(eval("7/2").unwrap(), 3.5);
    }

    #[test]
    fn test_evaluate_precedence() {
        assert_eq!(eval("1+2*3").unwrap(), 7.0);
        assert_eq!(eval("(1+2)*3").unwrap(), 9.0);
        assert_eq!(eval("2+3*4-5").unwrap(), 9.0);
        assert_eq!(eval("10-4-3").unwrap(), 3.0);
        assert_eq!(eval("16/4/2").unwrap(), 2.0);
    }

    #[test]
    fn test_power_right_associative() {
        assert_eq!(eval("2^3^2").unwrap(), 512.0);
        assert_ne!(eval("2^3^2").unwrap(), 64.0);
        assert_eq!(eval("(2^3)^2").unwrap(), 64.0);
    }

    #[test]
    fn test_evaluate_unary() {
        assert_eq!(eval("-5").unwrap(), -5.0);
        assert_eq!(eval("--5").unwrap(), 5.0);
        assert_eq!(eval("-2^2").unwrap(), -4.0);
        assert_eq!(eval("(-2)^2").unwrap(), 4.0);
        assert_eq!(eval("2^-1").unwrap(), 0.5);
        assert_eq!(eval("3*-2").unwrap(), -6.0);
        assert_eq!(eval("1--1").unwrap(), 2.0);
    }

    #[test]
    fn test_evaluate_constants() {
        assert_approx(eval("PI"), std::f64::consts::PI);
        assert_approx(eval("pi/2"), std::f64::consts::FRAC_PI_2);
        assert_approx(eval("e"), std::f64::consts::E);
        assert_approx(eval("sin(PI/2)"), 1.0);
        assert_approx(eval("exp(1)"), std::f64::consts::E);
    }

    #[test]
    fn test_evaluate_variables() {
        let vars = Bindings::from([("a", 1.0), ("b", 2.0)]);
        assert_eq!(evaluate("a+b*3", &vars).unwrap(), 7.0);

        let vars = Bindings::new().with("t", 0.5).with("T", 2.0);
        assert_eq!(evaluate("t*T", &vars).unwrap(), 1.0);
    }

    #[test]
    fn test_integer_results_stay_integral() {
        let vars = Bindings::new();
        assert!(evaluate_number("2+3*4", &vars).unwrap().is_int());
        assert!(evaluate_number("2^62", &vars).unwrap().is_int());
        assert!(!evaluate_number("6/3", &vars).unwrap().is_int());
        assert!(!evaluate_number("2^64", &vars).unwrap().is_int());
        assert!(!evaluate_number("2.0*3", &vars).unwrap().is_int());
    }

    #[test]
    fn test_integer_overflow_promotes() {
        assert_eq!(eval("9223372036854775807+1").unwrap(), 9223372036854775808.0);
        assert_eq!(eval("2^64").unwrap(), 18446744073709551616.0);
    }

    #[test]
    fn test_empty_formula_is_zero() {
        assert_eq!(eval("").unwrap(), 0.0);
        assert_eq!(eval("  ").unwrap(), 0.0);
    }

    #[test]
    fn test_domain_errors() {
        let vars = Bindings::new();
        assert_eq!(error_kind("1/0", &vars), ErrorKind::Domain);
        assert_eq!(error_kind("1/0.0", &vars), ErrorKind::Domain);
        assert_eq!(error_kind("0^-1", &vars), ErrorKind::Domain);
        assert_eq!(error_kind("(-8)^(1/3)", &vars), ErrorKind::Domain);
        assert_eq!(error_kind("10.0^400", &vars), ErrorKind::Domain);
        assert_eq!(error_kind("sqrt(-1)", &vars), ErrorKind::Domain);
        assert_eq!(error_kind("log(0)", &vars), ErrorKind::Domain);
        assert_eq!(error_kind("factorial(2.5)", &vars), ErrorKind::Domain);
        assert_eq!(error_kind("factorial(-1)", &vars), ErrorKind::Domain);
    }

    #[test]
    fn test_float_overflow_is_domain_error() {
        let vars = Bindings::new();
        assert_eq!(error_kind("1e308*10", &vars), ErrorKind::Domain);
        assert_eq!(error_kind("1e308+1e308", &vars), ErrorKind::Domain);
        assert_eq!(error_kind("-1e308-1e308", &vars), ErrorKind::Domain);
        assert_eq!(error_kind("1e308/1e-308", &vars), ErrorKind::Domain);
        assert_eq!(error_kind("multiply(1e308,10)", &vars), ErrorKind::Domain);
        assert_eq!(error_kind("sum(1e308,1e308)", &vars), ErrorKind::Domain);
        assert_eq!(error_kind("mean(1e308,1e308)", &vars), ErrorKind::Domain);

        // Non-finite inputs pass through
        let vars = Bindings::from([("x", f64::INFINITY)]);
        assert_eq!(evaluate("x*2", &vars).unwrap(), f64::INFINITY);
    }

    #[test]
    fn test_long_chains_do_not_recurse() {
        let sum = vec!["1"; 20_000].join("+");
        assert_eq!(eval(&sum).unwrap(), 20_000.0);

        let negated = format!("{}x", "-".repeat(10_001));
        let vars = Bindings::from([("x", 2.0)]);
        assert_eq!(evaluate(&negated, &vars).unwrap(), -2.0);

        let args = vec!["t"; 5_000].join(",");
        let vars = Bindings::from([("t", 1.5)]);
        assert_eq!(evaluate(&format!("max({})", args), &vars).unwrap(), 1.5);
    }

    #[test]
    fn test_unknown_identifiers() {
        let vars = Bindings::new();
        assert_eq!(error_kind("unknownvar", &vars), ErrorKind::UnknownIdentifier);
        assert_eq!(error_kind("nosuchfn(1)", &vars), ErrorKind::UnknownIdentifier);
        assert_eq!(error_kind("sin", &vars), ErrorKind::UnknownIdentifier);
        assert_eq!(error_kind("SIN(1)", &vars), ErrorKind::UnknownIdentifier);
        assert_eq!(
            evaluate("x+1", &vars).unwrap_err(),
            FormulaError::UnknownIdentifier("x".into())
        );
    }

    #[test]
    fn test_arity_mismatch() {
        let vars = Bindings::new();
        assert_eq!(error_kind("sin(1,2)", &vars), ErrorKind::ArityMismatch);
        assert_eq!(error_kind("hypot(3)", &vars), ErrorKind::ArityMismatch);
        assert_eq!(error_kind("mean()", &vars), ErrorKind::ArityMismatch);
        assert_eq!(error_kind("stdev(1)", &vars), ErrorKind::ArityMismatch);
    }

    #[test]
    fn test_zero_argument_calls() {
        assert_eq!(eval("sum()").unwrap(), 0.0);
        assert_eq!(eval("prod()").unwrap(), 1.0);
        assert_eq!(eval("all()").unwrap(), 1.0);
        assert_eq!(eval("any()").unwrap(), 0.0);
    }

    #[test]
    fn test_parse_errors_are_distinct() {
        let vars = Bindings::new();
        assert_eq!(error_kind("(1+2", &vars), ErrorKind::Parse);
        assert_eq!(error_kind("1+*2", &vars), ErrorKind::Parse);
    }

    #[test]
    fn test_function_argument_order() {
        assert_eq!(eval("ternary(1,10,20)").unwrap(), 10.0);
        assert_eq!(eval("ternary(0,10,20)").unwrap(), 20.0);
        assert_eq!(eval("floordiv(7,2)").unwrap(), 3.0);
        assert_eq!(eval("mod(7,3)").unwrap(), 1.0);
        assert_approx(eval("atan2(1,0)"), std::f64::consts::FRAC_PI_2);
        assert_eq!(eval("interval(0,1,0.5)").unwrap(), 1.0);
    }

    #[test]
    fn test_sgn_epsilon() {
        assert_eq!(eval("sgn(0.0000000000001)").unwrap(), 0.0);
        assert_eq!(eval("sgn(0.1)").unwrap(), 1.0);
        assert_eq!(eval("sgn(-0.1)").unwrap(), -1.0);
    }

    #[test]
    fn test_piecewise_with_comparisons() {
        let formula = "lt(t,1)*10 + gte(t,1)*20";
        let low = Bindings::from([("t", 0.5)]);
        let high = Bindings::from([("t", 1.5)]);
        assert_eq!(evaluate(formula, &low).unwrap(), 10.0);
        assert_eq!(evaluate(formula, &high).unwrap(), 20.0);
    }

    #[test]
    fn test_nested_functions() {
        assert_eq!(eval("sum(1, max(2, 3), abs(-4))").unwrap(), 8.0);
        let vars = Bindings::from([("t0", 0.3)]);
        assert_approx(evaluate("hypot(sin(t0), cos(t0))", &vars), 1.0);
    }

    #[test]
    fn test_evaluate_into_chains_helpers() {
        let mut vars = Bindings::from([("t", 5.0)]);
        assert_eq!(evaluate_into(&mut vars, "d1", "t*2").unwrap(), Number::Int(10));
        assert_eq!(evaluate_into(&mut vars, "d2", "d1+1").unwrap(), Number::Int(11));
        assert_eq!(vars.get("d1"), Some(Number::Float(10.0)));
        assert_eq!(vars.get("d2"), Some(Number::Float(11.0)));
    }

    #[test]
    fn test_stream_reuse() {
        let stream = compile("a*t+1").unwrap();
        for t in 0..5 {
            let vars = Bindings::new().with("a", 2).with("t", t);
            assert_eq!(stream.evaluate(&vars).unwrap(), Number::Int(2 * t as i64 + 1));
        }
    }

    #[test]
    fn test_registry_is_shared() {
        assert!(std::ptr::eq(function_registry(), function_registry()));
    }

    #[test]
    fn test_bindings_api() {
        let mut vars: Bindings = vec![("x", 1.0), ("y", 2.0)].into_iter().collect();
        assert_eq!(vars.len(), 2);
        assert_eq!(vars.set("x", 3), Some(Number::Float(1.0)));
        assert!(vars.contains("x"));
        assert_eq!(vars.remove("y"), Some(Number::Float(2.0)));
        assert!(!vars.contains("y"));
        assert_eq!(vars.iter().count(), 1);
        assert!(!vars.is_empty());
    }
}
