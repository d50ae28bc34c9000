//! Built-in functions
//!
//! The registry is a closed catalog: names are case-sensitive and every
//! entry declares its arity, which is checked before the implementation
//! runs. Boolean-like functions answer `1` or `0` so they compose with
//! arithmetic (`lt(t,1)*a + gte(t,1)*b`).

pub mod logical;
pub mod math;
pub mod statistical;

use crate::error::{FormulaError, FormulaResult};
use crate::value::Number;
use ahash::AHashMap;
use std::fmt;

/// Function implementation signature
///
/// Implementations may index `args` freely up to the declared arity.
pub type FunctionImpl = fn(&[Number]) -> FormulaResult<Number>;

/// Number of arguments a function accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    /// Inclusive range
    Between(usize, usize),
    /// Variadic with a lower bound
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exactly(n) => count == n,
            Arity::Between(min, max) => (min..=max).contains(&count),
            Arity::AtLeast(min) => count >= min,
        }
    }

    pub fn is_variadic(self) -> bool {
        matches!(self, Arity::AtLeast(_))
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(n) => write!(f, "exactly {}", n),
            Arity::Between(min, max) => write!(f, "{} to {}", min, max),
            Arity::AtLeast(min) => write!(f, "at least {}", min),
        }
    }
}

/// Function definition
pub struct FunctionDef {
    pub name: &'static str,
    pub arity: Arity,
    pub implementation: FunctionImpl,
}

impl FunctionDef {
    pub fn new(name: &'static str, arity: Arity, implementation: FunctionImpl) -> Self {
        Self {
            name,
            arity,
            implementation,
        }
    }

    /// Reject a call site whose argument count the function does not accept
    pub fn check_arity(&self, count: usize) -> FormulaResult<()> {
        if self.arity.accepts(count) {
            Ok(())
        } else {
            Err(FormulaError::ArityMismatch {
                function: self.name.to_string(),
                expected: self.arity.to_string(),
                actual: count,
            })
        }
    }

    /// Validate the argument count, then invoke
    pub fn call(&self, args: &[Number]) -> FormulaResult<Number> {
        self.check_arity(args.len())?;
        (self.implementation)(args)
    }
}

impl fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

/// Function registry
pub struct FunctionRegistry {
    functions: AHashMap<&'static str, FunctionDef>,
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self {
            functions: AHashMap::new(),
        };

        registry.register_math_functions();
        registry.register_logical_functions();
        registry.register_statistical_functions();

        registry
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Register a function, replacing any previous entry of the same name
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name, def);
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.functions.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    fn add(&mut self, name: &'static str, arity: Arity, implementation: FunctionImpl) {
        self.register(FunctionDef::new(name, arity, implementation));
    }

    fn register_math_functions(&mut self) {
        use math::*;
        use Arity::*;

        // Trigonometric and hyperbolic
        self.add("sin", Exactly(1), fn_sin);
        self.add("cos", Exactly(1), fn_cos);
        self.add("tan", Exactly(1), fn_tan);
        self.add("asin", Exactly(1), fn_asin);
        self.add("acos", Exactly(1), fn_acos);
        self.add("atan", Exactly(1), fn_atan);
        self.add("sinh", Exactly(1), fn_sinh);
        self.add("cosh", Exactly(1), fn_cosh);
        self.add("tanh", Exactly(1), fn_tanh);
        self.add("asinh", Exactly(1), fn_asinh);
        self.add("acosh", Exactly(1), fn_acosh);
        self.add("atanh", Exactly(1), fn_atanh);
        self.add("atan2", Exactly(2), fn_atan2);
        self.add("hypot", Exactly(2), fn_hypot);

        // Angle conversion, with the short aliases
        self.add("degrees", Exactly(1), fn_degrees);
        self.add("degree", Exactly(1), fn_degrees);
        self.add("deg", Exactly(1), fn_degrees);
        self.add("radians", Exactly(1), fn_radians);
        self.add("rad", Exactly(1), fn_radians);

        // Exponents and logarithms
        self.add("exp", Exactly(1), fn_exp);
        self.add("sqrt", Exactly(1), fn_sqrt);
        self.add("log", Between(1, 2), fn_log);
        self.add("log10", Exactly(1), fn_log10);
        self.add("log2", Exactly(1), fn_log2);

        // Rounding and sign
        self.add("ceil", Exactly(1), fn_ceil);
        self.add("floor", Exactly(1), fn_floor);
        self.add("trunc", Exactly(1), fn_trunc);
        self.add("round", Between(1, 2), fn_round);
        self.add("abs", Exactly(1), fn_abs);
        self.add("sgn", Exactly(1), fn_sgn);
        self.add("copysign", Exactly(2), fn_copysign);

        // Integer arithmetic
        self.add("multiply", Exactly(2), fn_multiply);
        self.add("mod", Exactly(2), fn_mod);
        self.add("floordiv", Exactly(2), fn_floordiv);
        self.add("factorial", Exactly(1), fn_factorial);
        self.add("perm", Exactly(2), fn_perm);
        self.add("comb", Exactly(2), fn_comb);

        // Special functions
        self.add("gamma", Exactly(1), fn_gamma);
        self.add("lgamma", Exactly(1), fn_lgamma);
    }

    fn register_logical_functions(&mut self) {
        use logical::*;
        use Arity::*;

        self.add("lt", Exactly(2), fn_lt);
        self.add("lte", Exactly(2), fn_lte);
        self.add("gt", Exactly(2), fn_gt);
        self.add("gte", Exactly(2), fn_gte);
        self.add("isequal", Exactly(2), fn_isequal);
        self.add("isclose", Exactly(2), fn_isclose);
        self.add("isclosetol", Exactly(3), fn_isclosetol);
        self.add("interval", Exactly(3), fn_interval);
        self.add("ternary", Exactly(3), fn_ternary);
        self.add("all", AtLeast(0), fn_all);
        self.add("any", AtLeast(0), fn_any);
    }

    fn register_statistical_functions(&mut self) {
        use statistical::*;
        use Arity::*;

        self.add("sum", AtLeast(0), fn_sum);
        self.add("prod", AtLeast(0), fn_prod);
        self.add("avg", AtLeast(1), fn_mean);
        self.add("mean", AtLeast(1), fn_mean);
        self.add("gmean", AtLeast(1), fn_gmean);
        self.add("hmean", AtLeast(1), fn_hmean);
        self.add("median", AtLeast(1), fn_median);
        self.add("mode", AtLeast(1), fn_mode);
        self.add("stdev", AtLeast(2), fn_stdev);
        self.add("min", AtLeast(1), fn_min);
        self.add("max", AtLeast(1), fn_max);
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Float result of a function; NaN from non-NaN input is a domain error,
/// infinity from finite input a range error
pub(crate) fn float_result(name: &str, args: &[Number], value: f64) -> FormulaResult<Number> {
    let inputs_finite = args.iter().all(|a| a.as_f64().is_finite());
    if value.is_nan() && args.iter().all(|a| !a.as_f64().is_nan()) {
        Err(FormulaError::domain(name, "math domain error"))
    } else if value.is_infinite() && inputs_finite {
        Err(FormulaError::domain(name, "math range error"))
    } else {
        Ok(Number::Float(value))
    }
}

/// An argument that must be a non-negative integer
pub(crate) fn non_negative_integer(name: &str, value: Number) -> FormulaResult<i64> {
    match value.as_integer() {
        Some(i) if i >= 0 => Ok(i),
        Some(_) => Err(FormulaError::domain(
            name,
            "not defined for negative values",
        )),
        None => Err(FormulaError::domain(
            name,
            "only accepts integral values",
        )),
    }
}
