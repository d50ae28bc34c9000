//! # paracurve
//!
//! Parametric curves defined by user-written formulas.
//!
//! A curve is a set of formulas for the coefficients `a`, `b`, `c`, optional
//! helpers, and the coordinates `X`, `Y`, `Z`. Sampling steps `t` across a
//! range and evaluates the formulas in order, each one able to read the
//! values bound before it.
//!
//! ## Features
//!
//! - Formula compilation to a postfix instruction stream
//! - Evaluation with integer-preserving arithmetic
//! - Built-in math, comparison and aggregate functions
//! - Curve sampling with fail or skip error policies
//!
//! ## Example
//!
//! ```rust
//! use paracurve::prelude::*;
//!
//! let vars = Bindings::from([("a", 3.0), ("b", 1.0), ("c", 5.0), ("t", 0.0)]);
//! assert_eq!(evaluate("(a+b*cos(c*t))*cos(t)", &vars).unwrap(), 4.0);
//!
//! let curve = CurveDefinition::default();
//! let sampling = curve.sample(&SamplingOptions::default()).unwrap();
//! assert_eq!(sampling.points.first(), sampling.points.last());
//! ```

pub mod curve;
pub mod error;
pub mod prelude;
pub mod sampler;

pub use curve::{CurveDefinition, Helper, Point, MAX_SAMPLES, RESERVED_NAMES};
pub use error::{CurveError, Result};
pub use sampler::{sample, ErrorPolicy, Sampling, SamplingOptions, SamplingStats};

// Re-export the formula API
pub use paracurve_formula::{
    compile, evaluate, evaluate_into, evaluate_number, function_registry, Bindings, ErrorKind,
    FormulaCache, FormulaError, FormulaResult, Instruction, InstructionStream, Number,
};
