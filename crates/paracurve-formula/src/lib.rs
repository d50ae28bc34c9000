//! # paracurve-formula
//!
//! Formula compiler and evaluator for paracurve.
//!
//! This crate provides:
//! - Formula compilation (text → postfix instruction stream)
//! - Stack-machine evaluation against variable bindings
//! - Built-in math, comparison and aggregate functions
//! - A cache of compiled formulas for repeated evaluation
//!
//! ## Example
//!
//! ```rust
//! use paracurve_formula::{compile, evaluate, Bindings};
//!
//! let vars = Bindings::from([("a", 2.0), ("t", 0.0)]);
//! assert_eq!(evaluate("a*cos(t) + 2^3^2", &vars).unwrap(), 514.0);
//!
//! let stream = compile("(a+b*cos(c*t))*cos(t)").unwrap();
//! assert_eq!(stream.variables(), vec!["a", "b", "c", "t"]);
//! ```

pub mod cache;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod parser;
pub mod program;
pub mod value;

pub use cache::FormulaCache;
pub use error::{ErrorKind, FormulaError, FormulaResult};
pub use evaluator::{
    evaluate, evaluate_into, evaluate_number, execute, function_registry, Bindings,
};
pub use functions::{Arity, FunctionDef, FunctionRegistry};
pub use parser::compile;
pub use program::{BinaryOperator, Constant, Instruction, InstructionStream};
pub use value::Number;
