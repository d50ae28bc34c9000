//! Prelude module - common imports for paracurve users
//!
//! ```rust
//! use paracurve::prelude::*;
//! ```

pub use crate::{
    // Formula types
    compile,
    evaluate,
    evaluate_into,
    Bindings,
    // Curve types
    CurveDefinition,
    // Error types
    CurveError,
    ErrorKind,
    ErrorPolicy,
    FormulaError,
    Helper,
    InstructionStream,
    Number,
    Point,
    Sampling,
    SamplingOptions,
    SamplingStats,
};
