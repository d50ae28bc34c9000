//! Error types for curve sampling

use paracurve_formula::FormulaError;
use thiserror::Error;

/// Result type alias for curve operations
pub type Result<T> = std::result::Result<T, CurveError>;

/// Errors raised while validating or sampling a curve
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CurveError {
    /// A formula failed to compile
    #[error("error in the formula of {target}(): {source}")]
    Compile {
        target: String,
        #[source]
        source: FormulaError,
    },

    /// A formula failed while sampling
    #[error("error in calculus of {target}() for t={t}: {source}")]
    Evaluate {
        target: String,
        t: f64,
        #[source]
        source: FormulaError,
    },

    /// The curve definition cannot be sampled
    #[error("invalid curve definition: {0}")]
    InvalidDefinition(String),
}

impl CurveError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        CurveError::InvalidDefinition(message.into())
    }

    /// Name of the formula that failed, if any
    pub fn target(&self) -> Option<&str> {
        match self {
            CurveError::Compile { target, .. } | CurveError::Evaluate { target, .. } => {
                Some(target)
            }
            CurveError::InvalidDefinition(_) => None,
        }
    }

    /// Underlying formula error, if any
    pub fn formula_error(&self) -> Option<&FormulaError> {
        match self {
            CurveError::Compile { source, .. } | CurveError::Evaluate { source, .. } => {
                Some(source)
            }
            CurveError::InvalidDefinition(_) => None,
        }
    }
}
