//! Numeric values produced during evaluation

use std::fmt;

/// A formula value
///
/// Literals that are written as plain integers stay integral until an
/// operation (division, a transcendental function, overflow) promotes them
/// to floating point.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    /// Parse a numeric literal as scanned by the tokenizer
    ///
    /// The text is read as an integer when it round-trips as one, otherwise
    /// as a float (`"5"` -> `Int(5)`, `"5."` and `"1e3"` -> `Float`).
    pub fn parse_literal(text: &str) -> Option<Number> {
        if let Ok(i) = text.parse::<i64>() {
            return Some(Number::Int(i));
        }
        text.parse::<f64>().ok().map(Number::Float)
    }

    /// The value as a float
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    /// The value as an integer, if it is integral and in range
    pub fn as_integer(self) -> Option<i64> {
        match self {
            Number::Int(i) => Some(i),
            Number::Float(f) if f.is_finite() && f.fract() == 0.0 => {
                if f >= i64::MIN as f64 && f < i64::MAX as f64 {
                    Some(f as i64)
                } else {
                    None
                }
            }
            Number::Float(_) => None,
        }
    }

    pub fn is_int(self) -> bool {
        matches!(self, Number::Int(_))
    }

    /// Non-zero values are true
    pub fn is_truthy(self) -> bool {
        match self {
            Number::Int(i) => i != 0,
            Number::Float(f) => f != 0.0,
        }
    }

    pub fn is_zero(self) -> bool {
        !self.is_truthy()
    }

    /// Booleans are represented as 1 / 0 so they compose arithmetically
    pub fn from_bool(b: bool) -> Number {
        Number::Int(b as i64)
    }

    pub fn negate(self) -> Number {
        match self {
            Number::Int(i) => i
                .checked_neg()
                .map_or(Number::Float(-(i as f64)), Number::Int),
            Number::Float(f) => Number::Float(-f),
        }
    }

    pub fn abs(self) -> Number {
        match self {
            Number::Int(i) => i
                .checked_abs()
                .map_or(Number::Float((i as f64).abs()), Number::Int),
            Number::Float(f) => Number::Float(f.abs()),
        }
    }

    /// Build a number from a float result that is known to be integral,
    /// keeping it as `Int` when it fits
    pub(crate) fn integral(f: f64) -> Number {
        match Number::Float(f).as_integer() {
            Some(i) => Number::Int(i),
            None => Number::Float(f),
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a == b,
            _ => self.as_f64() == other.as_f64(),
        }
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::Float(value)
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::Int(value)
    }
}

impl From<i32> for Number {
    fn from(value: i32) -> Self {
        Number::Int(value as i64)
    }
}

impl From<bool> for Number {
    fn from(value: bool) -> Self {
        Number::from_bool(value)
    }
}

impl From<Number> for f64 {
    fn from(value: Number) -> Self {
        value.as_f64()
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            // Debug keeps the fractional marker ("5.0")
            Number::Float(x) => write!(f, "{:?}", x),
        }
    }
}
