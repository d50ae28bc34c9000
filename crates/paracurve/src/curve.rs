//! Curve definitions
//!
//! A curve is described by formulas for the coefficients `a`, `b`, `c`,
//! optional helper formulas, and the coordinates `X`, `Y`, `Z`, all
//! evaluated for each value of the parameter `t`.

use crate::error::{CurveError, Result};
use paracurve_formula::Constant;
use serde::{Deserialize, Serialize};

/// Largest number of samples a definition may produce
pub const MAX_SAMPLES: usize = 10_000_000;

/// Names bound by the sampler itself; helpers may not reuse them
pub const RESERVED_NAMES: [&str; 7] = ["t", "a", "b", "c", "X", "Y", "Z"];

/// A named intermediate formula evaluated between `c` and `X`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Helper {
    pub name: String,
    pub formula: String,
}

impl Helper {
    pub fn new(name: impl Into<String>, formula: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            formula: formula.into(),
        }
    }
}

/// Formulas and parameter range of a parametric curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveDefinition {
    pub a: String,
    pub b: String,
    pub c: String,
    #[serde(rename = "X")]
    pub x: String,
    #[serde(rename = "Y")]
    pub y: String,
    #[serde(rename = "Z")]
    pub z: String,
    pub helpers: Vec<Helper>,
    pub t_min: f64,
    pub t_max: f64,
    pub interval: f64,
}

impl Default for CurveDefinition {
    fn default() -> Self {
        Self {
            a: "37".into(),
            b: "1".into(),
            c: "(a+cos(a*t)*2)*b".into(),
            x: "cos(t)*c".into(),
            y: "sin(t)*c".into(),
            z: "0".into(),
            helpers: Vec::new(),
            t_min: 0.0,
            t_max: std::f64::consts::TAU,
            interval: 0.01,
        }
    }
}

impl CurveDefinition {
    /// Append a helper formula
    pub fn with_helper(mut self, name: impl Into<String>, formula: impl Into<String>) -> Self {
        self.helpers.push(Helper::new(name, formula));
        self
    }

    /// Set the parameter range and step
    pub fn with_range(mut self, t_min: f64, t_max: f64, interval: f64) -> Self {
        self.t_min = t_min;
        self.t_max = t_max;
        self.interval = interval;
        self
    }

    /// Formulas in evaluation order, paired with the name each result is bound to
    pub fn targets(&self) -> Vec<(&str, &str)> {
        let mut targets = vec![
            ("a", self.a.as_str()),
            ("b", self.b.as_str()),
            ("c", self.c.as_str()),
        ];
        targets.extend(self.helpers.iter().map(|h| (h.name.as_str(), h.formula.as_str())));
        targets.extend([
            ("X", self.x.as_str()),
            ("Y", self.y.as_str()),
            ("Z", self.z.as_str()),
        ]);
        targets
    }

    /// Number of samples the range produces
    ///
    /// Only meaningful for a definition that passes [`validate`](Self::validate);
    /// larger counts saturate.
    pub fn sample_count(&self) -> usize {
        ((self.t_max - self.t_min) / self.interval).floor() as usize
    }

    /// Check the range and helper names
    pub fn validate(&self) -> Result<()> {
        if !self.t_min.is_finite() || !self.t_max.is_finite() {
            return Err(CurveError::invalid("t_min and t_max must be finite"));
        }
        if !self.interval.is_finite() || self.interval <= 0.0 {
            return Err(CurveError::invalid(format!(
                "interval must be a positive number, got {}",
                self.interval
            )));
        }
        if self.t_max < self.t_min {
            return Err(CurveError::invalid(format!(
                "t_max ({}) is smaller than t_min ({})",
                self.t_max, self.t_min
            )));
        }
        let samples = ((self.t_max - self.t_min) / self.interval).floor();
        if samples > MAX_SAMPLES as f64 {
            return Err(CurveError::invalid(format!(
                "range produces {} samples, more than the limit of {}",
                samples, MAX_SAMPLES
            )));
        }

        for (i, helper) in self.helpers.iter().enumerate() {
            let name = helper.name.as_str();
            if !is_identifier(name) {
                return Err(CurveError::invalid(format!(
                    "helper name '{}' is not a valid identifier",
                    name
                )));
            }
            if RESERVED_NAMES.contains(&name) {
                return Err(CurveError::invalid(format!(
                    "helper name '{}' is reserved",
                    name
                )));
            }
            if Constant::from_keyword(name).is_some() {
                return Err(CurveError::invalid(format!(
                    "helper name '{}' is a constant",
                    name
                )));
            }
            if self.helpers[..i].iter().any(|h| h.name == name) {
                return Err(CurveError::invalid(format!(
                    "helper name '{}' is defined twice",
                    name
                )));
            }
        }

        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        }
        _ => false,
    }
}

/// A sampled point
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl From<(f64, f64, f64)> for Point {
    fn from((x, y, z): (f64, f64, f64)) -> Self {
        Self { x, y, z }
    }
}
