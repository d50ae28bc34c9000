//! Curve sampling
//!
//! Walks the parameter `t` across the range of a [`CurveDefinition`] and
//! evaluates its formulas at each step to produce a polyline.
//!
//! # Example
//!
//! ```rust
//! use paracurve::prelude::*;
//!
//! let curve = CurveDefinition::default().with_range(0.0, 1.0, 0.25);
//! let sampling = curve.sample(&SamplingOptions::default()).unwrap();
//! assert_eq!(sampling.stats.samples, 4);
//! // closed curves repeat the first point
//! assert_eq!(sampling.points.len(), 5);
//! ```

use crate::curve::{CurveDefinition, Point};
use crate::error::{CurveError, Result};
use paracurve_formula::{Bindings, FormulaCache, InstructionStream, Number};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Names seeded with `0` before the first sample
const SEEDED_NAMES: [&str; 7] = ["a", "b", "c", "X", "Y", "Z", "t"];

/// What to do when a formula fails for one value of `t`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Abort the run with the error
    #[default]
    Fail,
    /// Drop the sample and keep going
    SkipPoint,
}

/// Options for a sampling run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingOptions {
    /// Repeat the first point at the end (default: true)
    pub closed: bool,
    /// Handling of per-sample evaluation errors (default: fail)
    pub on_error: ErrorPolicy,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            closed: true,
            on_error: ErrorPolicy::Fail,
        }
    }
}

/// Statistics from a sampling run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SamplingStats {
    /// Number of values of `t` visited
    pub samples: usize,
    /// Number of samples dropped under [`ErrorPolicy::SkipPoint`]
    pub skipped: usize,
}

/// Points produced by a sampling run
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Sampling {
    pub points: Vec<Point>,
    pub stats: SamplingStats,
}

/// Sample `definition` with the given options
pub fn sample(definition: &CurveDefinition, options: &SamplingOptions) -> Result<Sampling> {
    definition.validate()?;
    let sampler = CurveSampler::compile(definition)?;
    sampler.run(definition, options)
}

impl CurveDefinition {
    /// Sample this curve; see [`sample`]
    pub fn sample(&self, options: &SamplingOptions) -> Result<Sampling> {
        sample(self, options)
    }
}

/// A formula ready to run, bound to the name its result is stored under
struct Target<'a> {
    name: &'a str,
    /// `None` for blank formulas, which evaluate to `0`
    program: Option<Arc<InstructionStream>>,
}

impl Target<'_> {
    fn evaluate(&self, bindings: &Bindings, t: f64) -> Result<Number> {
        match &self.program {
            Some(program) => program.evaluate(bindings).map_err(|source| CurveError::Evaluate {
                target: self.name.to_string(),
                t,
                source,
            }),
            None => Ok(Number::Int(0)),
        }
    }
}

struct CurveSampler<'a> {
    targets: Vec<Target<'a>>,
}

impl<'a> CurveSampler<'a> {
    /// Compile every formula up front so parse errors surface before sampling
    fn compile(definition: &'a CurveDefinition) -> Result<Self> {
        let mut cache = FormulaCache::new();
        let mut targets = Vec::new();

        for (name, formula) in definition.targets() {
            let program = if formula.trim().is_empty() {
                None
            } else {
                let program = cache
                    .get_or_compile(formula)
                    .map_err(|source| CurveError::Compile {
                        target: name.to_string(),
                        source,
                    })?;
                Some(program)
            };
            targets.push(Target { name, program });
        }

        Ok(Self { targets })
    }

    fn run(&self, definition: &CurveDefinition, options: &SamplingOptions) -> Result<Sampling> {
        let count = definition.sample_count();
        let mut sampling = Sampling {
            points: Vec::new(),
            stats: SamplingStats::default(),
        };

        let mut bindings: Bindings = SEEDED_NAMES.iter().map(|&name| (name, 0i64)).collect();
        let mut t = definition.t_min;

        for i in 0..count {
            bindings.set("t", t);
            match self.evaluate_point(&mut bindings, t) {
                Ok(point) => {
                    tracing::trace!(i, t, x = point.x, y = point.y, z = point.z, "sampled point");
                    sampling.points.push(point);
                }
                Err(err) => match options.on_error {
                    ErrorPolicy::Fail => return Err(err),
                    ErrorPolicy::SkipPoint => {
                        tracing::warn!(i, t, error = %err, "skipping sample");
                        sampling.stats.skipped += 1;
                    }
                },
            }
            sampling.stats.samples += 1;
            t += definition.interval;
        }

        if options.closed {
            if let Some(&first) = sampling.points.first() {
                sampling.points.push(first);
            }
        }

        tracing::debug!(
            points = sampling.points.len(),
            skipped = sampling.stats.skipped,
            "sampled curve"
        );
        Ok(sampling)
    }

    /// Evaluate every target in order, binding each result before the next
    fn evaluate_point(&self, bindings: &mut Bindings, t: f64) -> Result<Point> {
        let mut point = Point::default();
        for target in &self.targets {
            let value = target.evaluate(bindings, t)?;
            match target.name {
                "X" => point.x = value.as_f64(),
                "Y" => point.y = value.as_f64(),
                "Z" => point.z = value.as_f64(),
                _ => {}
            }
            bindings.set(target.name, value);
        }
        Ok(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paracurve_formula::ErrorKind;
    use pretty_assertions::assert_eq;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    fn line(x: &str) -> CurveDefinition {
        CurveDefinition {
            x: x.into(),
            y: "0".into(),
            z: "0".into(),
            ..CurveDefinition::default()
        }
        .with_range(0.0, 1.0, 0.25)
    }

    #[test]
    fn test_cadence_and_closing_point() {
        let sampling = sample(&line("t"), &SamplingOptions::default()).unwrap();
        let xs: Vec<f64> = sampling.points.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 0.25, 0.5, 0.75, 0.0]);
        assert_eq!(sampling.stats, SamplingStats { samples: 4, skipped: 0 });
    }

    #[test]
    fn test_open_curve() {
        let options = SamplingOptions {
            closed: false,
            ..SamplingOptions::default()
        };
        let sampling = sample(&line("t"), &options).unwrap();
        assert_eq!(sampling.points.len(), 4);
    }

    #[test]
    fn test_stock_curve_first_point() {
        let sampling = sample(&CurveDefinition::default(), &SamplingOptions::default()).unwrap();
        // t = 0: c = (37 + cos(0)*2)*1 = 39
        assert_eq!(sampling.points[0], Point::new(39.0, 0.0, 0.0));
        assert_eq!(sampling.points.len(), 629);
    }

    #[test]
    fn test_helpers_see_earlier_values() {
        let def = line("d2").with_helper("d1", "t*2").with_helper("d2", "d1+c");
        let sampling = sample(&def, &SamplingOptions::default()).unwrap();
        // c = 37 + 2*cos(37*t); at t = 0 that is 39
        assert_approx(sampling.points[0].x, 39.0);
        assert_approx(
            sampling.points[1].x,
            0.5 + 37.0 + 2.0 * (37.0f64 * 0.25).cos(),
        );
    }

    #[test]
    fn test_previous_sample_is_visible() {
        // X refers to its own value from the previous sample, seeded with 0
        let sampling = sample(&line("X+1"), &SamplingOptions::default()).unwrap();
        let xs: Vec<f64> = sampling.points.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![1.0, 2.0, 3.0, 4.0, 1.0]);
    }

    #[test]
    fn test_blank_formula_is_zero() {
        let def = CurveDefinition {
            z: "  ".into(),
            ..line("t")
        };
        let sampling = sample(&def, &SamplingOptions::default()).unwrap();
        assert!(sampling.points.iter().all(|p| p.z == 0.0));
    }

    #[test]
    fn test_compile_errors_are_reported_up_front() {
        let def = CurveDefinition {
            y: "sin(t".into(),
            ..line("t")
        };
        let options = SamplingOptions {
            on_error: ErrorPolicy::SkipPoint,
            ..SamplingOptions::default()
        };
        let err = sample(&def, &options).unwrap_err();
        assert_eq!(err.target(), Some("Y"));
        assert!(matches!(err, CurveError::Compile { .. }));
    }

    #[test]
    fn test_fail_policy_reports_target_and_t() {
        let err = sample(&line("1/(t-0.5)"), &SamplingOptions::default()).unwrap_err();
        match err {
            CurveError::Evaluate { target, t, source } => {
                assert_eq!(target, "X");
                assert_eq!(t, 0.5);
                assert_eq!(source.kind(), ErrorKind::Domain);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_skip_policy_drops_failing_samples() {
        let options = SamplingOptions {
            on_error: ErrorPolicy::SkipPoint,
            closed: false,
        };
        let sampling = sample(&line("1/(t-0.5)"), &options).unwrap();
        assert_eq!(sampling.stats, SamplingStats { samples: 4, skipped: 1 });
        let xs: Vec<f64> = sampling.points.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![-2.0, -4.0, 4.0]);
    }

    #[test]
    fn test_invalid_definition_is_rejected() {
        let def = line("t").with_range(0.0, 1.0, 0.0);
        assert!(matches!(
            sample(&def, &SamplingOptions::default()),
            Err(CurveError::InvalidDefinition(_))
        ));
    }

    #[test]
    fn test_oversized_range_is_rejected() {
        let def = line("t").with_range(0.0, 1e300, 1e-300);
        assert!(matches!(
            sample(&def, &SamplingOptions::default()),
            Err(CurveError::InvalidDefinition(_))
        ));
    }

    #[test]
    fn test_empty_range() {
        let def = line("t").with_range(1.0, 1.0, 0.1);
        let sampling = sample(&def, &SamplingOptions::default()).unwrap();
        assert!(sampling.points.is_empty());
        assert_eq!(sampling.stats.samples, 0);
    }
}
