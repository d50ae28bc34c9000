//! Compiled formula cache

use crate::error::FormulaResult;
use crate::evaluator::{execute, Bindings};
use crate::parser::compile;
use crate::program::InstructionStream;
use crate::value::Number;
use ahash::AHashMap;
use std::sync::Arc;

/// Cache of compiled instruction streams keyed by formula text
///
/// Sampling a curve evaluates the same handful of formulas thousands of
/// times; each distinct text is compiled once and replayed afterwards.
///
/// Entries are never evicted. Scope a cache to one batch of formulas (the
/// sampler builds one per run), or call [`clear`](Self::clear) between
/// batches.
#[derive(Debug, Default)]
pub struct FormulaCache {
    programs: AHashMap<Arc<str>, Arc<InstructionStream>>,
}

impl FormulaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    pub fn clear(&mut self) {
        self.programs.clear();
    }

    /// Return the compiled stream for `formula`, compiling it on first use
    ///
    /// Failed compilations are not cached.
    pub fn get_or_compile(&mut self, formula: &str) -> FormulaResult<Arc<InstructionStream>> {
        if let Some(program) = self.programs.get(formula) {
            return Ok(Arc::clone(program));
        }

        let program = Arc::new(compile(formula)?);
        self.programs.insert(Arc::from(formula), Arc::clone(&program));
        tracing::debug!(formula, cached = self.programs.len(), "cached formula");
        Ok(program)
    }

    /// Evaluate through the cache; empty text evaluates to `0`
    pub fn evaluate(&mut self, formula: &str, bindings: &Bindings) -> FormulaResult<Number> {
        if formula.trim().is_empty() {
            return Ok(Number::Int(0));
        }
        let program = self.get_or_compile(formula)?;
        execute(&program, bindings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compiles_once_per_text() {
        let mut cache = FormulaCache::new();
        let first = cache.get_or_compile("a+1").unwrap();
        let second = cache.get_or_compile("a+1").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        cache.get_or_compile("a+2").unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let mut cache = FormulaCache::new();
        assert!(cache.get_or_compile("a+").is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_evaluate() {
        let mut cache = FormulaCache::new();
        let vars = Bindings::from([("a", 2.0)]);
        assert_eq!(cache.evaluate("a*3", &vars).unwrap(), Number::Float(6.0));
        assert_eq!(cache.evaluate("", &vars).unwrap(), Number::Int(0));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
