//! Compiled formula representation
//!
//! A formula compiles to a flat postfix [`InstructionStream`]: operands come
//! before the operator that consumes them, and call arguments come before
//! the call. The evaluator replays the stream from the end.

use crate::value::Number;
use std::fmt;
use std::sync::Arc;

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
}

impl BinaryOperator {
    pub fn symbol(self) -> char {
        match self {
            BinaryOperator::Add => '+',
            BinaryOperator::Subtract => '-',
            BinaryOperator::Multiply => '*',
            BinaryOperator::Divide => '/',
            BinaryOperator::Power => '^',
        }
    }
}

/// Reserved constants (`PI` and `E`, matched case-insensitively)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Constant {
    Pi,
    E,
}

impl Constant {
    /// Match a whole identifier against the reserved words
    pub fn from_keyword(word: &str) -> Option<Constant> {
        if word.eq_ignore_ascii_case("pi") {
            Some(Constant::Pi)
        } else if word.eq_ignore_ascii_case("e") {
            Some(Constant::E)
        } else {
            None
        }
    }

    pub fn value(self) -> f64 {
        match self {
            Constant::Pi => std::f64::consts::PI,
            Constant::E => std::f64::consts::E,
        }
    }
}

/// One step of a compiled formula
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Numeric literal
    Literal(Number),
    /// `PI` or `E`
    Constant(Constant),
    /// Variable looked up in the bindings
    Name(String),
    /// Unary minus applied to the next evaluated operand
    Negate,
    /// Binary operator applied to the two next evaluated operands
    Binary(BinaryOperator),
    /// Call of a registered function with `argc` arguments
    Call { name: String, argc: usize },
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Literal(n) => write!(f, "{}", n),
            Instruction::Constant(Constant::Pi) => f.write_str("PI"),
            Instruction::Constant(Constant::E) => f.write_str("E"),
            Instruction::Name(name) => f.write_str(name),
            Instruction::Negate => f.write_str("neg"),
            Instruction::Binary(op) => write!(f, "{}", op.symbol()),
            Instruction::Call { name, argc } => write!(f, "{}/{}", name, argc),
        }
    }
}

/// A compiled formula
///
/// Immutable once built; evaluation only reads it, so one stream can be
/// shared between threads or cached and replayed many times.
#[derive(Debug, Clone, PartialEq)]
pub struct InstructionStream {
    source: Arc<str>,
    instructions: Vec<Instruction>,
}

impl InstructionStream {
    pub(crate) fn new(source: Arc<str>, instructions: Vec<Instruction>) -> Self {
        Self {
            source,
            instructions,
        }
    }

    /// The formula text this stream was compiled from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Instructions in production (postfix) order
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// True only for the stream of an empty formula, which evaluates to 0
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Variable names referenced by the formula, in first-use order
    pub fn variables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for instr in &self.instructions {
            if let Instruction::Name(name) = instr {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }
}

impl fmt::Display for InstructionStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, instr) in self.instructions.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", instr)?;
        }
        Ok(())
    }
}
