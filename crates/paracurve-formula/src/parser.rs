//! Formula compiler
//!
//! A recursive descent parser that emits a postfix [`InstructionStream`]
//! directly instead of building a tree.
//!
//! ```text
//! expr    := term   ( ('+'|'-') term )*
//! term    := factor ( ('*'|'/') factor )*
//! factor  := ('+'|'-')* atom ( '^' factor )?
//! atom    := funcall | PI | E | number | identifier | '(' expr ')'
//! funcall := identifier '(' [ expr (',' expr)* ] ')'
//! ```
//!
//! Exponentiation is right-associative (`2^3^2 == 2^9`) and a leading sign
//! applies to the whole power (`-2^2 == -4`), while `2^-1` still reads the
//! sign as part of the exponent.

use crate::error::{FormulaError, FormulaResult};
use crate::program::{BinaryOperator, Constant, Instruction, InstructionStream};
use crate::value::Number;
use lazy_regex::regex;
use std::sync::Arc;

/// Maximum nesting of parentheses, calls and exponent chains
pub const MAX_DEPTH: usize = 256;

/// Compile a formula into an instruction stream
///
/// Empty (or whitespace-only) text is not valid grammar input; use
/// [`crate::evaluate`], which defines it as `0`, when that case matters.
///
/// # Example
/// ```rust
/// use paracurve_formula::compile;
///
/// let stream = compile("(a+b*cos(c*t))*cos(t)").unwrap();
/// assert_eq!(stream.to_string(), "a b c t * cos/1 * + t cos/1 *");
/// ```
pub fn compile(formula: &str) -> FormulaResult<InstructionStream> {
    if formula.trim().is_empty() {
        return Err(FormulaError::parse("Empty formula", 0));
    }

    let mut compiler = FormulaCompiler::new(formula)?;
    compiler.parse_expression()?;

    // Make sure we consumed all input
    if compiler.current_token != Token::Eof {
        return Err(FormulaError::parse(
            format!(
                "Unexpected {} after expression",
                compiler.current_token.describe()
            ),
            compiler.token_start,
        ));
    }

    let stream = InstructionStream::new(Arc::from(formula), compiler.output);
    tracing::debug!(
        formula,
        instructions = stream.len(),
        "compiled formula"
    );
    Ok(stream)
}

/// Token types
#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(Number),
    Identifier(String),

    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Comma,
    LeftParen,
    RightParen,

    Eof,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {}", n),
            Token::Identifier(name) => format!("identifier '{}'", name),
            Token::Plus => "'+'".into(),
            Token::Minus => "'-'".into(),
            Token::Star => "'*'".into(),
            Token::Slash => "'/'".into(),
            Token::Caret => "'^'".into(),
            Token::Comma => "','".into(),
            Token::LeftParen => "'('".into(),
            Token::RightParen => "')'".into(),
            Token::Eof => "end of input".into(),
        }
    }
}

struct FormulaCompiler<'a> {
    input: &'a str,
    pos: usize,
    current_token: Token,
    /// Byte offset where the current token begins
    token_start: usize,
    output: Vec<Instruction>,
    depth: usize,
}

impl<'a> FormulaCompiler<'a> {
    fn new(input: &'a str) -> FormulaResult<Self> {
        let mut compiler = Self {
            input,
            pos: 0,
            current_token: Token::Eof,
            token_start: 0,
            output: Vec::new(),
            depth: 0,
        };
        compiler.advance_token()?;
        Ok(compiler)
    }

    // === Token scanning ===

    fn advance_token(&mut self) -> FormulaResult<()> {
        self.skip_whitespace();
        self.token_start = self.pos;
        self.current_token = self.scan_token()?;
        Ok(())
    }

    fn scan_token(&mut self) -> FormulaResult<Token> {
        let c = match self.peek_char() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        let single = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '^' => Some(Token::Caret),
            ',' => Some(Token::Comma),
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            _ => None,
        };
        if let Some(token) = single {
            self.pos += 1;
            return Ok(token);
        }

        let rest = &self.input[self.pos..];

        // 5  .5  5.  1e-9  2.5E+3
        if let Some(m) = regex!(r"^(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?").find(rest)
        {
            let text = m.as_str();
            let number = Number::parse_literal(text).ok_or_else(|| {
                FormulaError::parse(format!("Malformed number '{}'", text), self.pos)
            })?;
            self.pos += text.len();
            return Ok(Token::Number(number));
        }

        if let Some(m) = regex!(r"^[A-Za-z][A-Za-z0-9_$]*").find(rest) {
            self.pos += m.end();
            return Ok(Token::Identifier(m.as_str().to_string()));
        }

        Err(FormulaError::parse(
            format!("Unexpected character '{}'", c),
            self.pos,
        ))
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn consume(&mut self) -> FormulaResult<Token> {
        let token = std::mem::replace(&mut self.current_token, Token::Eof);
        self.advance_token()?;
        Ok(token)
    }

    fn expect(&mut self, expected: Token) -> FormulaResult<()> {
        if self.current_token == expected {
            self.consume()?;
            Ok(())
        } else {
            Err(FormulaError::parse(
                format!(
                    "Expected {}, found {}",
                    expected.describe(),
                    self.current_token.describe()
                ),
                self.token_start,
            ))
        }
    }

    fn enter(&mut self) -> FormulaResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(FormulaError::parse(
                format!("Formula nested deeper than {} levels", MAX_DEPTH),
                self.token_start,
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn emit(&mut self, instruction: Instruction) {
        self.output.push(instruction);
    }

    // === Grammar ===

    fn parse_expression(&mut self) -> FormulaResult<()> {
        self.enter()?;
        self.parse_term()?;

        loop {
            let op = match self.current_token {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                _ => break,
            };
            self.consume()?;
            self.parse_term()?;
            self.emit(Instruction::Binary(op));
        }

        self.leave();
        Ok(())
    }

    fn parse_term(&mut self) -> FormulaResult<()> {
        self.parse_factor()?;

        loop {
            let op = match self.current_token {
                Token::Star => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                _ => break,
            };
            self.consume()?;
            self.parse_factor()?;
            self.emit(Instruction::Binary(op));
        }

        Ok(())
    }

    fn parse_factor(&mut self) -> FormulaResult<()> {
        self.enter()?;

        let mut negations = 0usize;
        loop {
            match self.current_token {
                Token::Minus => negations += 1,
                Token::Plus => {}
                _ => break,
            }
            self.consume()?;
        }

        self.parse_atom()?;

        if self.current_token == Token::Caret {
            self.consume()?;
            self.parse_factor()?; // right associative
            self.emit(Instruction::Binary(BinaryOperator::Power));
        }

        for _ in 0..negations {
            self.emit(Instruction::Negate);
        }

        self.leave();
        Ok(())
    }

    fn parse_atom(&mut self) -> FormulaResult<()> {
        match self.current_token.clone() {
            Token::Number(n) => {
                self.consume()?;
                self.emit(Instruction::Literal(n));
            }

            Token::Identifier(name) => {
                self.consume()?;
                if self.current_token == Token::LeftParen {
                    self.parse_function_call(name)?;
                } else if let Some(constant) = Constant::from_keyword(&name) {
                    self.emit(Instruction::Constant(constant));
                } else {
                    self.emit(Instruction::Name(name));
                }
            }

            Token::LeftParen => {
                self.consume()?;
                self.parse_expression()?;
                self.expect(Token::RightParen)?;
            }

            other => {
                return Err(FormulaError::parse(
                    format!("Expected an operand, found {}", other.describe()),
                    self.token_start,
                ))
            }
        }
        Ok(())
    }

    fn parse_function_call(&mut self, name: String) -> FormulaResult<()> {
        self.expect(Token::LeftParen)?;

        let mut argc = 0;
        if self.current_token != Token::RightParen {
            self.parse_expression()?;
            argc += 1;

            while self.current_token == Token::Comma {
                self.consume()?;
                self.parse_expression()?;
                argc += 1;
            }
        }

        self.expect(Token::RightParen)?;
        self.emit(Instruction::Call { name, argc });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    fn postfix(formula: &str) -> String {
        compile(formula).unwrap().to_string()
    }

    fn parse_error_at(formula: &str) -> usize {
        match compile(formula) {
            Err(FormulaError::Parse { position, .. }) => position,
            other => panic!("expected parse error for {:?}, got {:?}", formula, other),
        }
    }

    #[test]
    fn test_compile_numbers() {
        assert_eq!(postfix("42"), "42");
        assert_eq!(postfix("3.14"), "3.14");
        assert_eq!(postfix(".5"), "0.5");
        assert_eq!(postfix("5."), "5.0");
        assert_eq!(postfix("2.5E+3"), "2500.0");
        assert!(matches!(
            compile("1e-9").unwrap().instructions(),
            [Instruction::Literal(Number::Float(f))] if *f == 1e-9
        ));
    }

    #[test]
    fn test_literal_keeps_integers() {
        let stream = compile("7").unwrap();
        assert_eq!(stream.instructions(), &[Instruction::Literal(Number::Int(7))]);
        assert!(matches!(
            compile("7.0").unwrap().instructions(),
            [Instruction::Literal(Number::Float(_))]
        ));
    }

    #[test]
    fn test_compile_precedence() {
        assert_eq!(postfix("1+2*3"), "1 2 3 * +");
        assert_eq!(postfix("(1+2)*3"), "1 2 + 3 *");
        assert_eq!(postfix("1-2-3"), "1 2 - 3 -");
        assert_eq!(postfix("8/4/2"), "8 4 / 2 /");
    }

    #[test]
    fn test_power_is_right_associative() {
        assert_eq!(postfix("2^3^2"), "2 3 2 ^ ^");
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(postfix("-2^2"), "2 2 ^ neg");
        assert_eq!(postfix("2^-1"), "2 1 neg ^");
        assert_eq!(postfix("2*-3"), "2 3 neg *");
        assert_eq!(postfix("--x"), "x neg neg");
        assert_eq!(postfix("+-+x"), "x neg");
        assert_eq!(postfix("-(a+b)"), "a b + neg");
    }

    #[test]
    fn test_constants_are_whole_words() {
        assert_eq!(
            compile("pi").unwrap().instructions(),
            &[Instruction::Constant(Constant::Pi)]
        );
        assert_eq!(
            compile("E").unwrap().instructions(),
            &[Instruction::Constant(Constant::E)]
        );
        assert_eq!(postfix("exp(1)"), "1 exp/1");
        assert_eq!(postfix("e2"), "e2");
        assert_eq!(postfix("pi_half"), "pi_half");
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(postfix("d1+X"), "d1 X +");
        assert_eq!(postfix("cost$"), "cost$");
    }

    #[test]
    fn test_function_calls() {
        assert_eq!(postfix("hypot(3, 4)"), "3 4 hypot/2");
        assert_eq!(postfix("sum(1,2,3)"), "1 2 3 sum/3");
        assert_eq!(postfix("sin(cos(t))"), "t cos/1 sin/1");
        assert_eq!(postfix("f()"), "f/0");
        assert_eq!(postfix("ternary(lt(t,1), t, -t)"), "t 1 lt/2 t t neg ternary/3");
    }

    #[test]
    fn test_whitespace_is_ignored() {
        assert_eq!(postfix("  a *\tcos( t )  "), "a t cos/1 *");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_error_at("(1+2"), 4);
        assert_eq!(parse_error_at("1+2)"), 3);
        assert_eq!(parse_error_at("1 2"), 2);
        assert_eq!(parse_error_at("1+"), 2);
        assert_eq!(parse_error_at("3 # 4"), 2);
        assert_eq!(parse_error_at("f(1,)"), 4);
        assert_eq!(parse_error_at("5e"), 1);
        assert_eq!(parse_error_at("_x"), 0);
    }

    #[test]
    fn test_empty_formula_is_not_grammar_input() {
        let err = compile("").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(compile("   ").is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert!(matches!(compile(&deep), Err(FormulaError::Parse { .. })));

        let fine = format!("{}1{}", "(".repeat(50), ")".repeat(50));
        assert_eq!(postfix(&fine), "1");
    }

    #[test]
    fn test_source_is_kept() {
        let stream = compile("a+1").unwrap();
        assert_eq!(stream.source(), "a+1");
        assert_eq!(stream.len(), 3);
    }
}
