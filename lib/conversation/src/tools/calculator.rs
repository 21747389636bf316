//! Arithmetic calculator tool.
//!
//! Input is restricted to digits, `+ - * / . ( )` and spaces, then parsed
//! with a small recursive-descent grammar:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/' | '//') unary)*
//! unary   := ('+' | '-')* power
//! power   := primary ('**' unary)?
//! primary := number | '(' expr ')'
//! ```
//!
//! Integers stay integers under `+ - * // **` (a negative exponent gives a
//! float); `/` always yields a float, and a float operand makes the result a
//! float. Nesting deeper than [`MAX_DEPTH`] is rejected.

use crate::error::ToolError;
use crate::tool::{Tool, ToolSpec};
use std::fmt;

const NAME: &str = "calculator";

/// Deepest nesting of parentheses and exponents accepted.
pub const MAX_DEPTH: usize = 200;

/// The `calculator` tool.
#[derive(Debug, Clone, Copy, Default)]
pub struct Calculator;

impl Tool for Calculator {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            NAME,
            "Perform a basic math calculation. Only supports numbers and + - * / . ( )",
            "expression",
        )
    }

    fn call(&self, input: &str) -> Result<String, ToolError> {
        match evaluate(input) {
            Ok(value) => Ok(format!("Result: {value}")),
            Err(err @ CalcError::DisallowedCharacter { .. }) => {
                Err(ToolError::invalid_input(NAME, err.to_string()))
            }
            Err(err) => Err(ToolError::execution_failed(NAME, err.to_string())),
        }
    }
}

/// A calculator value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            // Precision loss above 2^53 matches float promotion semantics.
            #[allow(clippy::cast_precision_loss)]
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => f.write_str(&float_repr(*x)),
        }
    }
}

/// Shortest round-trip float text: whole floats keep `.0`, and exponents
/// carry a sign and at least two digits (`1e+16`, `1.5e-05`).
fn float_repr(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    let debug = format!("{x:?}");
    match debug.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => debug,
    }
}

/// Reasons an expression cannot be evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalcError {
    /// The input contains a character outside the arithmetic alphabet.
    DisallowedCharacter { found: char },
    /// A numeric literal could not be parsed.
    InvalidNumber { literal: String },
    /// A token appeared where it is not allowed.
    UnexpectedToken { token: String },
    /// The expression ended early.
    UnexpectedEnd,
    /// Division by zero.
    DivisionByZero,
    /// Integer arithmetic overflowed, or a float power left the finite range.
    Overflow,
    /// Parentheses or exponents nest deeper than [`MAX_DEPTH`].
    TooDeep,
    /// The result is not a real number.
    NotReal,
}

impl fmt::Display for CalcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DisallowedCharacter { .. } => write!(f, "Only basic math operations allowed"),
            Self::InvalidNumber { literal } => write!(f, "invalid number '{literal}'"),
            Self::UnexpectedToken { token } => write!(f, "unexpected '{token}'"),
            Self::UnexpectedEnd => write!(f, "unexpected end of expression"),
            Self::DivisionByZero => write!(f, "division by zero"),
            Self::Overflow => write!(f, "integer overflow"),
            Self::TooDeep => write!(f, "expression nested too deeply"),
            Self::NotReal => write!(f, "result is not a real number"),
        }
    }
}

impl std::error::Error for CalcError {}

/// Evaluates an arithmetic expression.
///
/// # Errors
///
/// Returns [`CalcError::DisallowedCharacter`] before any parsing if the input
/// contains anything but digits, `+ - * / . ( )` and spaces; otherwise any
/// parse or arithmetic failure.
pub fn evaluate(expression: &str) -> Result<Number, CalcError> {
    if let Some(found) = expression.chars().find(|c| !is_allowed(*c)) {
        return Err(CalcError::DisallowedCharacter { found });
    }

    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    match parser.peek() {
        None => Ok(value),
        Some(token) => Err(CalcError::UnexpectedToken {
            token: token.to_string(),
        }),
    }
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '+' | '-' | '*' | '/' | '.' | '(' | ')' | ' ')
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(Number),
    Plus,
    Minus,
    Star,
    Slash,
    DoubleSlash,
    DoubleStar,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Plus => f.write_str("+"),
            Self::Minus => f.write_str("-"),
            Self::Star => f.write_str("*"),
            Self::Slash => f.write_str("/"),
            Self::DoubleSlash => f.write_str("//"),
            Self::DoubleStar => f.write_str("**"),
            Self::LParen => f.write_str("("),
            Self::RParen => f.write_str(")"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, CalcError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        let token = match c {
            ' ' => continue,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' if chars.next_if(|&(_, n)| n == '*').is_some() => Token::DoubleStar,
            '*' => Token::Star,
            '/' if chars.next_if(|&(_, n)| n == '/').is_some() => Token::DoubleSlash,
            '/' => Token::Slash,
            '(' => Token::LParen,
            ')' => Token::RParen,
            _ => {
                let mut end = start + c.len_utf8();
                while let Some(&(i, next)) = chars.peek() {
                    if !(next.is_ascii_digit() || next == '.') {
                        break;
                    }
                    end = i + next.len_utf8();
                    chars.next();
                }
                Token::Num(parse_number(&input[start..end])?)
            }
        };
        tokens.push(token);
    }

    Ok(tokens)
}

fn parse_number(literal: &str) -> Result<Number, CalcError> {
    let invalid = || CalcError::InvalidNumber {
        literal: literal.to_string(),
    };
    if literal.contains('.') {
        literal.parse().map(Number::Float).map_err(|_| invalid())
    } else if literal.starts_with('0') && literal.bytes().any(|b| b != b'0') {
        // Leading zeros are only allowed on zero itself.
        Err(invalid())
    } else {
        // All-digit literals only fail to parse by overflowing.
        literal.parse().map(Number::Int).map_err(|_| CalcError::Overflow)
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expr(&mut self) -> Result<Number, CalcError> {
        let mut value = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = apply(op, value, rhs)?;
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<Number, CalcError> {
        let mut value = self.unary()?;
        while let Some(op @ (Token::Star | Token::Slash | Token::DoubleSlash)) = self.peek() {
            self.pos += 1;
            let rhs = self.unary()?;
            value = apply(op, value, rhs)?;
        }
        Ok(value)
    }

    // Every nested parenthesis or exponent passes through here exactly once.
    fn unary(&mut self) -> Result<Number, CalcError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(CalcError::TooDeep);
        }

        let mut negate = false;
        while let Some(sign @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            negate ^= sign == Token::Minus;
        }
        let value = self.power()?;
        self.depth -= 1;

        match (negate, value) {
            (false, value) => Ok(value),
            (true, Number::Int(i)) => i.checked_neg().map(Number::Int).ok_or(CalcError::Overflow),
            (true, Number::Float(f)) => Ok(Number::Float(-f)),
        }
    }

    fn power(&mut self) -> Result<Number, CalcError> {
        let base = self.primary()?;
        if self.peek() == Some(Token::DoubleStar) {
            self.pos += 1;
            // Right-associative, and binds tighter than a unary sign on its left.
            let exponent = self.unary()?;
            return apply(Token::DoubleStar, base, exponent);
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Number, CalcError> {
        match self.advance() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.expr()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(value),
                    Some(token) => Err(CalcError::UnexpectedToken {
                        token: token.to_string(),
                    }),
                    None => Err(CalcError::UnexpectedEnd),
                }
            }
            Some(token) => Err(CalcError::UnexpectedToken {
                token: token.to_string(),
            }),
            None => Err(CalcError::UnexpectedEnd),
        }
    }
}

fn apply(op: Token, lhs: Number, rhs: Number) -> Result<Number, CalcError> {
    match op {
        Token::Slash => {
            let divisor = rhs.as_f64();
            if divisor == 0.0 {
                return Err(CalcError::DivisionByZero);
            }
            Ok(Number::Float(lhs.as_f64() / divisor))
        }
        Token::DoubleSlash => floor_div(lhs, rhs),
        Token::DoubleStar => pow(lhs, rhs),
        _ => match (lhs, rhs) {
            (Number::Int(a), Number::Int(b)) => {
                let result = match op {
                    Token::Plus => a.checked_add(b),
                    Token::Minus => a.checked_sub(b),
                    _ => a.checked_mul(b),
                };
                result.map(Number::Int).ok_or(CalcError::Overflow)
            }
            _ => {
                let (a, b) = (lhs.as_f64(), rhs.as_f64());
                Ok(Number::Float(match op {
                    Token::Plus => a + b,
                    Token::Minus => a - b,
                    _ => a * b,
                }))
            }
        },
    }
}

/// Division rounded toward negative infinity.
fn floor_div(lhs: Number, rhs: Number) -> Result<Number, CalcError> {
    match (lhs, rhs) {
        (Number::Int(_), Number::Int(0)) => Err(CalcError::DivisionByZero),
        (Number::Int(a), Number::Int(b)) => {
            let quotient = a.checked_div(b).ok_or(CalcError::Overflow)?;
            let remainder = a.checked_rem(b).ok_or(CalcError::Overflow)?;
            if remainder != 0 && ((remainder < 0) != (b < 0)) {
                Ok(Number::Int(quotient - 1))
            } else {
                Ok(Number::Int(quotient))
            }
        }
        _ => {
            let divisor = rhs.as_f64();
            if divisor == 0.0 {
                return Err(CalcError::DivisionByZero);
            }
            Ok(Number::Float((lhs.as_f64() / divisor).floor()))
        }
    }
}

fn pow(base: Number, exponent: Number) -> Result<Number, CalcError> {
    if let (Number::Int(a), Number::Int(b)) = (base, exponent)
        && b >= 0
    {
        let b = u32::try_from(b).map_err(|_| CalcError::Overflow)?;
        return a.checked_pow(b).map(Number::Int).ok_or(CalcError::Overflow);
    }

    let (a, b) = (base.as_f64(), exponent.as_f64());
    if a == 0.0 && b < 0.0 {
        return Err(CalcError::DivisionByZero);
    }
    let result = a.powf(b);
    if result.is_nan() {
        Err(CalcError::NotReal)
    } else if result.is_infinite() {
        Err(CalcError::Overflow)
    } else {
        Ok(Number::Float(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calc(expression: &str) -> String {
        match Calculator.call(expression) {
            Ok(out) => out,
            Err(err) => err.to_report_text(),
        }
    }

    #[test]
    fn basic_addition() {
        assert_eq!(calc("2 + 2"), "Result: 4");
    }

    #[test]
    fn basic_multiplication() {
        assert_eq!(calc("5 * 3"), "Result: 15");
    }

    #[test]
    fn parenthesized_expression() {
        assert_eq!(calc("(10 + 5) * 2"), "Result: 30");
    }

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(calc("25 * 4 + 10"), "Result: 110");
        assert_eq!(calc("2 + 3 * 4"), "Result: 14");
        assert_eq!(calc("10 - 4 - 3"), "Result: 3");
        assert_eq!(calc("100 / 10 / 5"), "Result: 2.0");
    }

    #[test]
    fn division_yields_float() {
        assert_eq!(calc("7 / 2"), "Result: 3.5");
        assert_eq!(calc("250 * 15 / 100"), "Result: 37.5");
        assert_eq!(calc("10 / 5"), "Result: 2.0");
    }

    #[test]
    fn float_literals() {
        assert_eq!(calc("0.5 * 4"), "Result: 2.0");
        assert_eq!(calc(".5 + 1."), "Result: 1.5");
    }

    #[test]
    fn unary_signs() {
        assert_eq!(calc("-3 + 5"), "Result: 2");
        assert_eq!(calc("-(2 * 3)"), "Result: -6");
        assert_eq!(calc("+4 - -1"), "Result: 5");
    }

    #[test]
    fn rejects_code_before_evaluating() {
        let err = evaluate("import os").unwrap_err();
        assert_eq!(err, CalcError::DisallowedCharacter { found: 'i' });
        assert_eq!(calc("import os"), "Error: Only basic math operations allowed");
        assert!(calc("2 ** 8; __import__('os')").starts_with("Error: "));
    }

    #[test]
    fn rejects_non_space_whitespace() {
        assert_eq!(calc("1\t+ 1"), "Error: Only basic math operations allowed");
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert_eq!(calc("1 / 0"), "Error: division by zero");
        assert_eq!(calc("1 / (2 - 2.0)"), "Error: division by zero");
    }

    #[test]
    fn malformed_expressions() {
        assert_eq!(calc(""), "Error: unexpected end of expression");
        assert_eq!(calc("(1 + 2"), "Error: unexpected end of expression");
        assert_eq!(calc("1 + 2)"), "Error: unexpected ')'");
        assert_eq!(calc("2 3"), "Error: unexpected '3'");
        assert_eq!(calc("1.2.3"), "Error: invalid number '1.2.3'");
        assert_eq!(calc("2 *** 3"), "Error: unexpected '*'");
        assert_eq!(calc("2 /// 3"), "Error: unexpected '/'");
    }

    #[test]
    fn exponentiation() {
        assert_eq!(calc("2 ** 10"), "Result: 1024");
        assert_eq!(calc("2 ** 3 ** 2"), "Result: 512");
        assert_eq!(calc("-2 ** 2"), "Result: -4");
        assert_eq!(calc("(-2) ** 2"), "Result: 4");
        assert_eq!(calc("2 ** -1"), "Result: 0.5");
        assert_eq!(calc("4 ** 0.5"), "Result: 2.0");
        assert_eq!(calc("3 * 2 ** 2"), "Result: 12");
    }

    #[test]
    fn exponentiation_errors() {
        assert_eq!(calc("2 ** 64"), "Error: integer overflow");
        assert_eq!(calc("0 ** -1"), "Error: division by zero");
        assert_eq!(calc("(-8) ** 0.5"), "Error: result is not a real number");
    }

    #[test]
    fn floor_division() {
        assert_eq!(calc("7 // 2"), "Result: 3");
        assert_eq!(calc("-7 // 2"), "Result: -4");
        assert_eq!(calc("7 // -2"), "Result: -4");
        assert_eq!(calc("-7 // -2"), "Result: 3");
        assert_eq!(calc("6 // 3"), "Result: 2");
        assert_eq!(calc("7.5 // 2"), "Result: 3.0");
        assert_eq!(calc("7 // 0"), "Error: division by zero");
        assert_eq!(calc("7 // 0.0"), "Error: division by zero");
    }

    #[test]
    fn deep_parenthesis_nesting_is_an_error() {
        let expression = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        assert_eq!(calc(&expression), "Error: expression nested too deeply");
    }

    #[test]
    fn long_sign_runs_do_not_recurse() {
        let expression = format!("{}1", "-".repeat(100_000));
        assert_eq!(calc(&expression), "Result: 1");
        let expression = format!("{}1", "-".repeat(100_001));
        assert_eq!(calc(&expression), "Result: -1");
    }

    #[test]
    fn deep_exponent_chain_is_an_error() {
        let expression = format!("{}1", "1 ** ".repeat(100_000));
        assert_eq!(calc(&expression), "Error: expression nested too deeply");
    }

    #[test]
    fn moderate_nesting_is_fine() {
        let expression = format!("{}1{}", "(".repeat(150), ")".repeat(150));
        assert_eq!(calc(&expression), "Result: 1");
    }

    #[test]
    fn large_and_small_floats_use_signed_exponents() {
        assert_eq!(calc("10000000000000000.0 * 1"), "Result: 1e+16");
        assert_eq!(calc("0.00001 * 1"), "Result: 1e-05");
        assert_eq!(calc("1234567890.0 * 10"), "Result: 12345678900.0");
        assert_eq!(calc("0.0001 * 1"), "Result: 0.0001");
    }

    #[test]
    fn leading_zeros_are_rejected() {
        assert_eq!(calc("007"), "Error: invalid number '007'");
        assert_eq!(calc("1 + 01"), "Error: invalid number '01'");
        assert_eq!(calc("000 + 5"), "Result: 5");
        assert_eq!(calc("007.5 * 2"), "Result: 15.0");
    }

    #[test]
    fn integer_overflow_is_an_error() {
        assert_eq!(calc("9223372036854775807 + 1"), "Error: integer overflow");
        assert_eq!(calc("99999999999999999999"), "Error: integer overflow");
    }

    #[test]
    fn disallowed_input_is_invalid_input_error() {
        let err = Calculator.call("rm -rf /").unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput { .. }));
        let err = Calculator.call("1 / 0").unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed { .. }));
    }
}
