//! Boolean expression evaluation against a flat variable context.
//!
//! Supports identifier lookup, string/number/bool literals, comparison
//! operators, and boolean combinators. Branch selection and validation logic
//! depend on the fail-closed contract: any parse or evaluation error yields
//! `false` rather than propagating.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error, PartialEq)]
pub enum ExprError {
    #[error("unexpected character `{0}`")]
    UnexpectedChar(char),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("invalid number literal `{0}`")]
    InvalidNumber(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unexpected token")]
    UnexpectedToken,
    #[error("expected a boolean, got {0}")]
    NotBoolean(&'static str),
    #[error("cannot order {0} and {1}")]
    Incomparable(&'static str, &'static str),
}

/// Fail-closed entry point used by branch resolution.
pub fn evaluate(expression: &str, context: &HashMap<String, Value>) -> bool {
    match try_evaluate(expression, context) {
        Ok(result) => result,
        Err(err) => {
            trace!(expression, error = %err, "expression did not evaluate, treating as false");
            false
        }
    }
}

/// Error-reporting variant for diagnostics and tests.
pub fn try_evaluate(
    expression: &str,
    context: &HashMap<String, Value>,
) -> Result<bool, ExprError> {
    let tokens = lex(expression)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        context,
    };
    let result = parser.parse_or()?;
    if parser.pos != parser.tokens.len() {
        return Err(ExprError::UnexpectedToken);
    }
    match result {
        Operand::Bool(b) => Ok(b),
        other => Err(ExprError::NotBoolean(other.type_name())),
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Num(f64),
    Bool(bool),
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,
    LParen,
    RParen,
}

#[derive(Clone, Debug, PartialEq)]
enum Operand {
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
}

impl Operand {
    fn type_name(&self) -> &'static str {
        match self {
            Operand::Str(_) => "string",
            Operand::Num(_) => "number",
            Operand::Bool(_) => "bool",
            Operand::Null => "null",
        }
    }

    fn from_value(value: &Value) -> Operand {
        match value {
            Value::String(s) => Operand::Str(s.clone()),
            Value::Number(n) => Operand::Num(n.as_f64().unwrap_or(f64::NAN)),
            Value::Bool(b) => Operand::Bool(*b),
            // Structured values are not comparable here.
            Value::Null | Value::Array(_) | Value::Object(_) => Operand::Null,
        }
    }

    fn as_bool(&self) -> Result<bool, ExprError> {
        match self {
            Operand::Bool(b) => Ok(*b),
            other => Err(ExprError::NotBoolean(other.type_name())),
        }
    }
}

fn lex(input: &str) -> Result<Vec<Token>, ExprError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\r' | '\n' => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Eq);
                    i += 2;
                } else {
                    return Err(ExprError::UnexpectedChar('='));
                }
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Ne);
                    i += 2;
                } else {
                    tokens.push(Token::Not);
                    i += 1;
                }
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Le);
                    i += 2;
                } else {
                    tokens.push(Token::Lt);
                    i += 1;
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Ge);
                    i += 2;
                } else {
                    tokens.push(Token::Gt);
                    i += 1;
                }
            }
            '&' => {
                if chars.get(i + 1) == Some(&'&') {
                    tokens.push(Token::And);
                    i += 2;
                } else {
                    return Err(ExprError::UnexpectedChar('&'));
                }
            }
            '|' => {
                if chars.get(i + 1) == Some(&'|') {
                    tokens.push(Token::Or);
                    i += 2;
                } else {
                    return Err(ExprError::UnexpectedChar('|'));
                }
            }
            '\'' | '"' => {
                let quote = c;
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && chars[end] != quote {
                    end += 1;
                }
                if end == chars.len() {
                    return Err(ExprError::UnterminatedString);
                }
                tokens.push(Token::Str(chars[start..end].iter().collect()));
                i = end + 1;
            }
            '-' | '0'..='9' => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let raw: String = chars[start..i].iter().collect();
                let num = raw
                    .parse::<f64>()
                    .map_err(|_| ExprError::InvalidNumber(raw))?;
                tokens.push(Token::Num(num));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                match word.as_str() {
                    "true" => tokens.push(Token::Bool(true)),
                    "false" => tokens.push(Token::Bool(false)),
                    _ => tokens.push(Token::Ident(word)),
                }
            }
            other => return Err(ExprError::UnexpectedChar(other)),
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    context: &'a HashMap<String, Value>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Result<Token, ExprError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(ExprError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(token)
    }

    fn parse_or(&mut self) -> Result<Operand, ExprError> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let right = self.parse_and()?;
            left = Operand::Bool(left.as_bool()? || right.as_bool()?);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Operand, ExprError> {
        let mut left = self.parse_comparison()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let right = self.parse_comparison()?;
            left = Operand::Bool(left.as_bool()? && right.as_bool()?);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Operand, ExprError> {
        let left = self.parse_unary()?;
        let op = match self.peek() {
            Some(Token::Eq) => Token::Eq,
            Some(Token::Ne) => Token::Ne,
            Some(Token::Lt) => Token::Lt,
            Some(Token::Le) => Token::Le,
            Some(Token::Gt) => Token::Gt,
            Some(Token::Ge) => Token::Ge,
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.parse_unary()?;
        compare(&op, &left, &right)
    }

    fn parse_unary(&mut self) -> Result<Operand, ExprError> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            let inner = self.parse_unary()?;
            return Ok(Operand::Bool(!inner.as_bool()?));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Operand, ExprError> {
        match self.advance()? {
            Token::LParen => {
                let inner = self.parse_or()?;
                match self.advance()? {
                    Token::RParen => Ok(inner),
                    _ => Err(ExprError::UnexpectedToken),
                }
            }
            Token::Str(s) => Ok(Operand::Str(s)),
            Token::Num(n) => Ok(Operand::Num(n)),
            Token::Bool(b) => Ok(Operand::Bool(b)),
            Token::Ident(name) => Ok(self
                .context
                .get(&name)
                .map(Operand::from_value)
                .unwrap_or(Operand::Null)),
            _ => Err(ExprError::UnexpectedToken),
        }
    }
}

fn compare(op: &Token, left: &Operand, right: &Operand) -> Result<Operand, ExprError> {
    match op {
        Token::Eq | Token::Ne => {
            let equal = match (left, right) {
                (Operand::Num(a), Operand::Num(b)) => a == b,
                (Operand::Str(a), Operand::Str(b)) => a == b,
                (Operand::Bool(a), Operand::Bool(b)) => a == b,
                (Operand::Null, Operand::Null) => true,
                _ => false,
            };
            Ok(Operand::Bool(if *op == Token::Ne { !equal } else { equal }))
        }
        _ => {
            let ordering = match (left, right) {
                (Operand::Num(a), Operand::Num(b)) => a
                    .partial_cmp(b)
                    .ok_or(ExprError::Incomparable("number", "number"))?,
                (Operand::Str(a), Operand::Str(b)) => a.cmp(b),
                _ => {
                    return Err(ExprError::Incomparable(
                        left.type_name(),
                        right.type_name(),
                    ))
                }
            };
            let holds = match op {
                Token::Lt => ordering.is_lt(),
                Token::Le => ordering.is_le(),
                Token::Gt => ordering.is_gt(),
                Token::Ge => ordering.is_ge(),
                _ => unreachable!("comparison operators only"),
            };
            Ok(Operand::Bool(holds))
        }
    }
}
