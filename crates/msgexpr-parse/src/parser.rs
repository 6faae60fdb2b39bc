//! Recursive-descent parser for the message-expression grammar.
//!
//! Precedence, low to high: `=`/`<>` | `<,<=,>,>=` | `&` | `+,-` |
//! `*,/` | unary `-` | `^` (right-assoc) | primary. Unary minus binds
//! *looser* than `^`, so `-2^2` parses as `-(2^2)`, not `(-2)^2` — one
//! tier is dedicated to it between `parse_mul` and `parse_power` rather
//! than folded into a generic precedence-climbing table.

use std::str::FromStr;

use msgexpr_common::Value;
use rust_decimal::Decimal;

use crate::tokenizer::{Token, TokenKind, Tokenizer};
use crate::types::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BinOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Concat,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinOp {
    fn from_token(op: &str) -> Self {
        match op {
            "=" => BinOp::Eq,
            "<>" => BinOp::Ne,
            "<" => BinOp::Lt,
            "<=" => BinOp::Le,
            ">" => BinOp::Gt,
            ">=" => BinOp::Ge,
            "&" => BinOp::Concat,
            "+" => BinOp::Add,
            "-" => BinOp::Sub,
            "*" => BinOp::Mul,
            "/" => BinOp::Div,
            "^" => BinOp::Pow,
            other => unreachable!("unexpected operator token '{other}'"),
        }
    }
}

/// An identifier chain as written in source, e.g. `contact.name.first`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Path {
    pub segments: Vec<String>,
    pub original: String,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Expr {
    Literal(Value),
    Ident(Path),
    Call { name: String, args: Vec<Expr> },
    Unary { expr: Box<Expr> },
    Binary { op: BinOp, left: Box<Expr>, right: Box<Expr> },
}

/// Parse a complete expression, erroring if trailing tokens remain.
pub fn parse(src: &str) -> Result<Expr, ParseError> {
    let tokens = Tokenizer::new(src).tokenize()?;
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_expression()?;
    if let Some(tok) = parser.peek() {
        return Err(ParseError {
            message: format!("Unexpected token '{}' after expression", tok.text),
            pos: tok.start,
        });
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, position: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn peek_op(&self) -> Option<&str> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Op => Some(t.text.as_str()),
            _ => None,
        }
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.position).cloned();
        if tok.is_some() {
            self.position += 1;
        }
        tok
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, ParseError> {
        match self.advance() {
            Some(tok) if tok.kind == kind => Ok(tok),
            Some(tok) => Err(ParseError {
                message: format!("Expected {what}, found '{}'", tok.text),
                pos: tok.start,
            }),
            None => Err(ParseError {
                message: format!("Expected {what}, found end of expression"),
                pos: self.end_pos(),
            }),
        }
    }

    fn end_pos(&self) -> usize {
        self.tokens.last().map(|t| t.end).unwrap_or(0)
    }

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_eq()
    }

    fn parse_eq(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_cmp()?;
        while matches!(self.peek_op(), Some("=") | Some("<>")) {
            let op = BinOp::from_token(self.advance().unwrap().text.as_str());
            let right = self.parse_cmp()?;
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_cmp(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_concat()?;
        while matches!(self.peek_op(), Some("<") | Some("<=") | Some(">") | Some(">=")) {
            let op = BinOp::from_token(self.advance().unwrap().text.as_str());
            let right = self.parse_concat()?;
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_concat(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_add()?;
        while matches!(self.peek_op(), Some("&")) {
            self.advance();
            let right = self.parse_add()?;
            left = Expr::Binary { op: BinOp::Concat, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_add(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_mul()?;
        while matches!(self.peek_op(), Some("+") | Some("-")) {
            let op = BinOp::from_token(self.advance().unwrap().text.as_str());
            let right = self.parse_mul()?;
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_mul(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        while matches!(self.peek_op(), Some("*") | Some("/")) {
            let op = BinOp::from_token(self.advance().unwrap().text.as_str());
            let right = self.parse_unary()?;
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    /// Unary minus binds looser than `^`: it recurses into itself (to
    /// absorb repeated signs like `--x`) and otherwise falls through
    /// to `parse_power`, so `^` always captures tighter than a
    /// leading `-`.
    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if matches!(self.peek_op(), Some("-")) {
            self.advance();
            let inner = self.parse_unary()?;
            return Ok(Expr::Unary { expr: Box::new(inner) });
        }
        self.parse_power()
    }

    /// `^` is right-associative: the right-hand operand may itself
    /// start with a unary minus (`2^-1`), so it's parsed at the
    /// `parse_unary` tier, not `parse_power`.
    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_primary()?;
        if matches!(self.peek_op(), Some("^")) {
            self.advance();
            let right = self.parse_unary()?;
            return Ok(Expr::Binary { op: BinOp::Pow, left: Box::new(left), right: Box::new(right) });
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let tok = self.advance().ok_or_else(|| ParseError {
            message: "Unexpected end of expression".into(),
            pos: self.end_pos(),
        })?;
        match tok.kind {
            TokenKind::Number => {
                let dec = Decimal::from_str(&tok.text).map_err(|_| ParseError {
                    message: format!("Invalid number literal '{}'", tok.text),
                    pos: tok.start,
                })?;
                Ok(Expr::Literal(Value::Dec(dec)))
            }
            TokenKind::Str => Ok(Expr::Literal(Value::Str(tok.text))),
            TokenKind::Bool => Ok(Expr::Literal(Value::Bool(tok.text.eq_ignore_ascii_case("true")))),
            TokenKind::Ident => {
                let segments = tok.text.split('.').map(|s| s.to_string()).collect();
                Ok(Expr::Ident(Path { segments, original: tok.text }))
            }
            TokenKind::Func => {
                let name = tok.text;
                self.expect(TokenKind::LParen, "'(' after function name")?;
                let mut args = Vec::new();
                if !matches!(self.peek(), Some(t) if t.kind == TokenKind::RParen) {
                    args.push(self.parse_expression()?);
                    while matches!(self.peek(), Some(t) if t.kind == TokenKind::Comma) {
                        self.advance();
                        args.push(self.parse_expression()?);
                    }
                }
                self.expect(TokenKind::RParen, "')' to close function call")?;
                Ok(Expr::Call { name, args })
            }
            TokenKind::LParen => {
                let inner = self.parse_expression()?;
                self.expect(TokenKind::RParen, "')' to close parenthesized expression")?;
                Ok(inner)
            }
            other => Err(ParseError {
                message: format!("Unexpected token '{}' ({other})", tok.text),
                pos: tok.start,
            }),
        }
    }
}
