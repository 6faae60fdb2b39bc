//! Lexer for message expressions.
//!
//! Produces a flat token stream: decimal number literals, double-quoted
//! string literals (`""` escapes an embedded quote), bare `true`/`false`,
//! dotted identifier chains (`contact.name`), function-call names (an
//! identifier immediately followed by `(`), and the operator/punctuation
//! set from the grammar.

use std::fmt;

use crate::types::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Number,
    Str,
    Bool,
    Ident,
    Func,
    LParen,
    RParen,
    Comma,
    Op,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

impl Token {
    fn new(kind: TokenKind, text: String, start: usize, end: usize) -> Self {
        Token {
            kind,
            text,
            start,
            end,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} {:?}>", self.kind, self.text)
    }
}

/// Binding tier for an infix operator, low to high. Unary `-` sits
/// between `*`/`/` and `^` in the grammar; the parser threads it
/// through explicitly rather than folding it into this table.
pub fn op_precedence(op: &str) -> Option<(u8, Associativity)> {
    use Associativity::*;
    Some(match op {
        "=" | "<>" => (1, Left),
        "<" | "<=" | ">" | ">=" => (2, Left),
        "&" => (3, Left),
        "+" | "-" => (4, Left),
        "*" | "/" => (5, Left),
        "^" => (7, Right),
        _ => return None,
    })
}

pub struct Tokenizer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(src: &'a str) -> Self {
        Tokenizer {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut out = Vec::new();
        loop {
            self.skip_whitespace();
            if self.pos >= self.bytes.len() {
                break;
            }
            out.push(self.next_token()?);
        }
        Ok(out)
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.bytes.len() && (self.bytes[self.pos] as char).is_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        let start = self.pos;
        let c = self.peek().unwrap();
        match c {
            b'(' => {
                self.pos += 1;
                Ok(Token::new(TokenKind::LParen, "(".into(), start, self.pos))
            }
            b')' => {
                self.pos += 1;
                Ok(Token::new(TokenKind::RParen, ")".into(), start, self.pos))
            }
            b',' => {
                self.pos += 1;
                Ok(Token::new(TokenKind::Comma, ",".into(), start, self.pos))
            }
            b'"' => self.read_string(),
            b'0'..=b'9' => Ok(self.read_number()),
            b'<' => {
                self.pos += 1;
                if self.peek() == Some(b'=') {
                    self.pos += 1;
                    Ok(Token::new(TokenKind::Op, "<=".into(), start, self.pos))
                } else if self.peek() == Some(b'>') {
                    self.pos += 1;
                    Ok(Token::new(TokenKind::Op, "<>".into(), start, self.pos))
                } else {
                    Ok(Token::new(TokenKind::Op, "<".into(), start, self.pos))
                }
            }
            b'>' => {
                self.pos += 1;
                if self.peek() == Some(b'=') {
                    self.pos += 1;
                    Ok(Token::new(TokenKind::Op, ">=".into(), start, self.pos))
                } else {
                    Ok(Token::new(TokenKind::Op, ">".into(), start, self.pos))
                }
            }
            b'=' | b'&' | b'+' | b'-' | b'*' | b'/' | b'^' => {
                self.pos += 1;
                Ok(Token::new(
                    TokenKind::Op,
                    (c as char).to_string(),
                    start,
                    self.pos,
                ))
            }
            _ if c.is_ascii_alphabetic() || c == b'_' => Ok(self.read_ident_or_keyword()),
            _ => Err(ParseError {
                message: (c as char).to_string(),
                pos: start,
            }),
        }
    }

    fn read_string(&mut self) -> Result<Token, ParseError> {
        let start = self.pos;
        self.pos += 1;
        let mut value = String::new();
        loop {
            match self.peek() {
                None => {
                    return Err(ParseError {
                        message: "Unterminated string literal".into(),
                        pos: start,
                    });
                }
                Some(b'"') => {
                    self.pos += 1;
                    if self.peek() == Some(b'"') {
                        value.push('"');
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
                Some(_) => {
                    let rest = &self.src[self.pos..];
                    let ch = rest.chars().next().expect("peek guarantees a char");
                    value.push(ch);
                    self.pos += ch.len_utf8();
                }
            }
        }
        Ok(Token::new(TokenKind::Str, value, start, self.pos))
    }

    fn read_number(&mut self) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        if self.peek() == Some(b'.') && matches!(self.bytes.get(self.pos + 1), Some(b'0'..=b'9')) {
            self.pos += 1;
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
        }
        Token::new(
            TokenKind::Number,
            self.src[start..self.pos].to_string(),
            start,
            self.pos,
        )
    }

    fn read_ident_or_keyword(&mut self) -> Token {
        let start = self.pos;
        self.pos += 1;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == b'_' || (c == b'.' && self.is_path_dot()) {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = self.src[start..self.pos].to_string();
        let mut lookahead = self.pos;
        while matches!(self.bytes.get(lookahead), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            lookahead += 1;
        }
        if self.bytes.get(lookahead) == Some(&b'(') {
            Token::new(TokenKind::Func, text, start, self.pos)
        } else if text.eq_ignore_ascii_case("true") || text.eq_ignore_ascii_case("false") {
            Token::new(TokenKind::Bool, text, start, self.pos)
        } else {
            Token::new(TokenKind::Ident, text, start, self.pos)
        }
    }

    /// A `.` only extends an identifier chain when immediately
    /// followed by another identifier-start character; a trailing
    /// dot (or `1.5`-style decimal inside a word boundary) is left
    /// for the caller to reject.
    fn is_path_dot(&self) -> bool {
        matches!(self.bytes.get(self.pos + 1), Some(c) if c.is_ascii_alphabetic() || *c == b'_')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Tokenizer::new(src)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn tokenizes_identifier_chain() {
        let toks = Tokenizer::new("contact.name.first").tokenize().unwrap();
        assert_eq!(toks.len(), 1);
        assert_eq!(toks[0].kind, TokenKind::Ident);
        assert_eq!(toks[0].text, "contact.name.first");
    }

    #[test]
    fn distinguishes_function_from_identifier() {
        let toks = Tokenizer::new("UPPER(x)").tokenize().unwrap();
        assert_eq!(toks[0].kind, TokenKind::Func);
        assert_eq!(toks[0].text, "UPPER");
    }

    #[test]
    fn parses_string_with_escaped_quote() {
        let toks = Tokenizer::new(r#""say ""hi""""#).tokenize().unwrap();
        assert_eq!(toks[0].kind, TokenKind::Str);
        assert_eq!(toks[0].text, r#"say "hi""#);
    }

    #[test]
    fn case_insensitive_boolean_keyword() {
        let toks = Tokenizer::new("TrUe").tokenize().unwrap();
        assert_eq!(toks[0].kind, TokenKind::Bool);
    }

    #[test]
    fn comparison_operators_are_maximal_munch() {
        assert_eq!(kinds("a<=b"), vec![TokenKind::Ident, TokenKind::Op, TokenKind::Ident]);
        assert_eq!(
            Tokenizer::new("<>").tokenize().unwrap()[0].text,
            "<>"
        );
    }

    #[test]
    fn rejects_unterminated_string() {
        assert!(Tokenizer::new("\"abc").tokenize().is_err());
    }
}
