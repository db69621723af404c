//! Tokenizer and recursive-descent parser for the requirement language.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! or      := and ('|' and)*
//! and     := unary ('&' unary)*
//! unary   := '-' unary | postfix
//! postfix := primary ('*' INT)?
//! primary := '(' or ')' | NAME | QUOTED
//! ```

use super::Requirement;
use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Name(String),
    Quoted(String),
    Int(u32),
    Or,
    And,
    Minus,
    Star,
    LParen,
    RParen,
}

impl Tok {
    fn describe(&self) -> String {
        match self {
            Tok::Name(n) => format!("name '{}'", n),
            Tok::Quoted(s) => format!("string '{}'", s),
            Tok::Int(n) => format!("number {}", n),
            Tok::Or => "'|'".into(),
            Tok::And => "'&'".into(),
            Tok::Minus => "'-'".into(),
            Tok::Star => "'*'".into(),
            Tok::LParen => "'('".into(),
            Tok::RParen => "')'".into(),
        }
    }
}

/// Parse requirement text into a requirement tree.
pub(super) fn parse(text: &str) -> Result<Requirement, ParseError> {
    let tokens = tokenize(text)?;
    let mut parser = Parser {
        text,
        tokens,
        pos: 0,
    };
    let req = parser.parse_or()?;
    if let Some((tok, at)) = parser.tokens.get(parser.pos) {
        return Err(parser.error(format!("unexpected {} at offset {}", tok.describe(), at)));
    }
    Ok(req)
}

fn tokenize(text: &str) -> Result<Vec<(Tok, usize)>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(at, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '|' | '&' | '-' | '*' | '(' | ')' => {
                chars.next();
                let tok = match c {
                    '|' => Tok::Or,
                    '&' => Tok::And,
                    '-' => Tok::Minus,
                    '*' => Tok::Star,
                    '(' => Tok::LParen,
                    _ => Tok::RParen,
                };
                tokens.push((tok, at));
            }
            '\'' | '"' => {
                chars.next();
                let quote = c;
                let mut value = String::new();
                let mut closed = false;
                while let Some((_, c)) = chars.next() {
                    match c {
                        c if c == quote => {
                            closed = true;
                            break;
                        }
                        '\\' => match chars.next() {
                            Some((_, 'n')) => value.push('\n'),
                            Some((_, 't')) => value.push('\t'),
                            Some((_, escaped)) => value.push(escaped),
                            None => break,
                        },
                        c => value.push(c),
                    }
                }
                if !closed {
                    return Err(ParseError::new(
                        text,
                        format!("unterminated string starting at offset {}", at),
                    ));
                }
                tokens.push((Tok::Quoted(value), at));
            }
            c if c.is_ascii_digit() => {
                let mut digits = String::new();
                while let Some(&(_, d)) = chars.peek() {
                    if !d.is_ascii_digit() {
                        break;
                    }
                    digits.push(d);
                    chars.next();
                }
                let n = digits.parse::<u32>().map_err(|_| {
                    ParseError::new(text, format!("token count {} is too large", digits))
                })?;
                tokens.push((Tok::Int(n), at));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(&(_, d)) = chars.peek() {
                    if !(d.is_alphanumeric() || d == '_') {
                        break;
                    }
                    name.push(d);
                    chars.next();
                }
                tokens.push((Tok::Name(name), at));
            }
            other => {
                return Err(ParseError::new(
                    text,
                    format!("unexpected character '{}' at offset {}", other, at),
                ));
            }
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    text: &'a str,
    tokens: Vec<(Tok, usize)>,
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, reason: impl Into<String>) -> ParseError {
        ParseError::new(self.text, reason)
    }

    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos).map(|(tok, _)| tok)
    }

    fn advance(&mut self) -> Option<(Tok, usize)> {
        let next = self.tokens.get(self.pos).cloned();
        if next.is_some() {
            self.pos += 1;
        }
        next
    }

    fn eat(&mut self, expected: &Tok) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<Requirement, ParseError> {
        let first = self.parse_and()?;
        if self.peek() != Some(&Tok::Or) {
            return Ok(first);
        }
        let mut subs = Vec::new();
        push_flat_any(&mut subs, first);
        while self.eat(&Tok::Or) {
            let next = self.parse_and()?;
            push_flat_any(&mut subs, next);
        }
        Ok(Requirement::Any { subs })
    }

    fn parse_and(&mut self) -> Result<Requirement, ParseError> {
        let first = self.parse_unary()?;
        if self.peek() != Some(&Tok::And) {
            return Ok(first);
        }
        let mut subs = Vec::new();
        push_flat_all(&mut subs, first);
        while self.eat(&Tok::And) {
            let next = self.parse_unary()?;
            push_flat_all(&mut subs, next);
        }
        Ok(Requirement::All { subs })
    }

    fn parse_unary(&mut self) -> Result<Requirement, ParseError> {
        if self.eat(&Tok::Minus) {
            let sub = self.parse_unary()?;
            return Ok(Requirement::not(sub));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Requirement, ParseError> {
        let base = self.parse_primary()?;
        if !self.eat(&Tok::Star) {
            return Ok(base);
        }

        let count = match self.advance() {
            Some((Tok::Int(n), _)) => n,
            Some((tok, at)) => {
                return Err(self.error(format!(
                    "expected a token count after '*' but found {} at offset {}",
                    tok.describe(),
                    at
                )))
            }
            None => return Err(self.error("expected a token count after '*'")),
        };

        match base {
            Requirement::Power { power } => Ok(Requirement::tokens(power, count)),
            Requirement::Not { sub } => match *sub {
                Requirement::Power { power } => {
                    Ok(Requirement::not(Requirement::tokens(power, count)))
                }
                other => Err(self.error(format!(
                    "invalid token name: {} cannot be counted",
                    other.kind_name()
                ))),
            },
            other => Err(self.error(format!(
                "invalid token name: {} cannot be counted",
                other.kind_name()
            ))),
        }
    }

    fn parse_primary(&mut self) -> Result<Requirement, ParseError> {
        match self.advance() {
            Some((Tok::LParen, at)) => {
                let inner = self.parse_or()?;
                if !self.eat(&Tok::RParen) {
                    return Err(self.error(format!("unclosed '(' at offset {}", at)));
                }
                Ok(inner)
            }
            Some((Tok::Name(name), _)) => Ok(match name.as_str() {
                "X" => Requirement::Impossible,
                "O" => Requirement::Nothing,
                _ => Requirement::power(name),
            }),
            Some((Tok::Quoted(name), _)) => Ok(Requirement::power(name)),
            Some((tok, at)) => Err(self.error(format!(
                "expected a power name but found {} at offset {}",
                tok.describe(),
                at
            ))),
            None => Err(self.error("unexpected end of input")),
        }
    }
}

fn push_flat_any(subs: &mut Vec<Requirement>, req: Requirement) {
    match req {
        Requirement::Any { subs: inner } => subs.extend(inner),
        other => subs.push(other),
    }
}

fn push_flat_all(subs: &mut Vec<Requirement>, req: Requirement) {
    match req {
        Requirement::All { subs: inner } => subs.extend(inner),
        other => subs.push(other),
    }
}
