use thiserror::Error;

use super::{Arg, Filter, Predicate};

#[derive(Error, Debug, Clone, PartialEq)]
#[error("parse error at offset {offset}: {reason}")]
pub struct ParseError {
    pub offset: usize,
    pub reason: String,
}

/// Turns the raw predicate and filter expressions of a route group into their structured form.
pub trait ExpressionParser {
    fn parse_predicates(&self, raw: &str) -> Result<Vec<Predicate>, ParseError>;
    fn parse_filters(&self, raw: &str) -> Result<Vec<Filter>, ParseError>;
}

/// Parser for the proxy's route expression syntax:
/// `Path("/foo") && Header("X-Id", /[0-9]+/)` for predicates and `setPath("/") -> status(418)` for filters.
#[derive(Clone, Copy, Debug, Default)]
pub struct RouteExpressionParser;

impl ExpressionParser for RouteExpressionParser {
    fn parse_predicates(&self, raw: &str) -> Result<Vec<Predicate>, ParseError> {
        let mut cursor = Cursor::new(raw);
        if cursor.eat("*") {
            return if cursor.at_end() { Ok(vec![]) } else { cursor.error("unexpected input after '*'") };
        }
        let calls = cursor.calls("&&")?;
        Ok(calls.into_iter().map(|(name, args)| Predicate { name, args }).collect())
    }

    fn parse_filters(&self, raw: &str) -> Result<Vec<Filter>, ParseError> {
        let calls = Cursor::new(raw).calls("->")?;
        Ok(calls.into_iter().map(|(name, args)| Filter { name, args }).collect())
    }
}

struct Cursor<'a> {
    input: &'a str,
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, offset: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.offset..]
    }

    fn error<T>(&self, reason: impl Into<String>) -> Result<T, ParseError> {
        Err(ParseError { offset: self.offset, reason: reason.into() })
    }

    fn skip_whitespace(&mut self) {
        let trimmed = self.rest().trim_start();
        self.offset = self.input.len() - trimmed.len();
    }

    fn at_end(&mut self) -> bool {
        self.skip_whitespace();
        self.rest().is_empty()
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_whitespace();
        if self.rest().starts_with(token) {
            self.offset += token.len();
            true
        } else {
            false
        }
    }

    fn calls(&mut self, separator: &str) -> Result<Vec<(String, Vec<Arg>)>, ParseError> {
        let mut calls = vec![];
        if self.at_end() {
            return Ok(calls);
        }
        loop {
            calls.push(self.call()?);
            if self.at_end() {
                return Ok(calls);
            }
            if !self.eat(separator) {
                return self.error(format!("expected '{separator}'"));
            }
        }
    }

    fn call(&mut self) -> Result<(String, Vec<Arg>), ParseError> {
        self.skip_whitespace();
        let name = self.identifier()?;
        if !self.eat("(") {
            return self.error("expected '('");
        }

        let mut args = vec![];
        if self.eat(")") {
            return Ok((name, args));
        }
        loop {
            args.push(self.arg()?);
            if self.eat(")") {
                return Ok((name, args));
            }
            if !self.eat(",") {
                return self.error("expected ',' or ')'");
            }
        }
    }

    fn identifier(&mut self) -> Result<String, ParseError> {
        let rest = self.rest();
        let len = rest
            .char_indices()
            .find(|(i, c)| !(c.is_ascii_alphabetic() || *c == '_' || (*i > 0 && c.is_ascii_digit())))
            .map_or(rest.len(), |(i, _)| i);
        if len == 0 {
            return self.error("expected identifier");
        }
        self.offset += len;
        Ok(rest[..len].to_owned())
    }

    fn arg(&mut self) -> Result<Arg, ParseError> {
        self.skip_whitespace();
        match self.rest().chars().next() {
            Some(delimiter @ ('"' | '`' | '/')) => self.quoted(delimiter).map(Arg::String),
            Some(c) if c == '-' || c == '.' || c.is_ascii_digit() => self.number().map(Arg::Number),
            _ => self.error("expected argument"),
        }
    }

    fn quoted(&mut self, delimiter: char) -> Result<String, ParseError> {
        let start = self.offset;
        let body = &self.rest()[delimiter.len_utf8()..];
        let mut value = String::new();
        let mut chars = body.char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                c if c == delimiter => {
                    self.offset = start + delimiter.len_utf8() + i + c.len_utf8();
                    return Ok(value);
                },
                // backtick strings are raw
                '\\' if delimiter != '`' => match chars.next() {
                    Some((_, escaped)) if delimiter == '/' => {
                        if escaped != '/' {
                            value.push('\\');
                        }
                        value.push(escaped);
                    },
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, escaped)) => value.push(escaped),
                    None => break,
                },
                c => value.push(c),
            }
        }
        self.error("unterminated string")
    }

    fn number(&mut self) -> Result<f64, ParseError> {
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E')))
            .unwrap_or(rest.len());
        match rest[..len].parse::<f64>() {
            Ok(value) => {
                self.offset += len;
                Ok(value)
            },
            Err(_) => self.error(format!("invalid number '{}'", &rest[..len])),
        }
    }
}
