//! Unit string parser.
//!
//! Handles the syntactic variations found in precipitation metadata:
//!
//! - Exponents: `m^-2`, `m**-2`, `m-2`
//! - Multiplication: `kg m-2`, `kg*m-2`, `kg·m-2`
//! - Division: `mm/day`, `mm day-1`, `mm per day`
//!
//! # Grammar
//!
//! ```text
//! unit_expr  = term (('/' | 'per') term)*
//! term       = factor (('*' | '·' | ' ') factor)*
//! factor     = symbol ('^' | '**')? exponent?
//! symbol     = [a-zA-Z_]+
//! exponent   = '-'? [0-9]+
//! ```

use std::collections::BTreeMap;
use std::fmt;

/// Error type for unit parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Empty unit string.
    EmptyUnit,
    /// Invalid exponent format.
    InvalidExponent(String),
    /// Unexpected character in unit string.
    UnexpectedChar(char),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyUnit => write!(f, "empty unit string"),
            Self::InvalidExponent(e) => write!(f, "invalid exponent: '{e}'"),
            Self::UnexpectedChar(c) => write!(f, "unexpected character: '{c}'"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parses a unit expression into symbols with integer exponents.
///
/// `kg m-2 s-1` becomes `{kg: 1, m: -2, s: -1}`. Repeated symbols are summed.
pub fn parse_components(input: &str) -> Result<BTreeMap<String, i32>, ParseError> {
    let mut parser = Parser {
        chars: input.chars().collect(),
        pos: 0,
    };
    parser.skip_whitespace();
    if parser.peek().is_none() {
        return Err(ParseError::EmptyUnit);
    }
    let components = parser.parse_expression()?;
    Ok(components.into_iter().filter(|(_, e)| *e != 0).collect())
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn parse_expression(&mut self) -> Result<BTreeMap<String, i32>, ParseError> {
        let mut result = self.parse_term()?;
        loop {
            self.skip_whitespace();
            let divide = if self.peek() == Some('/') {
                self.advance();
                true
            } else if self.check_keyword("per") {
                self.pos += 3;
                true
            } else {
                false
            };
            if !divide {
                break;
            }
            for (symbol, exponent) in self.parse_term()? {
                *result.entry(symbol).or_insert(0) -= exponent;
            }
        }
        match self.peek() {
            Some(c) => Err(ParseError::UnexpectedChar(c)),
            None => Ok(result),
        }
    }

    fn parse_term(&mut self) -> Result<BTreeMap<String, i32>, ParseError> {
        let mut result = BTreeMap::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('*') | Some('·') if !self.check_operator("**") => {
                    self.advance();
                    continue;
                }
                Some(c) if c.is_ascii_alphabetic() && !self.check_keyword("per") => {
                    let (symbol, exponent) = self.parse_factor()?;
                    *result.entry(symbol).or_insert(0) += exponent;
                }
                Some(c) if c.is_ascii_alphabetic() || c == '/' => break,
                Some(c) if result.is_empty() => return Err(ParseError::UnexpectedChar(c)),
                _ => break,
            }
        }
        if result.is_empty() {
            return match self.peek() {
                Some(c) => Err(ParseError::UnexpectedChar(c)),
                None => Err(ParseError::EmptyUnit),
            };
        }
        Ok(result)
    }

    fn parse_factor(&mut self) -> Result<(String, i32), ParseError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphabetic() || c == '_') {
            self.advance();
        }
        let symbol: String = self.chars[start..self.pos].iter().collect();

        if self.peek() == Some('^') {
            self.advance();
            return Ok((symbol, self.parse_exponent()?));
        }
        if self.check_operator("**") {
            self.pos += 2;
            return Ok((symbol, self.parse_exponent()?));
        }
        if matches!(self.peek(), Some(c) if c == '-' || c.is_ascii_digit()) {
            return Ok((symbol, self.parse_exponent()?));
        }
        Ok((symbol, 1))
    }

    fn parse_exponent(&mut self) -> Result<i32, ParseError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.advance();
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<i32>()
            .map_err(|_| ParseError::InvalidExponent(text))
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.advance();
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn check_operator(&self, op: &str) -> bool {
        op.chars()
            .enumerate()
            .all(|(i, c)| self.chars.get(self.pos + i) == Some(&c))
    }

    fn check_keyword(&self, keyword: &str) -> bool {
        self.check_operator(keyword)
            && !matches!(
                self.chars.get(self.pos + keyword.len()),
                Some(c) if c.is_ascii_alphanumeric() || *c == '_'
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn components(pairs: &[(&str, i32)]) -> BTreeMap<String, i32> {
        pairs.iter().map(|(s, e)| (s.to_string(), *e)).collect()
    }

    #[test]
    fn test_parse_division() {
        assert_eq!(
            parse_components("mm/day").unwrap(),
            components(&[("mm", 1), ("day", -1)])
        );
    }

    #[test]
    fn test_parse_negative_exponents() {
        let expected = components(&[("kg", 1), ("m", -2), ("s", -1)]);
        assert_eq!(parse_components("kg m-2 s-1").unwrap(), expected);
        assert_eq!(parse_components("kg m^-2 s^-1").unwrap(), expected);
        assert_eq!(parse_components("kg/m**2/s").unwrap(), expected);
        assert_eq!(parse_components("kg * m-2 * s-1").unwrap(), expected);
    }

    #[test]
    fn test_parse_per_keyword() {
        assert_eq!(
            parse_components("mm per day").unwrap(),
            components(&[("mm", 1), ("day", -1)])
        );
    }

    #[test]
    fn test_parse_bare_symbol() {
        assert_eq!(parse_components("m").unwrap(), components(&[("m", 1)]));
    }

    #[test]
    fn test_empty_unit_error() {
        assert_eq!(parse_components("  "), Err(ParseError::EmptyUnit));
    }

    #[test]
    fn test_unexpected_character_error() {
        assert_eq!(
            parse_components("mm/day!"),
            Err(ParseError::UnexpectedChar('!'))
        );
    }

    #[test]
    fn test_invalid_exponent_error() {
        assert!(matches!(
            parse_components("m^x"),
            Err(ParseError::InvalidExponent(_))
        ));
    }
}
