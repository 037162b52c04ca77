//! Tokenizer for configuration lines and lenient numeric parsing.
//!
//! Lines are split on a fixed delimiter set the way `strtok` would: runs of
//! delimiters are skipped and empty tokens never appear. Numbers are read the
//! way `atoi`/`atof` read them, taking the leading numeric part of a token and
//! ignoring the rest.

use nom::character::complete::{digit1, multispace0, one_of};
use nom::combinator::opt;
use nom::number::complete::double;
use nom::sequence::{preceded, tuple};
use nom::IResult;

use crate::error::ConfigError;

/// Characters separating tokens on a configuration line.
pub const DELIMITERS: &[char] = &[' ', '\t', '='];

/// Cursor over the tokens of a single configuration line.
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    line: &'a str,
    pos: usize,
}

impl<'a> Tokens<'a> {
    pub fn new(line: &'a str) -> Self {
        Self { line, pos: 0 }
    }

    /// Next token split on [`DELIMITERS`].
    pub fn next_token(&mut self) -> Option<&'a str> {
        self.next_split(DELIMITERS)
    }

    /// Remainder of the line up to the next `=`, keeping embedded spaces.
    ///
    /// Leading `=` characters are skipped and surrounding whitespace is trimmed.
    /// Used for values such as channel names where spaces are significant.
    pub fn rest_after_eq(&mut self) -> Option<&'a str> {
        self.next_split(&['='])
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Next token, or a [`ConfigError::MissingValue`] naming the directive.
    pub fn value(&mut self, keyword: &str) -> Result<&'a str, ConfigError> {
        self.next_token().ok_or_else(|| ConfigError::MissingValue {
            keyword: keyword.to_string(),
        })
    }

    /// Next token read as an integer with `atoi` semantics.
    pub fn int(&mut self, keyword: &str) -> Result<i64, ConfigError> {
        self.value(keyword).map(atoi)
    }

    /// Next token read as a non-negative integer that fits in `u32`.
    pub fn uint(&mut self, keyword: &str) -> Result<u32, ConfigError> {
        let raw = self.value(keyword)?;
        u32::try_from(atoi(raw)).map_err(|_| ConfigError::invalid(keyword, raw))
    }

    /// Next token read as a boolean switch (`0` is false, anything else true).
    pub fn flag(&mut self, keyword: &str) -> Result<bool, ConfigError> {
        self.int(keyword).map(|v| v != 0)
    }

    /// Next token read as a floating point number with `atof` semantics.
    pub fn float(&mut self, keyword: &str) -> Result<f64, ConfigError> {
        self.value(keyword).map(atof)
    }

    fn next_split(&mut self, delimiters: &[char]) -> Option<&'a str> {
        let rest = &self.line[self.pos..];
        let start = rest.len() - rest.trim_start_matches(delimiters).len();
        let rest = &rest[start..];
        if rest.is_empty() {
            self.pos = self.line.len();
            return None;
        }
        let end = rest.find(delimiters).unwrap_or(rest.len());
        let token = &rest[..end];
        // Consume the delimiter that ended the token, like strtok does.
        let consumed = rest[end..].chars().next().map_or(0, char::len_utf8);
        self.pos += start + end + consumed;
        Some(token)
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

fn signed_decimal(input: &str) -> IResult<&str, i64> {
    let (rest, (_, sign, digits)) = tuple((multispace0, opt(one_of("+-")), digit1))(input)?;
    let magnitude = digits.bytes().fold(0i64, |acc, b| {
        acc.saturating_mul(10).saturating_add(i64::from(b - b'0'))
    });
    let value = if sign == Some('-') { -magnitude } else { magnitude };
    Ok((rest, value))
}

fn leading_float(input: &str) -> IResult<&str, f64> {
    preceded(multispace0, double)(input)
}

/// Leading integer of `s`, or `0` when it does not start with one.
pub fn atoi(s: &str) -> i64 {
    signed_decimal(s).map(|(_, v)| v).unwrap_or(0)
}

/// Leading floating point number of `s`, or `0.0` when it does not start with one.
pub fn atof(s: &str) -> f64 {
    leading_float(s).map(|(_, v)| v).unwrap_or(0.0)
}

/// Strip every trailing carriage return and line feed.
pub fn strip_eol(line: &str) -> &str {
    line.trim_end_matches(&['\r', '\n'][..])
}
