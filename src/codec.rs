//! Textual box token `[W x H from (X, Y)]`, the line format of ground truth
//! files.
//!
//! Encoding truncates non-integral coordinates toward zero.

use std::str::FromStr;

use thiserror::Error;

use crate::bbox::BoundingBox;
use crate::error::Error;
use crate::Coord;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty box token")]
    Empty,
    #[error("`{0}` does not match `[W x H from (X, Y)]`")]
    Malformed(String),
    #[error("`{0}` has a negative width or height")]
    NegativeSize(String),
    #[error("`{0}` does not fit the coordinate type")]
    OutOfRange(String),
}

pub fn encode<T: Coord>(bbox: &BoundingBox<T>) -> Result<String, Error> {
    let field = |v: T| {
        v.to_i64()
            .ok_or_else(|| Error::Encode(format!("{:?}", bbox)))
    };

    Ok(format!(
        "[{} x {} from ({}, {})]",
        field(bbox.width)?,
        field(bbox.height)?,
        field(bbox.x)?,
        field(bbox.y)?,
    ))
}

pub fn decode<T: Coord>(token: &str) -> Result<BoundingBox<T>, ParseError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(ParseError::Empty);
    }

    let [w, h, x, y] = split_fields(token).ok_or_else(|| ParseError::Malformed(token.into()))?;
    let int = |s: &str| {
        // `i64::from_str` accepts a leading `+`, the token format does not
        if s.starts_with('+') {
            return Err(ParseError::Malformed(token.into()));
        }

        s.parse::<i64>()
            .map_err(|_| ParseError::Malformed(token.into()))
    };
    let (w, h, x, y) = (int(w)?, int(h)?, int(x)?, int(y)?);

    if w < 0 || h < 0 {
        return Err(ParseError::NegativeSize(token.into()));
    }

    let cast = |v: i64| T::from(v).ok_or_else(|| ParseError::OutOfRange(token.into()));

    Ok(BoundingBox::new(cast(x)?, cast(y)?, cast(w)?, cast(h)?))
}

fn split_fields(token: &str) -> Option<[&str; 4]> {
    let body = token.strip_prefix('[')?.strip_suffix(")]")?;
    let (w, rest) = body.split_once(" x ")?;
    let (h, rest) = rest.split_once(" from (")?;
    let (x, y) = rest.split_once(", ")?;

    Some([w, h, x, y])
}

impl<T: Coord> FromStr for BoundingBox<T> {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(s)
    }
}
