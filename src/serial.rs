// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Zone serial number allocation
//!
//! The serial lives on its own header line in the SOA block:
//!
//! ```text
//!             0000000042  ;Serial
//! ```
//!
//! Only the first line of that shape is treated as the serial. Its indentation, the
//! gap before `;` and everything after the number are kept as-is on rewrite.

use nom::{
    bytes::complete::tag,
    character::complete::{char, digit1, multispace0, space0},
    combinator::{eof, recognize},
    sequence::{terminated, tuple},
    IResult,
};
use std::fmt;
use thiserror::Error;

/// Comment marker tagging the serial line
pub const SERIAL_MARKER: &str = "Serial";

/// Width of the zero-padded serial field
pub const SERIAL_WIDTH: usize = 10;

/// Serial allocation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SerialError {
    #[error("Serial {0} cannot be parsed as a 32-bit serial number")]
    Unparsable(String),

    #[error("Serial {0} cannot be incremented without overflowing")]
    Overflow(SerialNumber),
}

/// Zone serial number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SerialNumber(u32);

impl SerialNumber {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    /// The serial that follows this one
    pub fn next(self) -> Result<Self, SerialError> {
        self.0
            .checked_add(1)
            .map(Self)
            .ok_or(SerialError::Overflow(self))
    }
}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$}", self.0, width = SERIAL_WIDTH)
    }
}

/// Result of a successful allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatedSerial {
    pub previous: SerialNumber,
    pub current: SerialNumber,
}

/// Pieces of a serial line, borrowed from the original text
#[derive(Debug, PartialEq, Eq)]
struct SerialLine<'a> {
    indent: &'a str,
    digits: &'a str,
    gap: &'a str,
    comment: &'a str,
}

/// `;<ws>Serial<ws><eol>`
fn serial_comment(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        char(';'),
        space0,
        terminated(tag(SERIAL_MARKER), tuple((multispace0, eof))),
    )))(input)
}

/// `<ws><digits><ws>;<ws>Serial<ws><eol>`
fn serial_line(input: &str) -> IResult<&str, SerialLine<'_>> {
    let (input, (indent, digits, gap, comment)) =
        tuple((space0, digit1, space0, serial_comment))(input)?;

    Ok((
        input,
        SerialLine {
            indent,
            digits,
            gap,
            comment,
        },
    ))
}

fn parse_serial(digits: &str) -> Result<SerialNumber, SerialError> {
    digits
        .parse::<u32>()
        .map(SerialNumber)
        .map_err(|_| SerialError::Unparsable(digits.to_string()))
}

/// Read the serial from a line, if the line is a serial line
fn serial_of(line: &str) -> Result<Option<SerialNumber>, SerialError> {
    match serial_line(line) {
        Ok((_, parsed)) => parse_serial(parsed.digits).map(Some),
        Err(_) => Ok(None),
    }
}

/// Current serial of a zone, taken from the first serial line
pub fn current_serial<'a, I>(lines: I) -> Result<Option<SerialNumber>, SerialError>
where
    I: IntoIterator<Item = &'a str>,
{
    for line in lines {
        if let Some(serial) = serial_of(line)? {
            return Ok(Some(serial));
        }
    }
    Ok(None)
}

/// Rewrite the first serial line of `header` with the next serial
///
/// Lines are expected to carry their own line terminators. Returns the rewritten
/// lines and the allocation, or `None` when no serial line was found, in which case
/// the lines come back unchanged.
pub fn next_serial(header: &[&str]) -> Result<(Vec<String>, Option<AllocatedSerial>), SerialError> {
    let mut lines = Vec::with_capacity(header.len());
    let mut allocated = None;

    for line in header {
        if allocated.is_none() {
            if let Ok((_, parsed)) = serial_line(line) {
                let previous = parse_serial(parsed.digits)?;
                let current = previous.next()?;
                lines.push(format!(
                    "{}{}{}{}",
                    parsed.indent, current, parsed.gap, parsed.comment
                ));
                allocated = Some(AllocatedSerial { previous, current });
                continue;
            }
        }
        lines.push((*line).to_string());
    }

    Ok((lines, allocated))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_line_parser() {
        let (_, parsed) = serial_line("\t\t\t0000000042\t;Serial\n").unwrap();
        assert_eq!(parsed.indent, "\t\t\t");
        assert_eq!(parsed.digits, "0000000042");
        assert_eq!(parsed.gap, "\t");
        assert_eq!(parsed.comment, ";Serial\n");
    }

    #[test]
    fn test_serial_line_rejects_other_comments() {
        assert!(serial_line("\t\t\t3600\t;Refresh\n").is_err());
        assert!(serial_line("\t\t\t42\t;Serial number\n").is_err());
        assert!(serial_line("; Serial numbers are zero padded\n").is_err());
        assert!(serial_line("@\tIN\tSOA\tns. admin. (\n").is_err());
    }

    #[test]
    fn test_serial_of() {
        assert_eq!(
            serial_of("\t\t\t0000000042\t;Serial\n").unwrap(),
            Some(SerialNumber::new(42))
        );
        assert_eq!(serial_of("a.example.\t\tCNAME\trpz-passthru.\n").unwrap(), None);
    }

    #[test]
    fn test_serial_display_is_zero_padded() {
        assert_eq!(SerialNumber::new(43).to_string(), "0000000043");
        assert_eq!(SerialNumber::new(2025010101).to_string(), "2025010101");
    }

    #[test]
    fn test_serial_next_overflow() {
        let max = SerialNumber::new(u32::MAX);
        assert_eq!(max.next(), Err(SerialError::Overflow(max)));
    }
}
