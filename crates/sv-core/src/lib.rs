//! # sv-core — The "Physics" of SIEVE
//!
//! Everything a reader of the all-stream needs to agree on before any I/O
//! happens: where a record lives ([`TFPos`]), which way a scan walks
//! ([`Direction`]), and how a record is laid out in bytes ([`RecordHeader`]).

#![no_std]

pub mod frame;
pub mod position;

use core::fmt;
use core::str::FromStr;

pub use frame::{
    decode_trailer, frame_len, FrameError, RecordHeader, FLAG_JSON, HEADER_SIZE, RECORD_MAGIC,
    TRAILER_SIZE,
};
pub use position::{PositionParseError, TFPos, POSITION_TOKEN_LEN};

/// Which way a scan walks the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Ascending positions, towards the head.
    Forward,
    /// Descending positions, towards the origin.
    Backward,
}

impl Direction {
    #[inline]
    pub const fn reverse(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A direction token other than `forward` or `backward`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionParseError;

impl fmt::Display for DirectionParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Invalid direction please provide one of the following: forward, backward")
    }
}

impl core::error::Error for DirectionParseError {}

impl FromStr for Direction {
    type Err = DirectionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("forward") {
            Ok(Direction::Forward)
        } else if s.eq_ignore_ascii_case("backward") {
            Ok(Direction::Backward)
        } else {
            Err(DirectionParseError)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_round_trips_through_text() {
        assert_eq!("forward".parse(), Ok(Direction::Forward));
        assert_eq!("Backward".parse(), Ok(Direction::Backward));
        assert_eq!(Direction::Backward.as_str(), "backward");
    }

    #[test]
    fn test_unknown_direction_is_rejected() {
        assert_eq!("sideways".parse::<Direction>(), Err(DirectionParseError));
    }

    #[test]
    fn test_reverse_is_an_involution() {
        assert_eq!(Direction::Forward.reverse(), Direction::Backward);
        assert_eq!(Direction::Forward.reverse().reverse(), Direction::Forward);
    }
}
