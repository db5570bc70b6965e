//! # Positions in the Global Log
//!
//! A [`TFPos`] names a point in the all-stream. It is the only currency a
//! reader ever hands back to us: pages end at one, subscriptions resume from
//! one, feed links embed one as a fixed-width hex token.

use core::cmp::Ordering;
use core::fmt;
use core::str::FromStr;

/// A `(commit, prepare)` pair identifying a point in the global log ordering.
///
/// Ordered by `commit_position` first, `prepare_position` second. For
/// records committed on their own (every record this engine writes), both
/// halves equal the record's byte offset in the journal.
///
/// # Text form
///
/// `Display` renders 32 uppercase hex digits, commit first:
///
/// ```text
/// TFPos(0x1EAC, 0x1EAC)  →  0000000000001EAC0000000000001EAC
/// TFPos::ZERO            →  00000000000000000000000000000000
/// TFPos::HEAD            →  head
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
#[rkyv(derive(Debug))]
#[repr(C)]
pub struct TFPos {
    /// Position of the commit that made the record visible.
    pub commit_position: u64,

    /// Position of the record's prepare (its physical frame).
    pub prepare_position: u64,
}

impl TFPos {
    /// The start of the log.
    pub const ZERO: TFPos = TFPos::new(0, 0);

    /// Sentinel for "the current end of the log", used to start backward reads.
    pub const HEAD: TFPos = TFPos::new(u64::MAX, u64::MAX);

    #[inline]
    pub const fn new(commit_position: u64, prepare_position: u64) -> Self {
        Self {
            commit_position,
            prepare_position,
        }
    }

    /// Position of a record committed on its own at byte offset `offset`.
    #[inline]
    pub const fn at(offset: u64) -> Self {
        Self::new(offset, offset)
    }

    #[inline]
    pub const fn is_head(&self) -> bool {
        self.commit_position == u64::MAX && self.prepare_position == u64::MAX
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.commit_position == 0 && self.prepare_position == 0
    }
}

impl Default for TFPos {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Ord for TFPos {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        (self.commit_position, self.prepare_position)
            .cmp(&(other.commit_position, other.prepare_position))
    }
}

impl PartialOrd for TFPos {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for TFPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_head() {
            return f.write_str("head");
        }
        write!(
            f,
            "{:016X}{:016X}",
            self.commit_position, self.prepare_position
        )
    }
}

/// Width of the text form of a position.
pub const POSITION_TOKEN_LEN: usize = 32;

/// A position token that is neither `head` nor 32 hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionParseError {
    /// Token had the wrong number of bytes.
    Length(usize),
    /// Token contained something other than a hex digit.
    Digit,
}

impl fmt::Display for PositionParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionParseError::Length(len) => write!(
                f,
                "position must be 'head' or {} hex digits, got {} characters",
                POSITION_TOKEN_LEN, len
            ),
            PositionParseError::Digit => {
                f.write_str("position must contain only hexadecimal digits")
            }
        }
    }
}

impl core::error::Error for PositionParseError {}

impl FromStr for TFPos {
    type Err = PositionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("head") {
            return Ok(TFPos::HEAD);
        }
        if s.len() != POSITION_TOKEN_LEN {
            return Err(PositionParseError::Length(s.len()));
        }
        // from_str_radix tolerates a leading '+', the token format does not.
        if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(PositionParseError::Digit);
        }
        let (commit, prepare) = s.split_at(POSITION_TOKEN_LEN / 2);
        let commit = u64::from_str_radix(commit, 16).map_err(|_| PositionParseError::Digit)?;
        let prepare = u64::from_str_radix(prepare, 16).map_err(|_| PositionParseError::Digit)?;
        Ok(TFPos::new(commit, prepare))
    }
}
