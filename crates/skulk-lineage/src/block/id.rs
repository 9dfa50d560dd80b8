//! Time-sortable block identifiers.
//!
//! A [`BlockId`] has the bit layout of a ULID: a 48-bit millisecond
//! timestamp followed by 80 bits of entropy. Ordering is the numeric order
//! of the full 128-bit value, so IDs sort by creation time first.

use crate::error::{LineageError, Result};
use std::fmt;
use std::str::FromStr;

/// Crockford base32 alphabet used by the canonical text form.
const ENCODING: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Length of the canonical text form.
pub const ENCODED_LEN: usize = 26;

const ENTROPY_BITS: u32 = 80;
const ENTROPY_MASK: u128 = (1u128 << ENTROPY_BITS) - 1;
const TIMESTAMP_MASK: u64 = (1u64 << 48) - 1;

/// Globally unique, time-sortable block identifier.
///
/// # Examples
/// ```rust,ignore
/// use alopex_skulk_lineage::BlockId;
///
/// let id = BlockId::new(1_700_000_000_000, 42);
/// let parsed: BlockId = id.to_string().parse()?;
/// assert_eq!(id, parsed);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BlockId(u128);

impl BlockId {
    /// Creates an ID from a millisecond timestamp and entropy.
    ///
    /// Only the low 48 bits of the timestamp and the low 80 bits of the
    /// entropy are kept.
    pub fn new(timestamp_ms: u64, entropy: u128) -> Self {
        let ts = u128::from(timestamp_ms & TIMESTAMP_MASK);
        Self((ts << ENTROPY_BITS) | (entropy & ENTROPY_MASK))
    }

    /// Wraps a raw 128-bit value.
    pub const fn from_u128(value: u128) -> Self {
        Self(value)
    }

    /// Returns the raw 128-bit value.
    pub const fn as_u128(self) -> u128 {
        self.0
    }

    /// Returns the millisecond timestamp prefix.
    pub fn timestamp_ms(self) -> u64 {
        (self.0 >> ENTROPY_BITS) as u64
    }

    /// Returns the 80-bit entropy suffix.
    pub fn entropy(self) -> u128 {
        self.0 & ENTROPY_MASK
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = [0u8; ENCODED_LEN];
        for (i, slot) in buf.iter_mut().enumerate() {
            let shift = 5 * (ENCODED_LEN - 1 - i);
            *slot = ENCODING[((self.0 >> shift) & 0x1f) as usize];
        }
        // The alphabet is ASCII.
        f.write_str(std::str::from_utf8(&buf).map_err(|_| fmt::Error)?)
    }
}

impl FromStr for BlockId {
    type Err = LineageError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason| LineageError::InvalidBlockId {
            input: s.to_string(),
            reason,
        };

        if s.len() != ENCODED_LEN {
            return Err(invalid("expected 26 characters"));
        }

        let mut value: u128 = 0;
        for (i, byte) in s.bytes().enumerate() {
            let digit = decode_symbol(byte).ok_or_else(|| invalid("invalid base32 symbol"))?;
            // 26 symbols carry 130 bits; the top two must be zero.
            if i == 0 && digit > 7 {
                return Err(invalid("value overflows 128 bits"));
            }
            value = (value << 5) | u128::from(digit);
        }
        Ok(Self(value))
    }
}

fn decode_symbol(byte: u8) -> Option<u8> {
    let upper = byte.to_ascii_uppercase();
    ENCODING
        .iter()
        .position(|&c| c == upper)
        .map(|pos| pos as u8)
}
