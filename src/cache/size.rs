//! Byte Size Module
//!
//! Byte-multiple units used to configure the cache capacity.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::CacheError;

// == Byte Size ==
/// A byte count, usually built from the `KB`/`MB`/`GB` multiples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct ByteSize(pub u64);

impl ByteSize {
    /// Kibibyte
    pub const KB: ByteSize = ByteSize(1 << 10);
    /// Mebibyte
    pub const MB: ByteSize = ByteSize(1 << 20);
    /// Gibibyte
    pub const GB: ByteSize = ByteSize(1 << 30);

    pub const fn bytes(n: u64) -> Self {
        ByteSize(n)
    }

    /// Multiples saturate at `u64::MAX` bytes.
    pub const fn kb(n: u64) -> Self {
        ByteSize(n.saturating_mul(Self::KB.0))
    }

    pub const fn mb(n: u64) -> Self {
        ByteSize(n.saturating_mul(Self::MB.0))
    }

    pub const fn gb(n: u64) -> Self {
        ByteSize(n.saturating_mul(Self::GB.0))
    }

    /// Returns the raw byte count.
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for ByteSize {
    fn from(n: u64) -> Self {
        ByteSize(n)
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.0;
        if n != 0 && n % Self::GB.0 == 0 {
            write!(f, "{}GB", n / Self::GB.0)
        } else if n != 0 && n % Self::MB.0 == 0 {
            write!(f, "{}MB", n / Self::MB.0)
        } else if n != 0 && n % Self::KB.0 == 0 {
            write!(f, "{}KB", n / Self::KB.0)
        } else {
            write!(f, "{}B", n)
        }
    }
}

// == Parsing ==
/// Parses `"512"`, `"512B"`, `"64KB"`, `"256 MB"`, `"1gb"`.
impl FromStr for ByteSize {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (digits, unit) = trimmed.split_at(split);

        let count: u64 = digits
            .parse()
            .map_err(|_| CacheError::InvalidConfig(format!("invalid byte size '{}'", s)))?;

        let multiplier = match unit.trim().to_ascii_uppercase().as_str() {
            "" | "B" => 1,
            "KB" | "K" => Self::KB.0,
            "MB" | "M" => Self::MB.0,
            "GB" | "G" => Self::GB.0,
            other => {
                return Err(CacheError::InvalidConfig(format!(
                    "unknown byte unit '{}' in '{}'",
                    other, s
                )))
            }
        };

        count
            .checked_mul(multiplier)
            .map(ByteSize)
            .ok_or_else(|| CacheError::InvalidConfig(format!("byte size '{}' overflows", s)))
    }
}
