//! Trailing time windows

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unit of a window magnitude
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WindowUnit {
    /// `s`
    Seconds,
    /// `m`
    Minutes,
    /// `h`
    Hours,
    /// `d`
    Days,
}

impl WindowUnit {
    /// Parse a unit character (`s`, `m`, `h`, `d`)
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            's' => Some(Self::Seconds),
            'm' => Some(Self::Minutes),
            'h' => Some(Self::Hours),
            'd' => Some(Self::Days),
            _ => None,
        }
    }

    /// The unit character used in source text
    pub const fn as_char(&self) -> char {
        match self {
            Self::Seconds => 's',
            Self::Minutes => 'm',
            Self::Hours => 'h',
            Self::Days => 'd',
        }
    }

    /// Number of seconds in one unit
    pub const fn seconds(&self) -> i64 {
        match self {
            Self::Seconds => 1,
            Self::Minutes => 60,
            Self::Hours => 3_600,
            Self::Days => 86_400,
        }
    }
}

/// A window token such as `6h` or `30m`
///
/// The magnitude is always strictly positive; use [`WindowSpec::new`] to
/// construct one from untrusted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowSpec {
    /// Integer magnitude (> 0)
    pub magnitude: u32,
    /// Unit of the magnitude
    pub unit: WindowUnit,
}

impl WindowSpec {
    /// Create a window, rejecting a zero magnitude
    pub const fn new(magnitude: u32, unit: WindowUnit) -> Option<Self> {
        if magnitude == 0 {
            None
        } else {
            Some(Self { magnitude, unit })
        }
    }

    /// `n` seconds
    pub const fn seconds(n: u32) -> Self {
        Self { magnitude: n, unit: WindowUnit::Seconds }
    }

    /// `n` minutes
    pub const fn minutes(n: u32) -> Self {
        Self { magnitude: n, unit: WindowUnit::Minutes }
    }

    /// `n` hours
    pub const fn hours(n: u32) -> Self {
        Self { magnitude: n, unit: WindowUnit::Hours }
    }

    /// `n` days
    pub const fn days(n: u32) -> Self {
        Self { magnitude: n, unit: WindowUnit::Days }
    }

    /// Window length in seconds
    pub const fn total_seconds(&self) -> i64 {
        self.magnitude as i64 * self.unit.seconds()
    }
}

impl fmt::Display for WindowSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.magnitude, self.unit.as_char())
    }
}
