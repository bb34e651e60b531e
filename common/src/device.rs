//! # Device Model
//!
//! A peripheral as seen by discovery. The address is the identity; the
//! advertised name only serves filtering and display.

use std::fmt;

/// Number of trailing address characters shown in compact summaries.
pub const SHORT_ADDR_LEN: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DeviceIdentity {
    pub address: String,
    pub name: Option<String>,
}

impl DeviceIdentity {
    pub fn new(address: impl Into<String>, name: Option<String>) -> Self {
        Self {
            address: address.into(),
            name,
        }
    }

    /// `true` if the advertised name contains `filter`. Unnamed devices never match.
    pub fn name_contains(&self, filter: &str) -> bool {
        self.name.as_deref().is_some_and(|name| name.contains(filter))
    }

    /// Case-insensitive address comparison.
    pub fn has_address(&self, address: &str) -> bool {
        self.address.eq_ignore_ascii_case(address)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.display_name(), self.address)
    }
}

/// Last [`SHORT_ADDR_LEN`] characters of `address`.
pub fn short_address(address: &str) -> &str {
    let start: usize = address
        .char_indices()
        .rev()
        .nth(SHORT_ADDR_LEN - 1)
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    &address[start..]
}
