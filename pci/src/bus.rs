// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! PCI bus numbers.
//!
//! Buses are numbered `00`-`ff` within a domain.
//! A span of bus numbers is what determines which devices sit downstream
//! of a given bridge or root; see [`crate::range::PciAddressRange`].

use std::str::FromStr;

/// An 8-bit PCI bus number within a domain.
///
/// Formats as two hex digits.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(
    any(test, feature = "serde"),
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
#[cfg_attr(any(test, feature = "bolero"), derive(bolero::TypeGenerator))]
#[repr(transparent)]
pub struct Bus(u8);

impl Bus {
    /// Creates a new bus number.
    #[must_use]
    pub fn new(bus: u8) -> Self {
        Self(bus)
    }

    /// Returns the raw bus number value.
    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }
}

impl From<u8> for Bus {
    fn from(value: u8) -> Self {
        Bus(value)
    }
}

impl std::fmt::LowerHex for Bus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02x}", self.0)
    }
}

impl std::fmt::Display for Bus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:02x}")
    }
}

/// Error produced when a string is not a valid PCI bus number.
#[derive(Debug, thiserror::Error)]
#[error("invalid PCI bus {0:?}: expected two hex digits")]
pub struct InvalidBus(pub String);

impl FromStr for Bus {
    type Err = InvalidBus;

    /// Parses a bus number from its canonical two-hex-digit form.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidBus`] unless the input is exactly two hex digits.
    ///
    /// # Examples
    ///
    /// ```
    /// # use placement_pci::bus::Bus;
    /// #
    /// assert_eq!("0a".parse::<Bus>().unwrap(), Bus::new(0x0a));
    /// assert!("a".parse::<Bus>().is_err());
    /// assert!("100".parse::<Bus>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 2 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(InvalidBus(s.to_string()));
        }
        u8::from_str_radix(s, 16)
            .map(Bus)
            .map_err(|_| InvalidBus(s.to_string()))
    }
}
