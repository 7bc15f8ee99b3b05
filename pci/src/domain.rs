// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! PCI domain (segment) numbers.
//!
//! A domain is an independent PCI hierarchy.
//! Most machines only have domain `0000`, but multi-socket and
//! disaggregated systems may expose several.

use std::str::FromStr;

/// A 16-bit PCI domain (segment) number.
///
/// Formats as four hex digits, the leading component of the canonical
/// `domain:bus:device.function` address form.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(
    any(test, feature = "serde"),
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
#[cfg_attr(any(test, feature = "bolero"), derive(bolero::TypeGenerator))]
#[repr(transparent)]
pub struct Domain(u16);

impl Domain {
    /// Creates a new domain number.
    #[must_use]
    pub fn new(domain: u16) -> Self {
        Self(domain)
    }

    /// Returns the raw domain number value.
    #[must_use]
    pub fn value(self) -> u16 {
        self.0
    }
}

impl From<u16> for Domain {
    fn from(value: u16) -> Self {
        Domain(value)
    }
}

impl std::fmt::LowerHex for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04x}", self.0)
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:04x}")
    }
}

/// Error produced when a string is not a valid PCI domain.
#[derive(Debug, thiserror::Error)]
#[error("invalid PCI domain {0:?}: expected four hex digits")]
pub struct InvalidDomain(pub String);

impl FromStr for Domain {
    type Err = InvalidDomain;

    /// Parses a domain from its canonical four-hex-digit form.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidDomain`] unless the input is exactly four hex
    /// digits (the canonical width; shorter spellings are rejected).
    ///
    /// # Examples
    ///
    /// ```
    /// # use placement_pci::domain::Domain;
    /// #
    /// assert_eq!("0000".parse::<Domain>().unwrap(), Domain::new(0));
    /// assert!("0".parse::<Domain>().is_err()); // not canonical width
    /// assert!("fffff".parse::<Domain>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 4 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(InvalidDomain(s.to_string()));
        }
        u16::from_str_radix(s, 16)
            .map(Domain)
            .map_err(|_| InvalidDomain(s.to_string()))
    }
}

#[cfg(test)]
mod test {
    use crate::domain::Domain;

    #[test]
    fn formats_zero_padded() {
        assert_eq!(Domain::new(0).to_string(), "0000");
        assert_eq!(Domain::new(0xff).to_string(), "00ff");
        assert_eq!(format!("{:x}", Domain::new(0xabcd)), "abcd");
    }

    #[test]
    fn parse_rejects_non_canonical() {
        assert!("0".parse::<Domain>().is_err());
        assert!("00000".parse::<Domain>().is_err());
        assert!("00g0".parse::<Domain>().is_err());
        assert!("+fff".parse::<Domain>().is_err());
    }

    #[test]
    fn format_parse_round_trip() {
        bolero::check!().with_type().for_each(|domain: &Domain| {
            let parsed: Domain = domain.to_string().parse().expect("canonical form");
            assert_eq!(*domain, parsed);
        });
    }
}
