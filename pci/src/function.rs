// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! PCI function numbers.
//!
//! A physical device can expose up to eight logical functions; a network
//! card with several ports typically shows one function per port.

use std::str::FromStr;

/// A PCI function number, `0`-`7`.
///
/// Formats as a single hex digit, the trailing component of the canonical
/// `domain:bus:device.function` address form.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(
    any(test, feature = "serde"),
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
#[repr(transparent)]
pub struct Function(u8);

impl Function {
    /// Maximum valid function number (7).
    pub const MAX: u8 = 0b111;

    /// Returns the raw function number value.
    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }
}

impl std::fmt::LowerHex for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:01x}", self.0)
    }
}

impl std::fmt::Display for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:01x}")
    }
}

/// Error produced when a value is not a valid PCI function number.
#[derive(Debug, thiserror::Error)]
pub enum InvalidFunction {
    /// Function numbers are three bits wide.
    #[error("PCI function numbers are three bits: {0} is out of range")]
    OutOfRange(u8),
    /// Not a single-hex-digit string.
    #[error("invalid PCI function {0:?}: expected one hex digit up to 7")]
    Syntax(String),
}

impl TryFrom<u8> for Function {
    type Error = InvalidFunction;

    /// # Errors
    ///
    /// Returns [`InvalidFunction::OutOfRange`] for values above 7.
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value > Self::MAX {
            Err(InvalidFunction::OutOfRange(value))
        } else {
            Ok(Self(value))
        }
    }
}

impl FromStr for Function {
    type Err = InvalidFunction;

    /// Parses a function number from its canonical one-hex-digit form.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidFunction`] unless the input is a single digit
    /// from `0` to `7`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use placement_pci::function::Function;
    /// #
    /// assert_eq!("0".parse::<Function>().unwrap().value(), 0);
    /// assert!("8".parse::<Function>().is_err());
    /// assert!("00".parse::<Function>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 1 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(InvalidFunction::Syntax(s.to_string()));
        }
        let value =
            u8::from_str_radix(s, 16).map_err(|_| InvalidFunction::Syntax(s.to_string()))?;
        Function::try_from(value)
    }
}

/// Test contract support for property-based testing.
#[cfg(any(test, feature = "bolero"))]
mod contract {
    use crate::function::Function;

    impl bolero::TypeGenerator for Function {
        fn generate<D: bolero::Driver>(driver: &mut D) -> Option<Self> {
            Some(Function(driver.produce::<u8>()? & Self::MAX))
        }
    }
}
