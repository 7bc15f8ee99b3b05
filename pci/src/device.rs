// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! PCI device (slot) numbers.

use std::str::FromStr;

/// A PCI device number: the slot position on a bus.
///
/// Five bits per the PCI specification, so `00`-`1f`.
/// Formats as two hex digits.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(
    any(test, feature = "serde"),
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
#[repr(transparent)]
pub struct Device(u8);

impl Device {
    /// Maximum valid device number (31, or 0x1f).
    pub const MAX: u8 = 0b1_1111;

    /// Returns the raw device number value.
    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }
}

impl std::fmt::LowerHex for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02x}", self.0)
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:02x}")
    }
}

/// Error produced when a value is not a valid PCI device number.
#[derive(Debug, thiserror::Error)]
pub enum InvalidDevice {
    /// Device numbers are five bits wide.
    #[error("PCI device numbers are five bits: {0:#04x} is out of range")]
    OutOfRange(u8),
    /// Not a two-hex-digit string.
    #[error("invalid PCI device {0:?}: expected two hex digits up to 1f")]
    Syntax(String),
}

impl TryFrom<u8> for Device {
    type Error = InvalidDevice;

    /// # Errors
    ///
    /// Returns [`InvalidDevice::OutOfRange`] for values above 31.
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value > Self::MAX {
            Err(InvalidDevice::OutOfRange(value))
        } else {
            Ok(Self(value))
        }
    }
}

impl FromStr for Device {
    type Err = InvalidDevice;

    /// Parses a device number from its canonical two-hex-digit form.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidDevice`] unless the input is exactly two hex
    /// digits encoding a value no greater than `1f`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use placement_pci::device::Device;
    /// #
    /// assert_eq!("0f".parse::<Device>().unwrap().value(), 0x0f);
    /// assert!("20".parse::<Device>().is_err()); // out of range
    /// assert!("3".parse::<Device>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 2 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(InvalidDevice::Syntax(s.to_string()));
        }
        let value =
            u8::from_str_radix(s, 16).map_err(|_| InvalidDevice::Syntax(s.to_string()))?;
        Device::try_from(value)
    }
}

/// Test contract support for property-based testing.
#[cfg(any(test, feature = "bolero"))]
mod contract {
    use crate::device::Device;

    impl bolero::TypeGenerator for Device {
        fn generate<D: bolero::Driver>(driver: &mut D) -> Option<Self> {
            Some(Device(driver.produce::<u8>()? & Self::MAX))
        }
    }
}

#[cfg(test)]
mod test {
    use crate::device::Device;

    #[test]
    fn range_is_five_bits() {
        assert!(Device::try_from(0x1f).is_ok());
        assert!(Device::try_from(0x20).is_err());
    }

    #[test]
    fn parse_enforces_width_and_range() {
        assert!("1f".parse::<Device>().is_ok());
        assert!("20".parse::<Device>().is_err());
        assert!("f".parse::<Device>().is_err());
        assert!("01f".parse::<Device>().is_err());
    }

    #[test]
    fn format_parse_round_trip() {
        bolero::check!().with_type().for_each(|device: &Device| {
            let parsed: Device = device.to_string().parse().expect("canonical form");
            assert_eq!(*device, parsed);
        });
    }
}
