// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Complete PCI addresses in the extended BDF format.
//!
//! An address names one logical function: `domain:bus:device.function`,
//! canonically spelled `DDDD:BB:DD.F` in lowercase hex (e.g. `0000:03:00.0`).
//!
//! Addresses order by domain, then bus, then device, then function; that
//! order is what "canonical ascending" means everywhere else in this crate.
//!
//! # Examples
//!
//! ```
//! # use placement_pci::address::PciAddress;
//! #
//! let addr: PciAddress = "0000:03:00.0".parse().unwrap();
//! assert_eq!(addr.domain.value(), 0);
//! assert_eq!(addr.bus.value(), 3);
//! assert_eq!(addr.to_string(), "0000:03:00.0");
//! ```

use std::str::FromStr;

use crate::{
    bus::{Bus, InvalidBus},
    device::{Device, InvalidDevice},
    domain::{Domain, InvalidDomain},
    function::{Function, InvalidFunction},
};

/// A PCI function address: domain, bus, device, function.
///
/// The derived ordering is the canonical one (domain, then bus, then
/// device, then function). Equality and hashing are componentwise.
///
/// Serialization goes through the canonical string form, so an address can
/// be used directly as a mapping key in interchange formats that only allow
/// string keys.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(
    any(test, feature = "serde"),
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
#[cfg_attr(any(test, feature = "bolero"), derive(bolero::TypeGenerator))]
pub struct PciAddress {
    /// PCI domain (segment) number.
    pub domain: Domain,
    /// PCI bus number.
    pub bus: Bus,
    /// Device number on the bus.
    pub device: Device,
    /// Function number within the device.
    pub function: Function,
}

impl PciAddress {
    /// Creates an address from its components.
    #[must_use]
    pub fn new(domain: Domain, bus: Bus, device: Device, function: Function) -> Self {
        Self {
            domain,
            bus,
            device,
            function,
        }
    }
}

impl std::fmt::Display for PciAddress {
    /// Formats the address canonically as `DDDD:BB:DD.F`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04x}:{:02x}:{:02x}.{:01x}",
            self.domain, self.bus, self.device, self.function
        )
    }
}

/// Errors produced when a string is not a valid PCI address.
#[derive(Debug, thiserror::Error)]
pub enum InvalidAddress {
    /// The string does not split into the four components.
    #[error("malformed PCI address {0:?}: expected domain:bus:device.function")]
    Shape(String),
    /// Bad domain component.
    #[error(transparent)]
    Domain(#[from] InvalidDomain),
    /// Bad bus component.
    #[error(transparent)]
    Bus(#[from] InvalidBus),
    /// Bad device component.
    #[error(transparent)]
    Device(#[from] InvalidDevice),
    /// Bad function component.
    #[error(transparent)]
    Function(#[from] InvalidFunction),
}

impl FromStr for PciAddress {
    type Err = InvalidAddress;

    /// Parses an address from its canonical `DDDD:BB:DD.F` form.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidAddress`] when the shape is wrong or any
    /// component is not canonically spelled or out of range.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let shape = || InvalidAddress::Shape(s.to_string());
        let (domain, rest) = s.split_once(':').ok_or_else(shape)?;
        let (bus, rest) = rest.split_once(':').ok_or_else(shape)?;
        let (device, function) = rest.split_once('.').ok_or_else(shape)?;
        Ok(Self {
            domain: domain.parse()?,
            bus: bus.parse()?,
            device: device.parse()?,
            function: function.parse()?,
        })
    }
}

impl TryFrom<String> for PciAddress {
    type Error = InvalidAddress;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PciAddress> for String {
    fn from(value: PciAddress) -> String {
        value.to_string()
    }
}

#[cfg(test)]
mod test {
    use crate::address::PciAddress;

    fn addr(s: &str) -> PciAddress {
        s.parse().expect("well-formed test address")
    }

    #[test]
    fn parses_canonical_form() {
        let parsed = addr("0001:02:03.4");
        assert_eq!(parsed.domain.value(), 1);
        assert_eq!(parsed.bus.value(), 2);
        assert_eq!(parsed.device.value(), 3);
        assert_eq!(parsed.function.value(), 4);
    }

    #[test]
    fn rejects_malformed_shapes() {
        for bad in [
            "",
            "0000",
            "0000:00",
            "0000:00:00",
            "0000:00:00,0",
            "0000.00:00.0",
            "0000:00:00.0.0",
            "0000:00:20.0", // device out of range
            "0000:00:00.8", // function out of range
        ] {
            assert!(bad.parse::<PciAddress>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn orders_canonically() {
        let sorted = [
            "0000:00:00.0",
            "0000:00:00.1",
            "0000:00:01.0",
            "0000:01:00.0",
            "0001:00:00.0",
        ];
        for window in sorted.windows(2) {
            assert!(addr(window[0]) < addr(window[1]), "{window:?}");
        }
    }

    #[test]
    fn format_parse_round_trip() {
        bolero::check!().with_type().for_each(|address: &PciAddress| {
            let parsed: PciAddress = address.to_string().parse().expect("canonical form");
            assert_eq!(*address, parsed);
        });
    }

    #[test]
    fn serde_uses_canonical_string() {
        let address = addr("0000:03:00.0");
        let json = serde_json::to_string(&address).expect("serializes");
        assert_eq!(json, "\"0000:03:00.0\"");
        let back: PciAddress = serde_json::from_str(&json).expect("deserializes");
        assert_eq!(back, address);
    }
}
