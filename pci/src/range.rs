// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Bus-number ranges within a PCI domain.
//!
//! A range `[low, high]` stands for every bus number from `low.bus` to
//! `high.bus` inclusive, all within one domain. It answers one question:
//! is a given address downstream of this span? The device and function
//! components of the endpoints carry no meaning for containment.

use crate::{address::PciAddress, domain::Domain};

/// An inclusive `[low, high]` bus-number span within a single PCI domain.
///
/// Both endpoints must share a domain; this is enforced at construction
/// and on deserialization. A range whose `low` bus number exceeds its
/// `high` bus number is representable and contains no address.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(
    any(test, feature = "serde"),
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "wire::RangeWire", into = "wire::RangeWire")
)]
pub struct PciAddressRange {
    low: PciAddress,
    high: PciAddress,
}

/// Error produced when range endpoints live in different PCI domains.
#[derive(Debug, thiserror::Error)]
#[error("PCI bus range endpoints must share a domain: {low} vs {high}")]
pub struct CrossDomainRange {
    /// Domain of the low endpoint.
    pub low: Domain,
    /// Domain of the high endpoint.
    pub high: Domain,
}

impl PciAddressRange {
    /// Creates a range from its endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`CrossDomainRange`] when the endpoints do not share a
    /// PCI domain.
    pub fn new(low: PciAddress, high: PciAddress) -> Result<Self, CrossDomainRange> {
        if low.domain != high.domain {
            return Err(CrossDomainRange {
                low: low.domain,
                high: high.domain,
            });
        }
        Ok(Self { low, high })
    }

    /// Returns the low endpoint.
    #[must_use]
    pub fn low(&self) -> PciAddress {
        self.low
    }

    /// Returns the high endpoint.
    #[must_use]
    pub fn high(&self) -> PciAddress {
        self.high
    }

    /// Returns the domain both endpoints live in.
    #[must_use]
    pub fn domain(&self) -> Domain {
        self.low.domain
    }

    /// Reports whether `address` falls within this range.
    ///
    /// True iff the domains match and the address's bus number lies in
    /// `[low.bus, high.bus]` inclusive. The device and function numbers
    /// of the endpoints do not constrain anything.
    #[must_use]
    pub fn contains(&self, address: PciAddress) -> bool {
        self.low.domain == address.domain
            && self.low.bus <= address.bus
            && address.bus <= self.high.bus
    }
}

impl std::fmt::Display for PciAddressRange {
    /// Formats as `DDDD:BB` for a single-bus range, `DDDD:[BB-BB]` otherwise.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.low.bus == self.high.bus {
            write!(f, "{}:{}", self.domain(), self.low.bus)
        } else {
            write!(f, "{}:[{}-{}]", self.domain(), self.low.bus, self.high.bus)
        }
    }
}

#[cfg(any(test, feature = "serde"))]
mod wire {
    use super::{CrossDomainRange, PciAddressRange};
    use crate::address::PciAddress;

    /// On-the-wire shape of a range; split out so deserialization can
    /// re-check the shared-domain invariant.
    #[derive(serde::Serialize, serde::Deserialize)]
    pub struct RangeWire {
        low_address: PciAddress,
        high_address: PciAddress,
    }

    impl TryFrom<RangeWire> for PciAddressRange {
        type Error = CrossDomainRange;

        fn try_from(value: RangeWire) -> Result<Self, Self::Error> {
            PciAddressRange::new(value.low_address, value.high_address)
        }
    }

    impl From<PciAddressRange> for RangeWire {
        fn from(value: PciAddressRange) -> Self {
            Self {
                low_address: value.low,
                high_address: value.high,
            }
        }
    }
}
