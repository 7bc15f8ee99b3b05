// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Ordered sets of PCI addresses.

use std::collections::BTreeSet;

use crate::address::PciAddress;

/// An ordered set of PCI addresses.
///
/// Insertion is idempotent (inserting an address twice is not an error and
/// changes nothing) and iteration always yields members in canonical
/// ascending order: domain, then bus, then device, then function.
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(
    any(test, feature = "serde"),
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct PciAddressSet(BTreeSet<PciAddress>);

impl PciAddressSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an address; returns false if it was already present.
    pub fn insert(&mut self, address: PciAddress) -> bool {
        self.0.insert(address)
    }

    /// Reports whether the set holds `address`.
    #[must_use]
    pub fn contains(&self, address: PciAddress) -> bool {
        self.0.contains(&address)
    }

    /// Number of distinct addresses held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Reports whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates the members in canonical ascending order.
    pub fn iter(&self) -> impl Iterator<Item = PciAddress> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<PciAddress> for PciAddressSet {
    fn from_iter<I: IntoIterator<Item = PciAddress>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<PciAddress> for PciAddressSet {
    fn extend<I: IntoIterator<Item = PciAddress>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl std::fmt::Display for PciAddressSet {
    /// Formats as the members' canonical forms separated by spaces.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for address in &self.0 {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{address}")?;
            first = false;
        }
        Ok(())
    }
}
