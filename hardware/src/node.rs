// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! NUMA nodes and the hardware attached to them.
//!
//! A [`NumaNode`] exclusively owns its CPU cores, its PCI buses, and a
//! flat address-bucketed index of every device attached to it. Buses
//! additionally index the addresses that fall inside their range, so the
//! flat view is always a superset and the per-bus view a partition of the
//! bus-reachable part of it. Device storage is never duplicated: bus
//! membership is resolved through the owning node.

use pci::{
    address::PciAddress,
    range::{CrossDomainRange, PciAddressRange},
    set::PciAddressSet,
};
use tracing::trace;

use crate::device::{PciDevice, PciDeviceMap};

/// Identifier of a NUMA node, unique within a topology.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(
    any(test, feature = "serde"),
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
#[cfg_attr(any(test, feature = "bolero"), derive(bolero::TypeGenerator))]
#[repr(transparent)]
pub struct NumaNodeId(u32);

impl NumaNodeId {
    /// Creates a node identifier.
    #[must_use]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw identifier value.
    #[must_use]
    pub fn value(self) -> u32 {
        self.0
    }
}

impl From<u32> for NumaNodeId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for NumaNodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a CPU core as the OS numbers it.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(
    any(test, feature = "serde"),
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
#[cfg_attr(any(test, feature = "bolero"), derive(bolero::TypeGenerator))]
#[repr(transparent)]
pub struct CoreId(u32);

impl CoreId {
    /// Creates a core identifier.
    #[must_use]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw identifier value.
    #[must_use]
    pub fn value(self) -> u32 {
        self.0
    }
}

impl From<u32> for CoreId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for CoreId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A CPU core within a NUMA node.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(
    any(test, feature = "serde"),
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct CpuCore {
    id: CoreId,
}

impl CpuCore {
    /// Creates a core with the given identifier.
    #[must_use]
    pub fn new(id: CoreId) -> Self {
        Self { id }
    }

    /// Returns the core's identifier.
    #[must_use]
    pub fn id(&self) -> CoreId {
        self.id
    }
}

/// The root of a PCI bus hierarchy owned by a NUMA node.
///
/// Covers an inclusive bus-number range within one domain and indexes the
/// addresses of the devices attached within that range. Two buses are the
/// same bus for merge purposes iff their ranges compare equal; the device
/// index does not participate in that identity.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    any(test, feature = "serde"),
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct PciBus {
    #[cfg_attr(any(test, feature = "serde"), serde(flatten))]
    range: PciAddressRange,
    #[cfg_attr(
        any(test, feature = "serde"),
        serde(rename = "pci_devices", default, skip_serializing_if = "PciAddressSet::is_empty")
    )]
    devices: PciAddressSet,
}

impl PciBus {
    /// Creates an empty bus covering `[low, high]`.
    ///
    /// # Errors
    ///
    /// Returns [`CrossDomainRange`] when the endpoints do not share a PCI
    /// domain.
    pub fn new(low: PciAddress, high: PciAddress) -> Result<Self, CrossDomainRange> {
        Ok(Self {
            range: PciAddressRange::new(low, high)?,
            devices: PciAddressSet::new(),
        })
    }

    /// The bus-number range this bus covers.
    #[must_use]
    pub fn range(&self) -> PciAddressRange {
        self.range
    }

    /// Reports whether `address` falls within this bus's range.
    #[must_use]
    pub fn contains(&self, address: PciAddress) -> bool {
        self.range.contains(address)
    }

    /// The addresses of the devices attached within this bus's range, in
    /// canonical ascending order.
    #[must_use]
    pub fn device_addresses(&self) -> &PciAddressSet {
        &self.devices
    }

    /// Indexes an address under this bus. No-op when the address is
    /// outside the range or already indexed.
    pub(crate) fn index_address(&mut self, address: PciAddress) {
        if self.range.contains(address) {
            self.devices.insert(address);
        }
    }
}

impl std::fmt::Display for PciBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.range)
    }
}

/// A NUMA node and everything attached to it.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    any(test, feature = "serde"),
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct NumaNode {
    id: NumaNodeId,
    #[cfg_attr(any(test, feature = "serde"), serde(default))]
    cores: Vec<CpuCore>,
    #[cfg_attr(any(test, feature = "serde"), serde(rename = "pci_buses", default))]
    buses: Vec<PciBus>,
    #[cfg_attr(any(test, feature = "serde"), serde(rename = "pci_devices", default))]
    devices: PciDeviceMap,
}

impl NumaNode {
    /// Creates an empty node with the given identifier.
    #[must_use]
    pub fn new(id: NumaNodeId) -> Self {
        Self {
            id,
            cores: Vec::new(),
            buses: Vec::new(),
            devices: PciDeviceMap::new(),
        }
    }

    /// Returns the node's identifier.
    #[must_use]
    pub fn id(&self) -> NumaNodeId {
        self.id
    }

    /// The node's CPU cores, in attachment order.
    #[must_use]
    pub fn cores(&self) -> &[CpuCore] {
        &self.cores
    }

    /// The node's PCI buses, in attachment order.
    #[must_use]
    pub fn buses(&self) -> &[PciBus] {
        &self.buses
    }

    /// The node's flat device index.
    #[must_use]
    pub fn devices(&self) -> &PciDeviceMap {
        &self.devices
    }

    /// Attaches a CPU core.
    pub fn add_core(&mut self, core: CpuCore) {
        self.cores.push(core);
    }

    /// Attaches a PCI bus.
    pub fn add_pci_bus(&mut self, bus: PciBus) {
        self.buses.push(bus);
    }

    /// Attaches a device.
    ///
    /// The device always lands in the node's flat index. When some owned
    /// bus contains the device's address, the first such bus (in
    /// attachment order) additionally indexes it and becomes the device's
    /// owning bus.
    pub fn add_device(&mut self, mut device: PciDevice) {
        device.attach_node(self.id);
        if let Some(bus) = self.buses.iter_mut().find(|bus| bus.contains(device.address)) {
            bus.index_address(device.address);
            device.attach_bus(bus.range());
            trace!("device {} attached to bus {} on NUMA node {}", device.name, bus, self.id);
        }
        self.devices.add(device);
    }

    /// Attaches every core in `cores`. Convenience over [`Self::add_core`].
    #[must_use]
    pub fn with_cores(mut self, cores: impl IntoIterator<Item = CpuCore>) -> Self {
        for core in cores {
            self.add_core(core);
        }
        self
    }

    /// Attaches every bus in `buses`. Convenience over [`Self::add_pci_bus`].
    #[must_use]
    pub fn with_pci_buses(mut self, buses: impl IntoIterator<Item = PciBus>) -> Self {
        for bus in buses {
            self.add_pci_bus(bus);
        }
        self
    }

    /// Attaches every device in `devices`. Convenience over
    /// [`Self::add_device`].
    #[must_use]
    pub fn with_devices(mut self, devices: impl IntoIterator<Item = PciDevice>) -> Self {
        for device in devices {
            self.add_device(device);
        }
        self
    }

    /// Resolves the devices attached within `bus`'s range through the
    /// flat index.
    pub fn bus_devices<'a>(&'a self, bus: &'a PciBus) -> impl Iterator<Item = &'a PciDevice> {
        bus.device_addresses()
            .iter()
            .flat_map(move |address| self.devices.get(address))
    }

    /// Folds another view of this same node into this one.
    ///
    /// Cores are deduplicated by id, buses by range equality; survivors
    /// append after the existing entries in incoming order. Devices are
    /// reconciled per address bucket: a same-named device in the same
    /// bucket only fills this node's unset soft fields, anything else is
    /// attached through the same path as [`Self::add_device`] so it gets
    /// indexed against this node's current buses.
    pub(crate) fn merge(&mut self, incoming: NumaNode) {
        for core in incoming.cores {
            if self.cores.iter().all(|existing| existing.id != core.id) {
                self.add_core(core);
            }
        }
        for bus in incoming.buses {
            if self.buses.iter().all(|existing| existing.range != bus.range) {
                self.add_pci_bus(bus);
            }
        }
        for (address, incoming_bucket) in incoming.devices {
            for device in incoming_bucket {
                let reconciled = self
                    .devices
                    .bucket_mut(address)
                    .and_then(|bucket| bucket.iter_mut().find(|d| d.name == device.name))
                    .map(|existing| existing.fill_missing(&device))
                    .is_some();
                if !reconciled {
                    self.add_device(device);
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use pci::address::PciAddress;
    use pretty_assertions::assert_eq;

    use crate::{
        device::PciDevice,
        node::{CoreId, CpuCore, NumaNode, NumaNodeId, PciBus},
    };

    fn addr(s: &str) -> PciAddress {
        s.parse().expect("well-formed test address")
    }

    fn bus(low: &str, high: &str) -> PciBus {
        PciBus::new(addr(low), addr(high)).expect("same-domain test bus")
    }

    #[test]
    fn device_within_a_bus_range_is_indexed_on_both_levels() {
        let mut node = NumaNode::new(NumaNodeId::new(0))
            .with_pci_buses([bus("0000:00:00.0", "0000:05:00.0")]);
        node.add_device(PciDevice::new("ib0", addr("0000:03:00.1")));

        let device = &node.devices().get(addr("0000:03:00.1"))[0];
        assert_eq!(device.numa_node(), Some(NumaNodeId::new(0)));
        assert_eq!(device.bus(), Some(node.buses()[0].range()));
        assert!(node.buses()[0].device_addresses().contains(addr("0000:03:00.1")));

        let resolved: Vec<&str> = node
            .bus_devices(&node.buses()[0])
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(resolved, ["ib0"]);
    }

    #[test]
    fn device_outside_every_bus_lives_only_in_the_flat_index() {
        let mut node = NumaNode::new(NumaNodeId::new(0))
            .with_pci_buses([bus("0000:00:00.0", "0000:05:00.0")]);
        node.add_device(PciDevice::new("eth0", addr("0000:06:00.0")));

        let device = &node.devices().get(addr("0000:06:00.0"))[0];
        assert_eq!(device.numa_node(), Some(NumaNodeId::new(0)));
        assert_eq!(device.bus(), None);
        assert!(node.buses()[0].device_addresses().is_empty());
    }

    #[test]
    fn first_matching_bus_in_attachment_order_wins() {
        let mut node = NumaNode::new(NumaNodeId::new(0)).with_pci_buses([
            bus("0000:00:00.0", "0000:0f:00.0"),
            bus("0000:03:00.0", "0000:05:00.0"),
        ]);
        node.add_device(PciDevice::new("ib0", addr("0000:04:00.0")));

        let device = &node.devices().get(addr("0000:04:00.0"))[0];
        assert_eq!(device.bus(), Some(node.buses()[0].range()));
        assert!(node.buses()[1].device_addresses().is_empty());
    }

    #[test]
    fn builder_veneer_matches_single_item_attachment() {
        let built = NumaNode::new(NumaNodeId::new(1))
            .with_cores([CpuCore::new(CoreId::new(0)), CpuCore::new(CoreId::new(1))])
            .with_pci_buses([bus("0000:00:00.0", "0000:05:00.0")])
            .with_devices([PciDevice::new("ib0", addr("0000:01:00.0"))]);

        let mut grown = NumaNode::new(NumaNodeId::new(1));
        grown.add_core(CpuCore::new(CoreId::new(0)));
        grown.add_core(CpuCore::new(CoreId::new(1)));
        grown.add_pci_bus(bus("0000:00:00.0", "0000:05:00.0"));
        grown.add_device(PciDevice::new("ib0", addr("0000:01:00.0")));

        assert_eq!(built, grown);
    }
}
