// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! PCI devices and the address-keyed device index.
//!
//! A [`PciDevice`] is one logical hardware device as a discovery backend
//! reported it. Several logical devices can legitimately share one
//! physical PCI address (a network interface and its fabric domain are
//! the usual pair), so the index type, [`PciDeviceMap`], buckets devices
//! by address rather than mapping each address to a single device.

use std::collections::BTreeMap;

use pci::{address::PciAddress, range::PciAddressRange, set::PciAddressSet};
use tracing::trace;

use crate::node::NumaNodeId;

/// Classification of a discovered hardware device.
///
/// Advisory metadata, never load-bearing for correctness: backends report
/// whatever they can tell, and codes this crate does not recognize simply
/// classify as [`DeviceType::Unknown`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    strum::Display,
    strum::EnumIs,
    strum::EnumString,
    strum::FromRepr,
    strum::IntoStaticStr,
)]
#[cfg_attr(
    any(test, feature = "serde"),
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
#[repr(u32)]
pub enum DeviceType {
    /// Anything a backend could not (or did not) classify.
    #[default]
    #[strum(serialize = "unknown device type")]
    Unknown = 0,
    /// A standard network interface.
    #[strum(serialize = "network interface")]
    NetworkInterface = 1,
    /// An OpenFabrics-interface logical device, usually colocated at the
    /// same address as the network interface it fronts.
    #[strum(serialize = "OFI domain")]
    OfiDomain = 2,
}

impl DeviceType {
    /// Maps a raw discovery code to a device type.
    ///
    /// Unrecognized codes classify as [`DeviceType::Unknown`].
    ///
    /// # Examples
    ///
    /// ```
    /// # use placement_hardware::device::DeviceType;
    /// #
    /// assert_eq!(DeviceType::from_code(1), DeviceType::NetworkInterface);
    /// assert_eq!(DeviceType::from_code(999).to_string(), "unknown device type");
    /// ```
    #[must_use]
    pub fn from_code(code: u32) -> Self {
        Self::from_repr(code).unwrap_or(Self::Unknown)
    }
}

/// One logical hardware device.
///
/// The name is the identifying key within a device-type class and is
/// expected to be unique system-wide (`ib0` and the fabric domain
/// `mlx5_0` are distinct devices even when they share an address).
///
/// `device_type` and `link_speed` are soft fields: [`DeviceType::Unknown`]
/// and `0.0` are the "not established yet" sentinels that merging may fill
/// in but never overwrite once concrete.
#[derive(Clone, Debug)]
#[cfg_attr(
    any(test, feature = "serde"),
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct PciDevice {
    /// Device name, e.g. the OS interface name.
    pub name: String,
    /// Device classification; `Unknown` until some backend establishes it.
    #[cfg_attr(any(test, feature = "serde"), serde(rename = "type", default))]
    pub device_type: DeviceType,
    /// The PCI address the device was discovered at.
    #[cfg_attr(any(test, feature = "serde"), serde(rename = "pci_address"))]
    pub address: PciAddress,
    /// Link speed in GB/s; `0.0` until some backend establishes it.
    #[cfg_attr(any(test, feature = "serde"), serde(default))]
    pub link_speed: f64,
    // weak back-references, set at attach time and re-derived rather than
    // round-tripped through serialization
    #[cfg_attr(any(test, feature = "serde"), serde(skip))]
    numa_node: Option<NumaNodeId>,
    #[cfg_attr(any(test, feature = "serde"), serde(skip))]
    bus: Option<PciAddressRange>,
}

impl PciDevice {
    /// Creates an unattached device with unset soft fields.
    #[must_use]
    pub fn new(name: impl Into<String>, address: PciAddress) -> Self {
        Self {
            name: name.into(),
            device_type: DeviceType::Unknown,
            address,
            link_speed: 0.0,
            numa_node: None,
            bus: None,
        }
    }

    /// Sets the device classification.
    #[must_use]
    pub fn with_device_type(mut self, device_type: DeviceType) -> Self {
        self.device_type = device_type;
        self
    }

    /// Sets the link speed in GB/s.
    #[must_use]
    pub fn with_link_speed(mut self, link_speed: f64) -> Self {
        self.link_speed = link_speed;
        self
    }

    /// The NUMA node this device is attached to, if any.
    #[must_use]
    pub fn numa_node(&self) -> Option<NumaNodeId> {
        self.numa_node
    }

    /// The bus range this device is indexed under, if any.
    #[must_use]
    pub fn bus(&self) -> Option<PciAddressRange> {
        self.bus
    }

    pub(crate) fn attach_node(&mut self, node: NumaNodeId) {
        self.numa_node = Some(node);
    }

    pub(crate) fn attach_bus(&mut self, bus: PciAddressRange) {
        self.bus = Some(bus);
    }

    /// Copies soft fields from `other` where this device has not
    /// established them yet. Concrete values are never overwritten.
    #[allow(clippy::float_cmp)] // 0.0 is the exact unset sentinel
    pub(crate) fn fill_missing(&mut self, other: &PciDevice) {
        if self.device_type.is_unknown() && !other.device_type.is_unknown() {
            trace!(
                "device {}: taking type {:?} from incoming snapshot",
                self.name, other.device_type
            );
            self.device_type = other.device_type;
        }
        if self.link_speed == 0.0 && other.link_speed != 0.0 {
            trace!(
                "device {}: taking link speed {} from incoming snapshot",
                self.name, other.link_speed
            );
            self.link_speed = other.link_speed;
        }
    }
}

impl PartialEq for PciDevice {
    /// Attachment references are derived state; two devices are equal
    /// when they agree on name, classification, address, and link speed.
    #[allow(clippy::float_cmp)]
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.device_type == other.device_type
            && self.address == other.address
            && self.link_speed == other.link_speed
    }
}

impl std::fmt::Display for PciDevice {
    /// Formats as `ADDRESS NAME (TYPE)`, with an ` @ N.NN GB/s` suffix
    /// when the link speed is known.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} ({})", self.address, self.name, self.device_type)?;
        if self.link_speed > 0.0 {
            write!(f, " @ {:.2} GB/s", self.link_speed)?;
        }
        Ok(())
    }
}

/// Devices bucketed by PCI address.
///
/// Buckets preserve insertion order, so devices sharing an address come
/// back out in the order backends reported them. Serialized forms key the
/// buckets by the canonical address string (addresses are not native map
/// keys in common interchange formats).
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(
    any(test, feature = "serde"),
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct PciDeviceMap(BTreeMap<PciAddress, Vec<PciDevice>>);

impl PciDeviceMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a device to the bucket for its address, creating the
    /// bucket if absent.
    pub fn add(&mut self, device: PciDevice) {
        self.0.entry(device.address).or_default().push(device);
    }

    /// Every distinct address present, in canonical ascending order.
    #[must_use]
    pub fn keys(&self) -> PciAddressSet {
        self.0.keys().copied().collect()
    }

    /// The bucket for `address`; empty when no device lives there.
    #[must_use]
    pub fn get(&self, address: PciAddress) -> &[PciDevice] {
        self.0.get(&address).map_or(&[], Vec::as_slice)
    }

    pub(crate) fn bucket_mut(&mut self, address: PciAddress) -> Option<&mut Vec<PciDevice>> {
        self.0.get_mut(&address)
    }

    /// Iterates `(address, bucket)` pairs in ascending address order.
    pub fn iter(&self) -> impl Iterator<Item = (PciAddress, &[PciDevice])> + '_ {
        self.0.iter().map(|(address, bucket)| (*address, bucket.as_slice()))
    }

    /// Iterates every device across all buckets.
    pub fn devices(&self) -> impl Iterator<Item = &PciDevice> + '_ {
        self.0.values().flatten()
    }

    /// Reports whether the map holds no devices at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for PciDeviceMap {
    type Item = (PciAddress, Vec<PciDevice>);
    type IntoIter = std::collections::btree_map::IntoIter<PciAddress, Vec<PciDevice>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
