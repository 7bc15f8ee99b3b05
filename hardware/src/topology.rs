// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The topology root aggregate and its merge algorithm.
//!
//! A [`Topology`] maps NUMA node identifiers to the nodes themselves and
//! owns everything reachable from them. The empty (default) value is
//! valid: every read operation on it returns an empty or zero result.
//!
//! Merging is how partial snapshots from independent discovery backends
//! become one authoritative picture. One backend typically knows the
//! NUMA/core/bus structure but little about devices; another enumerates
//! fabric devices with no placement detail. [`Topology::merge`] lets each
//! contribute what it knows without clobbering what the other knew first.

use std::collections::{BTreeMap, HashMap, btree_map::Entry};

use tracing::debug;

use crate::{
    device::PciDevice,
    node::{NumaNode, NumaNodeId},
};

/// A hierarchy of hardware devices grouped under NUMA nodes.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(
    any(test, feature = "serde"),
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Topology {
    #[cfg_attr(any(test, feature = "serde"), serde(default))]
    numa_nodes: BTreeMap<NumaNodeId, NumaNode>,
}

impl Topology {
    /// Looks up a NUMA node by identifier.
    #[must_use]
    pub fn numa_node(&self, id: NumaNodeId) -> Option<&NumaNode> {
        self.numa_nodes.get(&id)
    }

    /// Iterates the NUMA nodes in ascending identifier order.
    pub fn numa_nodes(&self) -> impl Iterator<Item = &NumaNode> + '_ {
        self.numa_nodes.values()
    }

    /// Number of NUMA nodes known to the topology.
    #[must_use]
    pub fn num_numa_nodes(&self) -> usize {
        self.numa_nodes.len()
    }

    /// Core count of an arbitrary NUMA node; 0 when the topology is
    /// empty.
    ///
    /// Only meaningful when every node is known to carry the same number
    /// of cores, which is what callers sizing per-node worker pools
    /// assume.
    #[must_use]
    pub fn num_cores_per_numa(&self) -> usize {
        self.numa_nodes
            .values()
            .next()
            .map_or(0, |node| node.cores().len())
    }

    /// Every device across every node and address bucket, keyed by name.
    ///
    /// Device names are expected to be unique system-wide. When that
    /// expectation is violated the last device encountered wins and the
    /// walk order is an implementation detail; callers must not rely on
    /// which claimant survives.
    #[must_use]
    pub fn all_devices(&self) -> HashMap<&str, &PciDevice> {
        let mut devices = HashMap::new();
        for node in self.numa_nodes.values() {
            for device in node.devices().devices() {
                devices.insert(device.name.as_str(), device);
            }
        }
        devices
    }

    /// Inserts a fully-built node, replacing any existing node with the
    /// same identifier.
    pub fn add_numa_node(&mut self, node: NumaNode) {
        self.numa_nodes.insert(node.id(), node);
    }

    /// Attaches a device to the node identified by `numa_id`, creating
    /// the node if it does not exist yet.
    ///
    /// See [`NumaNode::add_device`] for the bus-indexing side effects.
    pub fn add_device(&mut self, numa_id: NumaNodeId, device: PciDevice) {
        self.numa_nodes
            .entry(numa_id)
            .or_insert_with(|| NumaNode::new(numa_id))
            .add_device(device);
    }

    /// Folds an incoming snapshot into this topology.
    ///
    /// Nodes this topology has never seen are adopted wholesale. Nodes
    /// both sides know are reconciled: cores and buses accumulate without
    /// duplicates, and devices follow the fill-missing-never-clobber rule
    /// for their soft fields (see [`crate::device::PciDevice`]). Merging
    /// is not fully commutative: when two snapshots disagree on a
    /// concrete soft-field value, whichever merged first wins, so
    /// callers must merge in backend-registration order.
    pub fn merge(&mut self, incoming: Topology) {
        for (numa_id, node) in incoming.numa_nodes {
            match self.numa_nodes.entry(numa_id) {
                Entry::Vacant(slot) => {
                    debug!("adopting NUMA node {numa_id} from incoming snapshot");
                    slot.insert(node);
                }
                Entry::Occupied(mut slot) => {
                    debug!("reconciling NUMA node {numa_id} with incoming snapshot");
                    slot.get_mut().merge(node);
                }
            }
        }
    }
}

impl FromIterator<NumaNode> for Topology {
    fn from_iter<I: IntoIterator<Item = NumaNode>>(iter: I) -> Self {
        let mut topology = Topology::default();
        for node in iter {
            topology.add_numa_node(node);
        }
        topology
    }
}
