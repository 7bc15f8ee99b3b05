// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![doc = include_str!("../README.md")]
#![deny(clippy::pedantic, clippy::unwrap_used)]

pub mod address;
pub mod bus;
pub mod device;
pub mod domain;
pub mod function;
pub mod range;
pub mod set;
