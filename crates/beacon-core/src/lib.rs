// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Beacon: core types, identify payloads and errors shared across all crates.

pub mod config;
pub mod error;
pub mod identify;
pub mod types;

pub use config::{BeaconConfig, InstanceConfig, LibraryInfo};
pub use error::BeaconError;
pub use identify::{Identify, IdentifyOperation, UNSET_PLACEHOLDER};
pub use types::*;
