// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Beacon client: named analytics instances over a native SDK bridge.
//!
//! ```no_run
//! # async fn run() -> beacon_core::error::Result<()> {
//! use beacon_client::Registry;
//!
//! let registry = Registry::new(beacon_bridge::platform_bridge());
//! let analytics = registry.default_instance().await?;
//! analytics.initialize("API_KEY").await?;
//! analytics.log_event("app_opened", None).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod registry;

pub use client::Client;
pub use registry::Registry;
