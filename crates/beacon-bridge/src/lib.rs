// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Beacon native analytics SDK bridge.
//!
//! Defines the [`AnalyticsBridge`] call surface and the platform dispatch that
//! picks an implementation for the target OS: JNI into the Android SDK,
//! Objective-C message sends into the iOS SDK, or a stub elsewhere.

pub mod recording;
pub mod traits;

#[cfg(target_os = "ios")]
pub mod ios;

#[cfg(target_os = "android")]
pub mod android;

#[cfg(not(any(target_os = "ios", target_os = "android")))]
pub mod stub;

use std::sync::Arc;

pub use recording::{BridgeCall, RecordedCall, RecordingBridge};
pub use traits::AnalyticsBridge;

/// Returns the bridge implementation for the target operating system.
///
/// The bridge is shared by every client in a registry, hence the `Arc`.
pub fn platform_bridge() -> Arc<dyn AnalyticsBridge> {
    #[cfg(target_os = "ios")]
    {
        Arc::new(ios::IosBridge::new())
    }
    #[cfg(target_os = "android")]
    {
        Arc::new(android::AndroidBridge::new())
    }
    #[cfg(not(any(target_os = "ios", target_os = "android")))]
    {
        // Desktop/CI: no native SDK to talk to.
        Arc::new(stub::StubBridge)
    }
}
