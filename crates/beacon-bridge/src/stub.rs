// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub bridge for desktop/CI builds where the native analytics SDK is absent.
//
// Every call returns `PlatformUnavailable`. Real implementations live in the
// `ios` and `android` modules; use `RecordingBridge` for dry runs.

use std::time::Duration;

use async_trait::async_trait;
use beacon_core::error::{BeaconError, Result};
use beacon_core::{GroupName, Identify, Properties, Revenue};

use crate::traits::AnalyticsBridge;

/// No-op bridge returned on non-mobile platforms.
pub struct StubBridge;

fn unavailable(operation: &str, instance: &str) -> Result<bool> {
    tracing::warn!(operation, instance, "analytics call made on stub bridge");
    Err(BeaconError::PlatformUnavailable)
}

#[async_trait]
impl AnalyticsBridge for StubBridge {
    fn platform_name(&self) -> &str {
        "Desktop (stub)"
    }

    async fn set_library_name(&self, instance: &str, _name: &str) -> Result<bool> {
        unavailable("set_library_name", instance)
    }

    async fn set_library_version(&self, instance: &str, _version: &str) -> Result<bool> {
        unavailable("set_library_version", instance)
    }

    async fn initialize(&self, instance: &str, _api_key: &str) -> Result<bool> {
        unavailable("initialize", instance)
    }

    async fn log_event(&self, instance: &str, _event_type: &str) -> Result<bool> {
        unavailable("log_event", instance)
    }

    async fn log_event_with_properties(
        &self,
        instance: &str,
        _event_type: &str,
        _properties: &Properties,
    ) -> Result<bool> {
        unavailable("log_event_with_properties", instance)
    }

    async fn log_revenue(&self, instance: &str, _revenue: &Revenue) -> Result<bool> {
        unavailable("log_revenue", instance)
    }

    async fn upload_events(&self, instance: &str) -> Result<bool> {
        unavailable("upload_events", instance)
    }

    async fn set_user_properties(&self, instance: &str, _properties: &Properties) -> Result<bool> {
        unavailable("set_user_properties", instance)
    }

    async fn clear_user_properties(&self, instance: &str) -> Result<bool> {
        unavailable("clear_user_properties", instance)
    }

    async fn set_user_id(&self, instance: &str, _user_id: Option<&str>) -> Result<bool> {
        unavailable("set_user_id", instance)
    }

    async fn identify(&self, instance: &str, _identify: &Identify) -> Result<bool> {
        unavailable("identify", instance)
    }

    async fn set_group(
        &self,
        instance: &str,
        _group_type: &str,
        _group_name: &GroupName,
    ) -> Result<bool> {
        unavailable("set_group", instance)
    }

    async fn group_identify(
        &self,
        instance: &str,
        _group_type: &str,
        _group_name: &GroupName,
        _identify: &Identify,
    ) -> Result<bool> {
        unavailable("group_identify", instance)
    }

    async fn enable_coppa_control(&self, instance: &str) -> Result<bool> {
        unavailable("enable_coppa_control", instance)
    }

    async fn disable_coppa_control(&self, instance: &str) -> Result<bool> {
        unavailable("disable_coppa_control", instance)
    }

    async fn set_opt_out(&self, instance: &str, _opt_out: bool) -> Result<bool> {
        unavailable("set_opt_out", instance)
    }

    async fn regenerate_device_id(&self, instance: &str) -> Result<bool> {
        unavailable("regenerate_device_id", instance)
    }

    async fn set_device_id(&self, instance: &str, _device_id: &str) -> Result<bool> {
        unavailable("set_device_id", instance)
    }

    async fn set_server_url(&self, instance: &str, _server_url: &str) -> Result<bool> {
        unavailable("set_server_url", instance)
    }

    async fn set_use_dynamic_config(&self, instance: &str, _enabled: bool) -> Result<bool> {
        unavailable("set_use_dynamic_config", instance)
    }

    async fn track_session_events(&self, instance: &str, _enabled: bool) -> Result<bool> {
        unavailable("track_session_events", instance)
    }

    async fn set_min_time_between_sessions(&self, instance: &str, _gap: Duration) -> Result<bool> {
        unavailable("set_min_time_between_sessions", instance)
    }

    async fn set_event_upload_threshold(&self, instance: &str, _threshold: u32) -> Result<bool> {
        unavailable("set_event_upload_threshold", instance)
    }

    async fn set_event_upload_period(&self, instance: &str, _period: Duration) -> Result<bool> {
        unavailable("set_event_upload_period", instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_call_is_unavailable() {
        let bridge = StubBridge;
        assert_eq!(bridge.platform_name(), "Desktop (stub)");
        assert!(matches!(
            bridge.log_event("a", "open").await,
            Err(BeaconError::PlatformUnavailable)
        ));
        assert!(matches!(
            bridge.identify("a", &Identify::new()).await,
            Err(BeaconError::PlatformUnavailable)
        ));
    }
}
