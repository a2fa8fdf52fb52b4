// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory bridge that records every forwarded call.
//
// Stands in for the native SDK in dry runs and tests. It can also be told to
// reject every call (`Ok(false)`) or to fail specific operations (`Err`), so
// callers can check that outcomes reach them unchanged.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use beacon_core::error::{BeaconError, Result};
use beacon_core::{GroupName, Identify, Properties, Revenue};

use crate::traits::AnalyticsBridge;

/// One call as it reached the bridge.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BridgeCall {
    SetLibraryName { name: String },
    SetLibraryVersion { version: String },
    Initialize { api_key: String },
    LogEvent { event_type: String },
    LogEventWithProperties { event_type: String, properties: Properties },
    LogRevenue { revenue: Revenue },
    UploadEvents,
    SetUserProperties { properties: Properties },
    ClearUserProperties,
    SetUserId { user_id: Option<String> },
    Identify { identify: Identify },
    SetGroup { group_type: String, group_name: GroupName },
    GroupIdentify { group_type: String, group_name: GroupName, identify: Identify },
    EnableCoppaControl,
    DisableCoppaControl,
    SetOptOut { opt_out: bool },
    RegenerateDeviceId,
    SetDeviceId { device_id: String },
    SetServerUrl { server_url: String },
    SetUseDynamicConfig { enabled: bool },
    TrackSessionEvents { enabled: bool },
    SetMinTimeBetweenSessions { millis: u64 },
    SetEventUploadThreshold { threshold: u32 },
    SetEventUploadPeriod { millis: u64 },
}

impl BridgeCall {
    /// Operation name, matching the `op` tag in serialized output.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::SetLibraryName { .. } => "set_library_name",
            Self::SetLibraryVersion { .. } => "set_library_version",
            Self::Initialize { .. } => "initialize",
            Self::LogEvent { .. } => "log_event",
            Self::LogEventWithProperties { .. } => "log_event_with_properties",
            Self::LogRevenue { .. } => "log_revenue",
            Self::UploadEvents => "upload_events",
            Self::SetUserProperties { .. } => "set_user_properties",
            Self::ClearUserProperties => "clear_user_properties",
            Self::SetUserId { .. } => "set_user_id",
            Self::Identify { .. } => "identify",
            Self::SetGroup { .. } => "set_group",
            Self::GroupIdentify { .. } => "group_identify",
            Self::EnableCoppaControl => "enable_coppa_control",
            Self::DisableCoppaControl => "disable_coppa_control",
            Self::SetOptOut { .. } => "set_opt_out",
            Self::RegenerateDeviceId => "regenerate_device_id",
            Self::SetDeviceId { .. } => "set_device_id",
            Self::SetServerUrl { .. } => "set_server_url",
            Self::SetUseDynamicConfig { .. } => "set_use_dynamic_config",
            Self::TrackSessionEvents { .. } => "track_session_events",
            Self::SetMinTimeBetweenSessions { .. } => "set_min_time_between_sessions",
            Self::SetEventUploadThreshold { .. } => "set_event_upload_threshold",
            Self::SetEventUploadPeriod { .. } => "set_event_upload_period",
        }
    }
}

/// A call plus the instance it was made against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedCall {
    pub instance: String,
    #[serde(flatten)]
    pub call: BridgeCall,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Behaviour {
    reject_all: bool,
    failing: HashSet<&'static str>,
}

/// Recording collaborator. Cheap to share behind an `Arc`.
#[derive(Debug, Default)]
pub struct RecordingBridge {
    calls: Mutex<Vec<RecordedCall>>,
    device_ids: Mutex<HashMap<String, String>>,
    behaviour: Mutex<Behaviour>,
}

// Recorded data stays consistent even if a holder panicked mid-test.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RecordingBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call resolve to `Ok(false)`.
    pub fn reject_all(&self, reject: bool) {
        lock(&self.behaviour).reject_all = reject;
    }

    /// Make calls to `operation` (e.g. `"log_event"`) fail with a bridge error.
    pub fn fail_on(&self, operation: &'static str) {
        lock(&self.behaviour).failing.insert(operation);
    }

    /// Undo every [`fail_on`](Self::fail_on).
    pub fn recover(&self) {
        lock(&self.behaviour).failing.clear();
    }

    /// Snapshot of every recorded call, in arrival order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    /// Calls made against one instance.
    pub fn calls_for(&self, instance: &str) -> Vec<BridgeCall> {
        lock(&self.calls)
            .iter()
            .filter(|c| c.instance == instance)
            .map(|c| c.call.clone())
            .collect()
    }

    /// How many times `operation` reached the bridge for `instance`.
    pub fn count(&self, instance: &str, operation: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| c.instance == instance && c.call.operation() == operation)
            .count()
    }

    /// Current device id for an instance, once one has been assigned.
    pub fn device_id(&self, instance: &str) -> Option<String> {
        lock(&self.device_ids).get(instance).cloned()
    }

    /// Recorded calls as pretty JSON.
    pub fn calls_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&*lock(&self.calls))?)
    }

    fn record(&self, instance: &str, call: BridgeCall) -> Result<bool> {
        let op = call.operation();
        debug!(instance, op, "recording bridge call");
        lock(&self.calls).push(RecordedCall {
            instance: instance.to_owned(),
            call,
            at: Utc::now(),
        });

        let behaviour = lock(&self.behaviour);
        if behaviour.failing.contains(op) {
            return Err(BeaconError::Bridge(format!("{op} failed for instance {instance}")));
        }
        Ok(!behaviour.reject_all)
    }

    fn assign_device_id(&self, instance: &str, device_id: String) {
        lock(&self.device_ids).insert(instance.to_owned(), device_id);
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[async_trait]
impl AnalyticsBridge for RecordingBridge {
    fn platform_name(&self) -> &str {
        "Recording"
    }

    async fn set_library_name(&self, instance: &str, name: &str) -> Result<bool> {
        self.record(instance, BridgeCall::SetLibraryName { name: name.to_owned() })
    }

    async fn set_library_version(&self, instance: &str, version: &str) -> Result<bool> {
        self.record(
            instance,
            BridgeCall::SetLibraryVersion {
                version: version.to_owned(),
            },
        )
    }

    async fn initialize(&self, instance: &str, api_key: &str) -> Result<bool> {
        let ok = self.record(
            instance,
            BridgeCall::Initialize {
                api_key: api_key.to_owned(),
            },
        )?;
        if ok && self.device_id(instance).is_none() {
            self.assign_device_id(instance, Uuid::new_v4().to_string());
        }
        Ok(ok)
    }

    async fn log_event(&self, instance: &str, event_type: &str) -> Result<bool> {
        self.record(
            instance,
            BridgeCall::LogEvent {
                event_type: event_type.to_owned(),
            },
        )
    }

    async fn log_event_with_properties(
        &self,
        instance: &str,
        event_type: &str,
        properties: &Properties,
    ) -> Result<bool> {
        self.record(
            instance,
            BridgeCall::LogEventWithProperties {
                event_type: event_type.to_owned(),
                properties: properties.clone(),
            },
        )
    }

    async fn log_revenue(&self, instance: &str, revenue: &Revenue) -> Result<bool> {
        self.record(
            instance,
            BridgeCall::LogRevenue {
                revenue: revenue.clone(),
            },
        )
    }

    async fn upload_events(&self, instance: &str) -> Result<bool> {
        self.record(instance, BridgeCall::UploadEvents)
    }

    async fn set_user_properties(&self, instance: &str, properties: &Properties) -> Result<bool> {
        self.record(
            instance,
            BridgeCall::SetUserProperties {
                properties: properties.clone(),
            },
        )
    }

    async fn clear_user_properties(&self, instance: &str) -> Result<bool> {
        self.record(instance, BridgeCall::ClearUserProperties)
    }

    async fn set_user_id(&self, instance: &str, user_id: Option<&str>) -> Result<bool> {
        self.record(
            instance,
            BridgeCall::SetUserId {
                user_id: user_id.map(str::to_owned),
            },
        )
    }

    async fn identify(&self, instance: &str, identify: &Identify) -> Result<bool> {
        self.record(
            instance,
            BridgeCall::Identify {
                identify: identify.clone(),
            },
        )
    }

    async fn set_group(
        &self,
        instance: &str,
        group_type: &str,
        group_name: &GroupName,
    ) -> Result<bool> {
        self.record(
            instance,
            BridgeCall::SetGroup {
                group_type: group_type.to_owned(),
                group_name: group_name.clone(),
            },
        )
    }

    async fn group_identify(
        &self,
        instance: &str,
        group_type: &str,
        group_name: &GroupName,
        identify: &Identify,
    ) -> Result<bool> {
        self.record(
            instance,
            BridgeCall::GroupIdentify {
                group_type: group_type.to_owned(),
                group_name: group_name.clone(),
                identify: identify.clone(),
            },
        )
    }

    async fn enable_coppa_control(&self, instance: &str) -> Result<bool> {
        self.record(instance, BridgeCall::EnableCoppaControl)
    }

    async fn disable_coppa_control(&self, instance: &str) -> Result<bool> {
        self.record(instance, BridgeCall::DisableCoppaControl)
    }

    async fn set_opt_out(&self, instance: &str, opt_out: bool) -> Result<bool> {
        self.record(instance, BridgeCall::SetOptOut { opt_out })
    }

    async fn regenerate_device_id(&self, instance: &str) -> Result<bool> {
        let ok = self.record(instance, BridgeCall::RegenerateDeviceId)?;
        if ok {
            self.assign_device_id(instance, Uuid::new_v4().to_string());
        }
        Ok(ok)
    }

    async fn set_device_id(&self, instance: &str, device_id: &str) -> Result<bool> {
        let ok = self.record(
            instance,
            BridgeCall::SetDeviceId {
                device_id: device_id.to_owned(),
            },
        )?;
        if ok {
            self.assign_device_id(instance, device_id.to_owned());
        }
        Ok(ok)
    }

    async fn set_server_url(&self, instance: &str, server_url: &str) -> Result<bool> {
        self.record(
            instance,
            BridgeCall::SetServerUrl {
                server_url: server_url.to_owned(),
            },
        )
    }

    async fn set_use_dynamic_config(&self, instance: &str, enabled: bool) -> Result<bool> {
        self.record(instance, BridgeCall::SetUseDynamicConfig { enabled })
    }

    async fn track_session_events(&self, instance: &str, enabled: bool) -> Result<bool> {
        self.record(instance, BridgeCall::TrackSessionEvents { enabled })
    }

    async fn set_min_time_between_sessions(&self, instance: &str, gap: Duration) -> Result<bool> {
        self.record(
            instance,
            BridgeCall::SetMinTimeBetweenSessions { millis: millis(gap) },
        )
    }

    async fn set_event_upload_threshold(&self, instance: &str, threshold: u32) -> Result<bool> {
        self.record(instance, BridgeCall::SetEventUploadThreshold { threshold })
    }

    async fn set_event_upload_period(&self, instance: &str, period: Duration) -> Result<bool> {
        self.record(
            instance,
            BridgeCall::SetEventUploadPeriod {
                millis: millis(period),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_calls_per_instance() {
        let bridge = RecordingBridge::new();
        assert!(bridge.log_event("a", "open").await.unwrap());
        assert!(bridge.upload_events("b").await.unwrap());

        assert_eq!(
            bridge.calls_for("a"),
            vec![BridgeCall::LogEvent {
                event_type: "open".into()
            }]
        );
        assert_eq!(bridge.count("b", "upload_events"), 1);
        assert_eq!(bridge.count("a", "upload_events"), 0);
    }

    #[tokio::test]
    async fn reject_and_fail_modes() {
        let bridge = RecordingBridge::new();
        bridge.reject_all(true);
        assert!(!bridge.clear_user_properties("a").await.unwrap());

        bridge.fail_on("set_opt_out");
        let err = bridge.set_opt_out("a", true).await.unwrap_err();
        assert!(matches!(err, BeaconError::Bridge(_)));

        // Both calls still reached the bridge.
        assert_eq!(bridge.calls().len(), 2);
    }

    #[tokio::test]
    async fn device_id_lifecycle() {
        let bridge = RecordingBridge::new();
        assert!(bridge.device_id("a").is_none());

        bridge.initialize("a", "key").await.unwrap();
        let first = bridge.device_id("a").unwrap();

        bridge.regenerate_device_id("a").await.unwrap();
        let second = bridge.device_id("a").unwrap();
        assert_ne!(first, second);

        bridge.set_device_id("a", "custom-device").await.unwrap();
        assert_eq!(bridge.device_id("a").as_deref(), Some("custom-device"));
    }

    #[tokio::test]
    async fn serialized_calls_carry_op_tag() {
        let bridge = RecordingBridge::new();
        bridge.set_event_upload_period("a", Duration::from_secs(30)).await.unwrap();

        let json: serde_json::Value = serde_json::from_str(&bridge.calls_json().unwrap()).unwrap();
        assert_eq!(json[0]["instance"], "a");
        assert_eq!(json[0]["op"], "set_event_upload_period");
        assert_eq!(json[0]["millis"], 30_000);
    }
}
