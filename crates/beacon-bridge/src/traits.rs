// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic call surface of the native analytics SDK.
//
// One entry point per client operation. Every method takes the instance name
// first; the SDK keys all of its state (queued events, user id, session) by
// that name. The boolean is the SDK's own success flag.

use std::time::Duration;

use async_trait::async_trait;
use beacon_core::error::Result;
use beacon_core::{GroupName, Identify, Properties, Revenue};

/// Bridge to the native analytics SDK.
///
/// Implementations forward each call as-is. They perform no validation, no
/// retries and no batching; all of that belongs to the SDK.
#[async_trait]
pub trait AnalyticsBridge: Send + Sync {
    /// Human-readable platform name (e.g. "Android", "iOS").
    fn platform_name(&self) -> &str;

    // -- Instance setup ------------------------------------------------------

    async fn set_library_name(&self, instance: &str, name: &str) -> Result<bool>;

    async fn set_library_version(&self, instance: &str, version: &str) -> Result<bool>;

    async fn initialize(&self, instance: &str, api_key: &str) -> Result<bool>;

    // -- Events --------------------------------------------------------------

    async fn log_event(&self, instance: &str, event_type: &str) -> Result<bool>;

    async fn log_event_with_properties(
        &self,
        instance: &str,
        event_type: &str,
        properties: &Properties,
    ) -> Result<bool>;

    async fn log_revenue(&self, instance: &str, revenue: &Revenue) -> Result<bool>;

    /// Flush queued events now instead of waiting for the upload period.
    async fn upload_events(&self, instance: &str) -> Result<bool>;

    // -- User ----------------------------------------------------------------

    async fn set_user_properties(&self, instance: &str, properties: &Properties) -> Result<bool>;

    async fn clear_user_properties(&self, instance: &str) -> Result<bool>;

    /// `None` clears the user id.
    async fn set_user_id(&self, instance: &str, user_id: Option<&str>) -> Result<bool>;

    async fn identify(&self, instance: &str, identify: &Identify) -> Result<bool>;

    // -- Groups --------------------------------------------------------------

    async fn set_group(&self, instance: &str, group_type: &str, group_name: &GroupName)
    -> Result<bool>;

    async fn group_identify(
        &self,
        instance: &str,
        group_type: &str,
        group_name: &GroupName,
        identify: &Identify,
    ) -> Result<bool>;

    // -- Privacy & device ----------------------------------------------------

    async fn enable_coppa_control(&self, instance: &str) -> Result<bool>;

    async fn disable_coppa_control(&self, instance: &str) -> Result<bool>;

    async fn set_opt_out(&self, instance: &str, opt_out: bool) -> Result<bool>;

    async fn regenerate_device_id(&self, instance: &str) -> Result<bool>;

    async fn set_device_id(&self, instance: &str, device_id: &str) -> Result<bool>;

    // -- Transport & sessions ------------------------------------------------

    async fn set_server_url(&self, instance: &str, server_url: &str) -> Result<bool>;

    async fn set_use_dynamic_config(&self, instance: &str, enabled: bool) -> Result<bool>;

    async fn track_session_events(&self, instance: &str, enabled: bool) -> Result<bool>;

    async fn set_min_time_between_sessions(&self, instance: &str, gap: Duration) -> Result<bool>;

    async fn set_event_upload_threshold(&self, instance: &str, threshold: u32) -> Result<bool>;

    async fn set_event_upload_period(&self, instance: &str, period: Duration) -> Result<bool>;
}
