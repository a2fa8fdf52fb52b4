// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Client facade for one named analytics instance.
//
// Each method forwards to the bridge with the instance name as the implicit
// first argument and resolves to the SDK's success flag. Arguments are checked
// by type only, plus a fail-fast check that required strings are non-empty.
// Bridge errors come back unchanged: no retry, no translation.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use beacon_bridge::AnalyticsBridge;
use beacon_core::error::{BeaconError, Result, require};
use beacon_core::{
    GroupName, Identify, InstanceConfig, LibraryInfo, Properties, Revenue, check_properties,
};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// A logical analytics client, identified by its instance name.
///
/// Holds no analytics state of its own; the SDK keeps events, user id and
/// session keyed by the same name. Obtain one from
/// [`Registry::instance`](crate::Registry::instance).
pub struct Client {
    name: String,
    bridge: Arc<dyn AnalyticsBridge>,
    /// Set once the library name/version have been recorded with the SDK.
    setup: OnceCell<()>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("name", &self.name)
            .field("platform", &self.bridge.platform_name())
            .field("ready", &self.setup.initialized())
            .finish()
    }
}

impl Client {
    pub(crate) fn new(name: &str, bridge: Arc<dyn AnalyticsBridge>) -> Self {
        Self {
            name: name.to_owned(),
            bridge,
            setup: OnceCell::new(),
        }
    }

    pub fn instance_name(&self) -> &str {
        &self.name
    }

    /// Record library metadata with the SDK, exactly once per client.
    ///
    /// Concurrent callers wait on the same attempt. If it fails, the error is
    /// returned to every waiter and the next call tries again.
    pub(crate) async fn ensure_setup(&self, library: &LibraryInfo) -> Result<()> {
        self.setup
            .get_or_try_init(|| async {
                info!(
                    instance = %self.name,
                    library = %library.name,
                    version = %library.version,
                    "setting up analytics instance"
                );
                if !self.bridge.set_library_name(&self.name, &library.name).await? {
                    warn!(instance = %self.name, "SDK rejected library name");
                }
                if !self.bridge.set_library_version(&self.name, &library.version).await? {
                    warn!(instance = %self.name, "SDK rejected library version");
                }
                Ok::<(), BeaconError>(())
            })
            .await
            .map(|_| ())
    }

    // -- Lifecycle -----------------------------------------------------------

    /// Initialise the SDK instance with a project API key.
    pub async fn initialize(&self, api_key: &str) -> Result<bool> {
        let api_key = require("api_key", api_key)?;
        debug!(instance = %self.name, "initialize");
        self.bridge.initialize(&self.name, api_key).await
    }

    /// Apply an [`InstanceConfig`].
    ///
    /// Transport and session settings go first so the session opened by
    /// `initialize` already uses them; user id and opt-out follow. Stops at
    /// the first error, or returns `Ok(false)` at the first rejected step.
    /// Missing required values are reported before any step is forwarded.
    pub async fn configure(&self, config: &InstanceConfig) -> Result<bool> {
        require("api_key", &config.api_key)?;
        if let Some(url) = &config.server_url {
            require("server_url", url)?;
        }

        macro_rules! step {
            ($what:literal, $call:expr) => {
                if !$call.await? {
                    warn!(instance = %self.name, step = $what, "SDK rejected configuration step");
                    return Ok(false);
                }
            };
        }

        if let Some(url) = &config.server_url {
            step!("server_url", self.set_server_url(url));
        }
        if let Some(enabled) = config.use_dynamic_config {
            step!("use_dynamic_config", self.set_use_dynamic_config(enabled));
        }
        if let Some(enabled) = config.track_session_events {
            step!("track_session_events", self.track_session_events(enabled));
        }
        if let Some(ms) = config.min_time_between_sessions_ms {
            step!(
                "min_time_between_sessions",
                self.set_min_time_between_sessions(Duration::from_millis(ms))
            );
        }
        if let Some(threshold) = config.event_upload_threshold {
            step!("event_upload_threshold", self.set_event_upload_threshold(threshold));
        }
        if let Some(ms) = config.event_upload_period_ms {
            step!(
                "event_upload_period",
                self.set_event_upload_period(Duration::from_millis(ms))
            );
        }
        if let Some(enabled) = config.coppa_control {
            step!("coppa_control", self.set_coppa_control(enabled));
        }

        step!("initialize", self.initialize(&config.api_key));

        if let Some(user_id) = &config.user_id {
            step!("user_id", self.set_user_id(Some(user_id)));
        }
        if let Some(opt_out) = config.opt_out {
            step!("opt_out", self.set_opt_out(opt_out));
        }

        info!(instance = %self.name, "analytics instance configured");
        Ok(true)
    }

    // -- Events --------------------------------------------------------------

    /// Log an event.
    ///
    /// With no properties, or an empty map, this is the bare event call;
    /// otherwise the map is forwarded unchanged.
    pub async fn log_event(&self, event_type: &str, properties: Option<&Properties>) -> Result<bool> {
        let event_type = require("event_type", event_type)?;
        match properties {
            Some(props) if !props.is_empty() => {
                check_properties(props)?;
                debug!(instance = %self.name, event_type, count = props.len(), "log_event with properties");
                self.bridge
                    .log_event_with_properties(&self.name, event_type, props)
                    .await
            }
            _ => {
                debug!(instance = %self.name, event_type, "log_event");
                self.bridge.log_event(&self.name, event_type).await
            }
        }
    }

    /// Log a revenue record.
    ///
    /// The SDK enforces its own rules (e.g. price present and positive); this
    /// only forwards the record.
    pub async fn log_revenue(&self, revenue: &Revenue) -> Result<bool> {
        if let Some(props) = &revenue.event_properties {
            check_properties(props)?;
        }
        debug!(instance = %self.name, price = revenue.price, quantity = revenue.quantity, "log_revenue");
        self.bridge.log_revenue(&self.name, revenue).await
    }

    /// Ask the SDK to upload queued events now.
    pub async fn upload_events(&self) -> Result<bool> {
        debug!(instance = %self.name, "upload_events");
        self.bridge.upload_events(&self.name).await
    }

    // -- User ----------------------------------------------------------------

    pub async fn set_user_properties(&self, properties: &Properties) -> Result<bool> {
        check_properties(properties)?;
        debug!(instance = %self.name, count = properties.len(), "set_user_properties");
        self.bridge.set_user_properties(&self.name, properties).await
    }

    pub async fn clear_user_properties(&self) -> Result<bool> {
        debug!(instance = %self.name, "clear_user_properties");
        self.bridge.clear_user_properties(&self.name).await
    }

    /// Set the user id; `None` logs the user out.
    pub async fn set_user_id(&self, user_id: Option<&str>) -> Result<bool> {
        debug!(instance = %self.name, has_user = user_id.is_some(), "set_user_id");
        self.bridge.set_user_id(&self.name, user_id).await
    }

    /// Submit an identify payload as one call.
    pub async fn identify(&self, identify: &Identify) -> Result<bool> {
        identify.check_finite()?;
        debug!(instance = %self.name, operations = identify.operations().len(), "identify");
        self.bridge.identify(&self.name, identify).await
    }

    // -- Groups --------------------------------------------------------------

    /// Put the user in one group or several, e.g. `("orgId", "acme")` or
    /// `("orgId", ["acme", "globex"])`.
    pub async fn set_group(&self, group_type: &str, group_name: impl Into<GroupName>) -> Result<bool> {
        let group_type = require("group_type", group_type)?;
        let group_name = group_name.into();
        debug!(instance = %self.name, group_type, group_name = %group_name, "set_group");
        self.bridge.set_group(&self.name, group_type, &group_name).await
    }

    /// Apply an identify payload to a group's properties.
    pub async fn group_identify(
        &self,
        group_type: &str,
        group_name: impl Into<GroupName>,
        identify: &Identify,
    ) -> Result<bool> {
        let group_type = require("group_type", group_type)?;
        identify.check_finite()?;
        let group_name = group_name.into();
        debug!(instance = %self.name, group_type, group_name = %group_name, "group_identify");
        self.bridge
            .group_identify(&self.name, group_type, &group_name, identify)
            .await
    }

    // -- Privacy & device ----------------------------------------------------

    pub async fn enable_coppa_control(&self) -> Result<bool> {
        debug!(instance = %self.name, "enable_coppa_control");
        self.bridge.enable_coppa_control(&self.name).await
    }

    pub async fn disable_coppa_control(&self) -> Result<bool> {
        debug!(instance = %self.name, "disable_coppa_control");
        self.bridge.disable_coppa_control(&self.name).await
    }

    /// Enable or disable COPPA control from a flag.
    pub async fn set_coppa_control(&self, enabled: bool) -> Result<bool> {
        if enabled {
            self.enable_coppa_control().await
        } else {
            self.disable_coppa_control().await
        }
    }

    pub async fn set_opt_out(&self, opt_out: bool) -> Result<bool> {
        debug!(instance = %self.name, opt_out, "set_opt_out");
        self.bridge.set_opt_out(&self.name, opt_out).await
    }

    pub async fn regenerate_device_id(&self) -> Result<bool> {
        debug!(instance = %self.name, "regenerate_device_id");
        self.bridge.regenerate_device_id(&self.name).await
    }

    pub async fn set_device_id(&self, device_id: &str) -> Result<bool> {
        let device_id = require("device_id", device_id)?;
        debug!(instance = %self.name, "set_device_id");
        self.bridge.set_device_id(&self.name, device_id).await
    }

    // -- Transport & sessions ------------------------------------------------

    pub async fn set_server_url(&self, server_url: &str) -> Result<bool> {
        let server_url = require("server_url", server_url)?;
        debug!(instance = %self.name, server_url, "set_server_url");
        self.bridge.set_server_url(&self.name, server_url).await
    }

    pub async fn set_use_dynamic_config(&self, enabled: bool) -> Result<bool> {
        debug!(instance = %self.name, enabled, "set_use_dynamic_config");
        self.bridge.set_use_dynamic_config(&self.name, enabled).await
    }

    /// Toggle automatic session start/end events.
    pub async fn track_session_events(&self, enabled: bool) -> Result<bool> {
        debug!(instance = %self.name, enabled, "track_session_events");
        self.bridge.track_session_events(&self.name, enabled).await
    }

    pub async fn set_min_time_between_sessions(&self, gap: Duration) -> Result<bool> {
        debug!(instance = %self.name, gap_ms = millis(gap), "set_min_time_between_sessions");
        self.bridge.set_min_time_between_sessions(&self.name, gap).await
    }

    pub async fn set_event_upload_threshold(&self, threshold: u32) -> Result<bool> {
        debug!(instance = %self.name, threshold, "set_event_upload_threshold");
        self.bridge.set_event_upload_threshold(&self.name, threshold).await
    }

    pub async fn set_event_upload_period(&self, period: Duration) -> Result<bool> {
        debug!(instance = %self.name, period_ms = millis(period), "set_event_upload_period");
        self.bridge.set_event_upload_period(&self.name, period).await
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
