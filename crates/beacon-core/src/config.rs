// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Configuration: library metadata and per-instance client settings.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BeaconError, Result};

/// Library name/version recorded against every instance at setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryInfo {
    pub name: String,
    pub version: String,
}

impl LibraryInfo {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl Default for LibraryInfo {
    fn default() -> Self {
        Self::new("beacon-rust", env!("CARGO_PKG_VERSION"))
    }
}

/// Settings applied to one named instance by `Client::configure`.
///
/// `None` leaves the SDK's own default in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceConfig {
    /// Project API key passed to `initialize`.
    pub api_key: String,
    pub user_id: Option<String>,
    /// Custom ingestion endpoint (e.g. an EU data centre or a proxy).
    pub server_url: Option<String>,
    pub use_dynamic_config: Option<bool>,
    /// Emit session start/end events.
    pub track_session_events: Option<bool>,
    /// Stop collecting IP address, location and advertising ids.
    pub coppa_control: Option<bool>,
    pub opt_out: Option<bool>,
    pub min_time_between_sessions_ms: Option<u64>,
    /// Number of queued events that triggers an upload.
    pub event_upload_threshold: Option<u32>,
    pub event_upload_period_ms: Option<u64>,
}

impl InstanceConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeaconConfig {
    pub library: LibraryInfo,
    /// Instance name → settings.
    pub instances: BTreeMap<String, InstanceConfig>,
}

impl BeaconConfig {
    /// Read a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Every configured instance needs an API key to initialise.
    pub fn validate(&self) -> Result<()> {
        if let Some((name, _)) = self.instances.iter().find(|(_, c)| c.api_key.is_empty()) {
            return Err(BeaconError::Config(format!(
                "instance {name:?} has no api_key"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beacon.json");

        let mut config = BeaconConfig::default();
        let mut eu = InstanceConfig::new("eu-key");
        eu.server_url = Some("https://api.eu.example.com/".into());
        eu.track_session_events = Some(true);
        config.instances.insert("eu".into(), eu);

        config.save(&path).unwrap();
        let loaded = BeaconConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: BeaconConfig =
            serde_json::from_str(r#"{"instances": {"main": {"api_key": "k"}}}"#).unwrap();
        assert_eq!(config.library, LibraryInfo::default());
        let main = &config.instances["main"];
        assert_eq!(main.api_key, "k");
        assert!(main.user_id.is_none());
        assert!(main.opt_out.is_none());
    }

    #[test]
    fn empty_api_key_is_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beacon.json");
        std::fs::write(&path, r#"{"instances": {"main": {}}}"#).unwrap();

        let err = BeaconConfig::load(&path).unwrap_err();
        assert!(matches!(err, BeaconError::Config(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = BeaconConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, BeaconError::Io(_)));
    }
}
