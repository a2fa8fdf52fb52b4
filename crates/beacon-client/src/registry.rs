// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Instance registry mapping names to shared clients.
//
// The registry is an owned value, not a process global: hold one per bridge
// and pass it where needed. Lookups create the client on first use and run
// its library setup once.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use beacon_bridge::AnalyticsBridge;
use beacon_core::error::Result;
use beacon_core::{BeaconConfig, DEFAULT_INSTANCE, LibraryInfo};
use tracing::info;

use crate::client::Client;

pub struct Registry {
    bridge: Arc<dyn AnalyticsBridge>,
    library: LibraryInfo,
    clients: Mutex<HashMap<String, Arc<Client>>>,
}

impl Registry {
    /// Registry reporting the default library name and version.
    pub fn new(bridge: Arc<dyn AnalyticsBridge>) -> Self {
        Self::with_library(bridge, LibraryInfo::default())
    }

    pub fn with_library(bridge: Arc<dyn AnalyticsBridge>, library: LibraryInfo) -> Self {
        info!(
            platform = bridge.platform_name(),
            library = %library.name,
            version = %library.version,
            "analytics registry created"
        );
        Self {
            bridge,
            library,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Registry using the library metadata from a loaded config file.
    pub fn from_config(bridge: Arc<dyn AnalyticsBridge>, config: &BeaconConfig) -> Self {
        Self::with_library(bridge, config.library.clone())
    }

    /// Get the client for `name`, creating it on first use.
    ///
    /// Every call with the same name returns the same `Arc`. The first
    /// successful lookup records the library name and version with the SDK;
    /// concurrent first lookups share that one setup. An empty name means
    /// the default instance. Names are matched exactly.
    pub async fn instance(&self, name: &str) -> Result<Arc<Client>> {
        let name = if name.is_empty() { DEFAULT_INSTANCE } else { name };
        let client = self.get_or_insert(name);
        client.ensure_setup(&self.library).await?;
        Ok(client)
    }

    /// Shorthand for `instance("")`.
    pub async fn default_instance(&self) -> Result<Arc<Client>> {
        self.instance(DEFAULT_INSTANCE).await
    }

    pub fn contains(&self, name: &str) -> bool {
        let name = if name.is_empty() { DEFAULT_INSTANCE } else { name };
        self.lock().contains_key(name)
    }

    /// Names of all clients created so far, sorted.
    pub fn instance_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Configure every instance named in `config`, in name order.
    ///
    /// Returns `Ok(false)` if any instance's SDK rejected a step; the
    /// remaining instances are still configured. Errors stop immediately.
    pub async fn configure(&self, config: &BeaconConfig) -> Result<bool> {
        config.validate()?;
        let mut all_accepted = true;
        for (name, instance) in &config.instances {
            let client = self.instance(name).await?;
            all_accepted &= client.configure(instance).await?;
        }
        Ok(all_accepted)
    }

    fn get_or_insert(&self, name: &str) -> Arc<Client> {
        let mut clients = self.lock();
        let client = clients.entry(name.to_owned()).or_insert_with(|| {
            info!(instance = name, "creating analytics client");
            Arc::new(Client::new(name, Arc::clone(&self.bridge)))
        });
        Arc::clone(client)
    }

    // The map is only touched by single insert/read operations, so a
    // poisoned lock still guards a consistent map.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<Client>>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_bridge::{BridgeCall, RecordingBridge};
    use beacon_core::{BeaconError, InstanceConfig};

    fn registry(bridge: &Arc<RecordingBridge>) -> Registry {
        Registry::with_library(
            Arc::clone(bridge) as Arc<dyn AnalyticsBridge>,
            LibraryInfo::new("beacon-test", "1.2.3"),
        )
    }

    #[tokio::test]
    async fn same_name_same_client() {
        let bridge = Arc::new(RecordingBridge::new());
        let registry = registry(&bridge);

        let a = registry.instance("main").await.unwrap();
        let b = registry.instance("main").await.unwrap();
        let other = registry.instance("other").await.unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &other));
        assert_eq!(a.instance_name(), "main");
        assert_eq!(registry.instance_names(), vec!["main", "other"]);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn setup_records_library_metadata_once() {
        let bridge = Arc::new(RecordingBridge::new());
        let registry = registry(&bridge);

        registry.instance("main").await.unwrap();
        registry.instance("main").await.unwrap();

        assert_eq!(
            bridge.calls_for("main"),
            vec![
                BridgeCall::SetLibraryName {
                    name: "beacon-test".into()
                },
                BridgeCall::SetLibraryVersion {
                    version: "1.2.3".into()
                },
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_access_sets_up_once() {
        let bridge = Arc::new(RecordingBridge::new());
        let registry = Arc::new(registry(&bridge));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move { registry.instance("shared").await.unwrap() })
            })
            .collect();

        let mut clients = Vec::new();
        for handle in handles {
            clients.push(handle.await.unwrap());
        }

        assert!(clients.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(bridge.count("shared", "set_library_name"), 1);
        assert_eq!(bridge.count("shared", "set_library_version"), 1);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn empty_name_is_the_default_instance() {
        let bridge = Arc::new(RecordingBridge::new());
        let registry = registry(&bridge);

        let by_empty = registry.instance("").await.unwrap();
        let by_default = registry.default_instance().await.unwrap();
        let by_name = registry.instance(DEFAULT_INSTANCE).await.unwrap();

        assert!(Arc::ptr_eq(&by_empty, &by_default));
        assert!(Arc::ptr_eq(&by_empty, &by_name));
        assert_eq!(by_empty.instance_name(), DEFAULT_INSTANCE);
        assert!(registry.contains(""));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn names_are_case_sensitive() {
        let bridge = Arc::new(RecordingBridge::new());
        let registry = registry(&bridge);

        let lower = registry.instance("main").await.unwrap();
        let upper = registry.instance("Main").await.unwrap();

        assert!(!Arc::ptr_eq(&lower, &upper));
    }

    #[tokio::test]
    async fn failed_setup_is_retried() {
        let bridge = Arc::new(RecordingBridge::new());
        let registry = registry(&bridge);

        bridge.fail_on("set_library_name");
        let err = registry.instance("main").await.unwrap_err();
        assert!(matches!(err, BeaconError::Bridge(_)));
        // The client exists, only its setup is pending.
        assert!(registry.contains("main"));

        bridge.recover();
        let first = registry.instance("main").await.unwrap();
        let again = registry.instance("main").await.unwrap();

        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(bridge.count("main", "set_library_name"), 2);
        assert_eq!(bridge.count("main", "set_library_version"), 1);
    }

    #[tokio::test]
    async fn configure_creates_each_instance() {
        let bridge = Arc::new(RecordingBridge::new());
        let registry = registry(&bridge);

        let mut config = BeaconConfig::default();
        config
            .instances
            .insert("alpha".into(), InstanceConfig::new("key-a"));
        config
            .instances
            .insert("beta".into(), InstanceConfig::new("key-b"));

        assert!(registry.configure(&config).await.unwrap());
        assert_eq!(registry.instance_names(), vec!["alpha", "beta"]);
        assert_eq!(bridge.count("alpha", "initialize"), 1);
        assert_eq!(bridge.count("beta", "initialize"), 1);
        assert!(bridge.device_id("alpha").is_some());
    }

    #[tokio::test]
    async fn configure_rejects_missing_api_key() {
        let bridge = Arc::new(RecordingBridge::new());
        let registry = registry(&bridge);

        let mut config = BeaconConfig::default();
        config
            .instances
            .insert("alpha".into(), InstanceConfig::default());

        assert!(matches!(
            registry.configure(&config).await,
            Err(BeaconError::Config(_))
        ));
        assert!(registry.is_empty());
    }
}
