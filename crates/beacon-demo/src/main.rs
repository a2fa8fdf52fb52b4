// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Beacon demo. Drives every analytics call from the command line.
//
// Entry point. Initialises logging, loads the optional config file, picks the
// platform bridge (or the recording bridge with --dry-run) and runs one
// subcommand against the chosen instance.

mod cli;

use std::sync::Arc;

use beacon_bridge::{AnalyticsBridge, RecordingBridge};
use beacon_client::{Client, Registry};
use beacon_core::error::{BeaconError, Result};
use beacon_core::{BeaconConfig, DEFAULT_INSTANCE, Identify, Properties, Revenue};
use clap::Parser;
use tracing::{error, info};

use cli::{Cli, Command};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!(error = %e, "demo failed");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => BeaconConfig::load(path)?,
        None => BeaconConfig::default(),
    };

    let recorder = cli.dry_run.then(|| Arc::new(RecordingBridge::new()));
    let bridge: Arc<dyn AnalyticsBridge> = match &recorder {
        Some(recorder) => Arc::clone(recorder) as Arc<dyn AnalyticsBridge>,
        None => beacon_bridge::platform_bridge(),
    };
    info!(platform = bridge.platform_name(), "Beacon demo starting");

    let registry = Registry::from_config(bridge, &config);
    let client = registry.instance(&cli.instance).await?;

    let accepted = execute(&client, &config, cli.command).await?;
    info!(instance = client.instance_name(), accepted, "done");
    println!("{}", if accepted { "accepted" } else { "rejected" });

    if let Some(recorder) = recorder {
        println!("{}", recorder.calls_json()?);
    }
    Ok(())
}

async fn execute(client: &Client, config: &BeaconConfig, command: Command) -> Result<bool> {
    match command {
        Command::Init { api_key } => init(client, config, api_key.as_deref()).await,
        Command::Track {
            event_type,
            properties,
        } => {
            let properties = cli::to_properties(&properties);
            client.log_event(&event_type, Some(&properties)).await
        }
        Command::UserProps { properties } => {
            client
                .set_user_properties(&cli::to_properties(&properties))
                .await
        }
        Command::ClearUserProps => client.clear_user_properties().await,
        Command::Coppa { enabled } => client.set_coppa_control(enabled).await,
        Command::RegenerateDeviceId => client.regenerate_device_id().await,
        Command::OptOut { opt_out } => client.set_opt_out(opt_out).await,
        Command::UserId { user_id } => client.set_user_id(user_id.as_deref()).await,
        Command::ServerUrl { url } => client.set_server_url(&url).await,
        Command::DynamicConfig { enabled } => client.set_use_dynamic_config(enabled).await,
        Command::SessionEvents { enabled } => client.track_session_events(enabled).await,
        Command::Revenue(args) => client.log_revenue(&args.to_revenue()).await,
        Command::Identify(args) => client.identify(&args.to_identify()).await,
        Command::GroupIdentify {
            group_type,
            group_names,
            list,
            identify,
        } => {
            let group_name = cli::group_name(group_names, list);
            client
                .group_identify(&group_type, group_name, &identify.to_identify())
                .await
        }
        Command::SetGroup {
            group_type,
            group_names,
            list,
        } => client.set_group(&group_type, cli::group_name(group_names, list)).await,
        Command::Upload => client.upload_events().await,
        Command::Walkthrough { api_key } => walkthrough(client, config, api_key.as_deref()).await,
    }
}

/// Initialise from an explicit key, else apply the instance's config entry.
async fn init(client: &Client, config: &BeaconConfig, api_key: Option<&str>) -> Result<bool> {
    if let Some(key) = api_key {
        return client.initialize(key).await;
    }
    let name = client.instance_name();
    // A config entry keyed "" also names the default instance.
    let entry = config
        .instances
        .get(name)
        .or_else(|| if name == DEFAULT_INSTANCE { config.instances.get("") } else { None });
    match entry {
        Some(instance) => client.configure(instance).await,
        None => Err(BeaconError::MissingArgument("api_key")),
    }
}

/// Every call once, in the order the demo screen lists them. Stops at the
/// first error; rejections are logged and the walk continues.
async fn walkthrough(client: &Client, config: &BeaconConfig, api_key: Option<&str>) -> Result<bool> {
    let mut all_accepted = init(client, config, api_key).await?;

    let mut event_properties = Properties::new();
    event_properties.insert("source".into(), "walkthrough".into());
    let mut user_properties = Properties::new();
    user_properties.insert("plan".into(), "pro".into());
    user_properties.insert("seats".into(), 3.into());

    let identify = Identify::new()
        .set("favourite_colour", "teal")
        .set_once("first_seen", "demo")
        .add("launches", 1)
        .append("badges", "explorer")
        .unset("legacy_flag");
    let revenue = Revenue::new(3.99).product_id("com.example.coins").quantity(2);

    let steps = [
        ("track", client.log_event("demo_walkthrough", Some(&event_properties)).await?),
        ("user_props", client.set_user_properties(&user_properties).await?),
        ("clear_user_props", client.clear_user_properties().await?),
        ("coppa_on", client.enable_coppa_control().await?),
        ("coppa_off", client.disable_coppa_control().await?),
        ("regenerate_device_id", client.regenerate_device_id().await?),
        ("opt_out", client.set_opt_out(false).await?),
        ("user_id", client.set_user_id(Some("demo-user")).await?),
        ("server_url", client.set_server_url("https://analytics.example.com/").await?),
        ("dynamic_config", client.set_use_dynamic_config(false).await?),
        ("session_events", client.track_session_events(true).await?),
        ("revenue", client.log_revenue(&revenue).await?),
        ("identify", client.identify(&identify).await?),
        ("set_group", client.set_group("orgId", ["15", "16"]).await?),
        ("group_identify", client.group_identify("orgId", "15", &identify).await?),
        ("upload", client.upload_events().await?),
    ];

    for (step, accepted) in steps {
        info!(step, accepted, "walkthrough step");
        all_accepted &= accepted;
    }
    Ok(all_accepted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_bridge::BridgeCall;
    use beacon_core::InstanceConfig;

    async fn recorded(args: &[&str], config: &BeaconConfig) -> (Arc<RecordingBridge>, Result<bool>) {
        let cli = Cli::parse_from(args);
        let recorder = Arc::new(RecordingBridge::new());
        let registry = Registry::new(Arc::clone(&recorder) as Arc<dyn AnalyticsBridge>);
        let client = registry.instance(&cli.instance).await.unwrap();
        let outcome = execute(&client, config, cli.command).await;
        (recorder, outcome)
    }

    #[tokio::test]
    async fn track_without_properties_is_a_bare_event() {
        let (recorder, outcome) = recorded(&["beacon-demo", "track", "opened"], &BeaconConfig::default()).await;

        assert!(outcome.unwrap());
        assert_eq!(recorder.count(DEFAULT_INSTANCE, "log_event"), 1);
        assert_eq!(recorder.count(DEFAULT_INSTANCE, "log_event_with_properties"), 0);
    }

    #[tokio::test]
    async fn init_without_key_uses_config_entry() {
        let mut config = BeaconConfig::default();
        config
            .instances
            .insert("shop".into(), InstanceConfig::new("key-shop"));

        let (recorder, outcome) = recorded(&["beacon-demo", "--instance", "shop", "init"], &config).await;

        assert!(outcome.unwrap());
        assert!(recorder.calls_for("shop").contains(&BridgeCall::Initialize {
            api_key: "key-shop".into()
        }));
    }

    #[tokio::test]
    async fn init_without_any_key_fails() {
        let (_, outcome) = recorded(&["beacon-demo", "init"], &BeaconConfig::default()).await;
        assert!(matches!(outcome, Err(BeaconError::MissingArgument("api_key"))));
    }

    #[tokio::test]
    async fn walkthrough_reaches_every_operation() {
        let (recorder, outcome) = recorded(
            &["beacon-demo", "walkthrough", "--api-key", "key-1"],
            &BeaconConfig::default(),
        )
        .await;
        assert!(outcome.unwrap());

        for op in [
            "initialize",
            "log_event_with_properties",
            "set_user_properties",
            "clear_user_properties",
            "enable_coppa_control",
            "disable_coppa_control",
            "regenerate_device_id",
            "set_opt_out",
            "set_user_id",
            "set_server_url",
            "set_use_dynamic_config",
            "track_session_events",
            "log_revenue",
            "identify",
            "set_group",
            "group_identify",
            "upload_events",
        ] {
            assert_eq!(recorder.count(DEFAULT_INSTANCE, op), 1, "{op}");
        }
    }

    #[tokio::test]
    async fn set_group_list_flag_sends_a_one_element_list() {
        let (recorder, outcome) = recorded(
            &["beacon-demo", "set-group", "orgId", "a", "--list"],
            &BeaconConfig::default(),
        )
        .await;

        assert!(outcome.unwrap());
        assert!(recorder.calls_for(DEFAULT_INSTANCE).contains(&BridgeCall::SetGroup {
            group_type: "orgId".into(),
            group_name: beacon_core::GroupName::Many(vec!["a".into()]),
        }));
    }
}
