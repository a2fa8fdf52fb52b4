// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line surface for the demo. One subcommand per demo action.

use std::path::PathBuf;

use beacon_core::{GroupName, Identify, Properties, PropertyValue, Revenue};
use clap::{ArgAction, Args, Parser, Subcommand};

type Property = (String, PropertyValue);

#[derive(Debug, Parser)]
#[command(name = "beacon-demo", version, about = "Exercise the Beacon analytics bridge")]
pub struct Cli {
    /// JSON config file with library metadata and per-instance settings.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Instance to act on. Empty means the default instance.
    #[arg(long, global = true, default_value = "")]
    pub instance: String,

    /// Record calls in memory and print them instead of reaching the SDK.
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Initialise the instance, from --api-key or the config file.
    Init {
        #[arg(long)]
        api_key: Option<String>,
    },
    /// Log an event with optional key=value properties.
    Track {
        event_type: String,
        #[arg(value_parser = parse_property)]
        properties: Vec<Property>,
    },
    /// Set user properties.
    UserProps {
        #[arg(value_parser = parse_property, required = true)]
        properties: Vec<Property>,
    },
    ClearUserProps,
    /// Enable or disable COPPA control.
    Coppa {
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },
    RegenerateDeviceId,
    OptOut {
        #[arg(action = ArgAction::Set)]
        opt_out: bool,
    },
    /// Set the user id. Omit it to log the user out.
    UserId { user_id: Option<String> },
    ServerUrl { url: String },
    DynamicConfig {
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },
    SessionEvents {
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },
    /// Log a purchase.
    Revenue(RevenueArgs),
    /// Send an identify payload.
    Identify(IdentifyArgs),
    /// Send an identify payload for a group.
    GroupIdentify {
        group_type: String,
        #[arg(required = true)]
        group_names: Vec<String>,
        /// Send the names as a list even when there is only one.
        #[arg(long)]
        list: bool,
        #[command(flatten)]
        identify: IdentifyArgs,
    },
    /// Put the user in one or more groups.
    SetGroup {
        group_type: String,
        #[arg(required = true)]
        group_names: Vec<String>,
        /// Send the names as a list even when there is only one.
        #[arg(long)]
        list: bool,
    },
    /// Flush queued events.
    Upload,
    /// Run every call once against the instance.
    Walkthrough {
        #[arg(long)]
        api_key: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct RevenueArgs {
    pub price: f64,
    #[arg(long)]
    pub product_id: Option<String>,
    #[arg(long, default_value_t = 1)]
    pub quantity: u32,
    #[arg(long)]
    pub revenue_type: Option<String>,
    #[arg(long)]
    pub receipt: Option<String>,
    #[arg(long, requires = "receipt")]
    pub receipt_signature: Option<String>,
    #[arg(long = "property", value_parser = parse_property)]
    pub properties: Vec<Property>,
}

impl RevenueArgs {
    pub fn to_revenue(&self) -> Revenue {
        let mut revenue = Revenue::new(self.price).quantity(self.quantity);
        if let Some(id) = &self.product_id {
            revenue = revenue.product_id(id);
        }
        if let Some(kind) = &self.revenue_type {
            revenue = revenue.revenue_type(kind);
        }
        if let Some(receipt) = &self.receipt {
            revenue = revenue.receipt(receipt, self.receipt_signature.clone());
        }
        if !self.properties.is_empty() {
            revenue = revenue.event_properties(to_properties(&self.properties));
        }
        revenue
    }
}

/// One flag per identify operation, each repeatable.
#[derive(Debug, Default, Args)]
pub struct IdentifyArgs {
    #[arg(long, value_parser = parse_property)]
    pub set: Vec<Property>,
    #[arg(long, value_parser = parse_property)]
    pub set_once: Vec<Property>,
    #[arg(long, value_parser = parse_property)]
    pub add: Vec<Property>,
    #[arg(long, value_parser = parse_property)]
    pub append: Vec<Property>,
    #[arg(long, value_parser = parse_property)]
    pub prepend: Vec<Property>,
    #[arg(long, value_parser = parse_property)]
    pub pre_insert: Vec<Property>,
    #[arg(long, value_parser = parse_property)]
    pub post_insert: Vec<Property>,
    #[arg(long, value_parser = parse_property)]
    pub remove: Vec<Property>,
    #[arg(long)]
    pub unset: Vec<String>,
}

impl IdentifyArgs {
    pub fn to_identify(&self) -> Identify {
        let ops: [(&[Property], fn(Identify, String, PropertyValue) -> Identify); 8] = [
            (self.set.as_slice(), |i, k, v| i.set(k, v)),
            (self.set_once.as_slice(), |i, k, v| i.set_once(k, v)),
            (self.add.as_slice(), |i, k, v| i.add(k, v)),
            (self.append.as_slice(), |i, k, v| i.append(k, v)),
            (self.prepend.as_slice(), |i, k, v| i.prepend(k, v)),
            (self.pre_insert.as_slice(), |i, k, v| i.pre_insert(k, v)),
            (self.post_insert.as_slice(), |i, k, v| i.post_insert(k, v)),
            (self.remove.as_slice(), |i, k, v| i.remove(k, v)),
        ];

        let mut identify = Identify::new();
        for (pairs, apply) in ops {
            for (key, value) in pairs {
                identify = apply(identify, key.clone(), value.clone());
            }
        }
        for key in &self.unset {
            identify = identify.unset(key);
        }
        identify
    }
}

/// Parse `key=value`. The value is read as JSON when it parses, otherwise
/// kept as a plain string, so `n=3` is a number and `name=Ada` a string.
pub fn parse_property(raw: &str) -> Result<Property, String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))?;
    if key.is_empty() {
        return Err(format!("empty key in `{raw}`"));
    }
    let value = serde_json::from_str::<PropertyValue>(value)
        .unwrap_or_else(|_| PropertyValue::String(value.to_owned()));
    Ok((key.to_owned(), value))
}

pub fn to_properties(pairs: &[Property]) -> Properties {
    pairs.iter().cloned().collect()
}

/// A single name stays a single name unless `as_list` is set; several
/// always become a list.
pub fn group_name(mut names: Vec<String>, as_list: bool) -> GroupName {
    if names.len() == 1 && !as_list {
        GroupName::One(names.remove(0))
    } else {
        GroupName::Many(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::IdentifyOperation;

    #[test]
    fn property_values_parse_as_json_first() {
        assert_eq!(parse_property("n=3").unwrap(), ("n".into(), PropertyValue::Integer(3)));
        assert_eq!(parse_property("ok=true").unwrap(), ("ok".into(), PropertyValue::Bool(true)));
        assert_eq!(
            parse_property("name=Ada").unwrap(),
            ("name".into(), PropertyValue::String("Ada".into()))
        );
        assert_eq!(
            parse_property("tags=[\"a\",\"b\"]").unwrap(),
            ("tags".into(), PropertyValue::List(vec!["a".into(), "b".into()]))
        );
        // Only the first `=` splits.
        assert_eq!(
            parse_property("q=a=b").unwrap(),
            ("q".into(), PropertyValue::String("a=b".into()))
        );
    }

    #[test]
    fn malformed_properties_are_rejected() {
        assert!(parse_property("novalue").is_err());
        assert!(parse_property("=1").is_err());
    }

    #[test]
    fn group_name_keeps_single_names_scalar() {
        assert_eq!(group_name(vec!["a".into()], false), GroupName::One("a".into()));
        assert_eq!(
            group_name(vec!["a".into(), "b".into()], false),
            GroupName::Many(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn list_flag_keeps_a_single_name_as_a_list() {
        let cli = Cli::parse_from(["beacon-demo", "set-group", "orgId", "a", "--list"]);
        let Command::SetGroup {
            group_names, list, ..
        } = cli.command
        else {
            panic!("expected set-group");
        };
        assert_eq!(group_name(group_names, list), GroupName::Many(vec!["a".into()]));
    }

    #[test]
    fn identify_flags_build_payload() {
        let cli = Cli::parse_from([
            "beacon-demo",
            "identify",
            "--set",
            "plan=pro",
            "--add",
            "logins=1",
            "--unset",
            "legacy",
        ]);
        let Command::Identify(args) = cli.command else {
            panic!("expected identify");
        };
        let identify = args.to_identify();

        assert_eq!(identify.operations().len(), 3);
        assert_eq!(
            identify.get(IdentifyOperation::Unset).unwrap()["legacy"],
            PropertyValue::String("-".into())
        );
    }

    #[test]
    fn revenue_flags_build_record() {
        let cli = Cli::parse_from([
            "beacon-demo",
            "--instance",
            "shop",
            "revenue",
            "4.5",
            "--product-id",
            "sku-1",
            "--quantity",
            "2",
        ]);
        assert_eq!(cli.instance, "shop");
        let Command::Revenue(args) = cli.command else {
            panic!("expected revenue");
        };
        let revenue = args.to_revenue();

        assert_eq!(revenue.price, 4.5);
        assert_eq!(revenue.quantity, 2);
        assert_eq!(revenue.product_id.as_deref(), Some("sku-1"));
        assert!(revenue.event_properties.is_none());
    }

    #[test]
    fn boolean_subcommands_take_explicit_values() {
        let cli = Cli::parse_from(["beacon-demo", "coppa", "false"]);
        assert!(matches!(cli.command, Command::Coppa { enabled: false }));
    }
}
