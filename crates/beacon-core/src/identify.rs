// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Identify payload builder.
//
// An identify payload groups user (or group) property mutations by operation
// keyword and is submitted to the SDK as one unit:
//
//     {"$set": {"plan": "pro"}, "$add": {"logins": 1}, "$unset": {"trial": "-"}}

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{Properties, PropertyValue, check_properties};

/// Value stored for `$unset` keys. The SDK only reads the key.
pub const UNSET_PLACEHOLDER: &str = "-";

/// Property operation keywords understood by the SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IdentifyOperation {
    #[serde(rename = "$set")]
    Set,
    #[serde(rename = "$setOnce")]
    SetOnce,
    #[serde(rename = "$add")]
    Add,
    #[serde(rename = "$append")]
    Append,
    #[serde(rename = "$prepend")]
    Prepend,
    #[serde(rename = "$preInsert")]
    PreInsert,
    #[serde(rename = "$postInsert")]
    PostInsert,
    #[serde(rename = "$remove")]
    Remove,
    #[serde(rename = "$unset")]
    Unset,
}

impl IdentifyOperation {
    /// Wire keyword, e.g. `"$setOnce"`.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Set => "$set",
            Self::SetOnce => "$setOnce",
            Self::Add => "$add",
            Self::Append => "$append",
            Self::Prepend => "$prepend",
            Self::PreInsert => "$preInsert",
            Self::PostInsert => "$postInsert",
            Self::Remove => "$remove",
            Self::Unset => "$unset",
        }
    }

    /// Native SDK method name (`setOnce`, `preInsert`, ...).
    pub fn method_name(self) -> &'static str {
        &self.keyword()[1..]
    }
}

impl fmt::Display for IdentifyOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Accumulates property operations for one identify / group-identify call.
///
/// Builder calls consume and return `self`. Setting the same key twice under
/// one operation keeps the last value. Submission only borrows the payload;
/// changing it afterwards does not affect calls already made.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identify {
    operations: BTreeMap<IdentifyOperation, Properties>,
}

impl Identify {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment a numeric property.
    pub fn add(self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.record(IdentifyOperation::Add, key, value)
    }

    /// Append to a list property, creating it if needed.
    pub fn append(self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.record(IdentifyOperation::Append, key, value)
    }

    pub fn prepend(self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.record(IdentifyOperation::Prepend, key, value)
    }

    pub fn set(self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.record(IdentifyOperation::Set, key, value)
    }

    /// Set a property only if it has no value yet.
    pub fn set_once(self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.record(IdentifyOperation::SetOnce, key, value)
    }

    /// Like `prepend`, but skips values already present in the list.
    pub fn pre_insert(self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.record(IdentifyOperation::PreInsert, key, value)
    }

    /// Like `append`, but skips values already present in the list.
    pub fn post_insert(self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.record(IdentifyOperation::PostInsert, key, value)
    }

    /// Remove values from a list property.
    pub fn remove(self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.record(IdentifyOperation::Remove, key, value)
    }

    pub fn unset(self, key: impl Into<String>) -> Self {
        self.record(IdentifyOperation::Unset, key, UNSET_PLACEHOLDER)
    }

    fn record(
        mut self,
        op: IdentifyOperation,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Self {
        self.operations
            .entry(op)
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    /// Read-only view of the accumulated payload.
    pub fn operations(&self) -> &BTreeMap<IdentifyOperation, Properties> {
        &self.operations
    }

    /// Properties recorded under one operation, if any.
    pub fn get(&self, op: IdentifyOperation) -> Option<&Properties> {
        self.operations.get(&op)
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Fails on the first NaN or infinite value in any operation.
    pub fn check_finite(&self) -> Result<()> {
        self.operations.values().try_for_each(check_properties)
    }

    /// Payload as the SDK's JSON object (`{"$set": {...}, ...}`).
    pub fn to_json(&self) -> Result<String> {
        self.check_finite()?;
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_add_unset_payload() {
        let identify = Identify::new().set("k1", "v1").add("k2", 5).unset("k3");

        let ops: Vec<_> = identify.operations().keys().copied().collect();
        assert_eq!(
            ops,
            vec![IdentifyOperation::Set, IdentifyOperation::Add, IdentifyOperation::Unset]
        );

        let json: serde_json::Value = serde_json::from_str(&identify.to_json().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "$set": { "k1": "v1" },
                "$add": { "k2": 5 },
                "$unset": { "k3": "-" },
            })
        );
    }

    #[test]
    fn same_key_same_operation_keeps_last_value() {
        let identify = Identify::new().set("plan", "free").set("plan", "pro");
        let set = identify.get(IdentifyOperation::Set).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set["plan"], PropertyValue::from("pro"));
    }

    #[test]
    fn empty_builder_has_no_operations() {
        let identify = Identify::new();
        assert!(identify.is_empty());
        assert_eq!(identify.to_json().unwrap(), "{}");
    }

    #[test]
    fn method_names_strip_the_dollar() {
        assert_eq!(IdentifyOperation::SetOnce.method_name(), "setOnce");
        assert_eq!(IdentifyOperation::PostInsert.method_name(), "postInsert");
        assert_eq!(IdentifyOperation::Unset.keyword(), "$unset");
    }

    #[test]
    fn non_finite_values_are_refused() {
        let identify = Identify::new().set("plan", "pro").add("score", f64::NAN);
        let err = identify.to_json().unwrap_err();
        assert!(matches!(err, crate::BeaconError::NonFiniteNumber(ref key) if key == "score"));
    }

    #[test]
    fn payload_parses_back() {
        let identify = Identify::new()
            .append("tags", vec!["new"])
            .set_once("first_seen", "2026-01-01");
        let parsed: Identify = serde_json::from_str(&identify.to_json().unwrap()).unwrap();
        assert_eq!(parsed, identify);
    }
}
