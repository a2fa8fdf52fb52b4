// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core value types passed across the analytics bridge.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BeaconError, Result};

/// Instance name used when the caller does not pick one.
pub const DEFAULT_INSTANCE: &str = "$default_instance";

/// Arbitrary event / user / group properties.
///
/// Ordered so that the JSON handed to the native SDK is deterministic.
pub type Properties = BTreeMap<String, PropertyValue>;

/// A single property value.
///
/// Serialized untagged, so a `Properties` map renders as plain JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<PropertyValue>),
    Map(Properties),
}

impl PropertyValue {
    /// False if this value, or anything nested in it, is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Float(v) => v.is_finite(),
            Self::List(items) => items.iter().all(Self::is_finite),
            Self::Map(map) => map.values().all(Self::is_finite),
            Self::Bool(_) | Self::Integer(_) | Self::String(_) => true,
        }
    }

    /// JSON text for this value (a fragment when the value is a scalar).
    pub fn to_json(&self) -> Result<String> {
        if !self.is_finite() {
            return Err(BeaconError::NonFiniteNumber("value".into()));
        }
        Ok(serde_json::to_string(self)?)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        Self::Integer(v.into())
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<u32> for PropertyValue {
    fn from(v: u32) -> Self {
        Self::Integer(v.into())
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl<T: Into<PropertyValue>> From<Vec<T>> for PropertyValue {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl From<Properties> for PropertyValue {
    fn from(v: Properties) -> Self {
        Self::Map(v)
    }
}

/// JSON object text for a property map.
pub fn properties_to_json(properties: &Properties) -> Result<String> {
    check_properties(properties)?;
    Ok(serde_json::to_string(properties)?)
}

/// Fail with the first key whose value cannot be represented in JSON.
pub fn check_properties(properties: &Properties) -> Result<()> {
    match properties.iter().find(|(_, value)| !value.is_finite()) {
        Some((key, _)) => Err(BeaconError::NonFiniteNumber(key.clone())),
        None => Ok(()),
    }
}

/// A group name: either one name or a list of names.
///
/// Forwarded exactly as given; a single name is never wrapped into a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupName {
    One(String),
    Many(Vec<String>),
}

impl From<&str> for GroupName {
    fn from(v: &str) -> Self {
        Self::One(v.to_owned())
    }
}

impl From<String> for GroupName {
    fn from(v: String) -> Self {
        Self::One(v)
    }
}

impl From<Vec<String>> for GroupName {
    fn from(v: Vec<String>) -> Self {
        Self::Many(v)
    }
}

impl From<Vec<&str>> for GroupName {
    fn from(v: Vec<&str>) -> Self {
        Self::Many(v.into_iter().map(str::to_owned).collect())
    }
}

impl<const N: usize> From<[&str; N]> for GroupName {
    fn from(v: [&str; N]) -> Self {
        Self::Many(v.iter().map(|s| (*s).to_owned()).collect())
    }
}

impl fmt::Display for GroupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One(name) => f.write_str(name),
            Self::Many(names) => write!(f, "[{}]", names.join(", ")),
        }
    }
}

fn default_quantity() -> u32 {
    1
}

/// A revenue record, forwarded to the native SDK in one call.
///
/// Only `price` is required. The SDK itself validates the record; nothing
/// here rejects e.g. a negative price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Revenue {
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<String>,
    /// Android only; the iOS SDK verifies receipts without a signature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_properties: Option<Properties>,
}

impl Revenue {
    pub fn new(price: f64) -> Self {
        Self {
            price,
            product_id: None,
            quantity: default_quantity(),
            revenue_type: None,
            receipt: None,
            receipt_signature: None,
            event_properties: None,
        }
    }

    pub fn product_id(mut self, product_id: impl Into<String>) -> Self {
        self.product_id = Some(product_id.into());
        self
    }

    pub fn quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn revenue_type(mut self, revenue_type: impl Into<String>) -> Self {
        self.revenue_type = Some(revenue_type.into());
        self
    }

    /// Attach a store receipt and, on Android, its signature.
    pub fn receipt(mut self, receipt: impl Into<String>, signature: Option<String>) -> Self {
        self.receipt = Some(receipt.into());
        self.receipt_signature = signature;
        self
    }

    pub fn event_properties(mut self, properties: Properties) -> Self {
        self.event_properties = Some(properties);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn properties_render_as_plain_json() {
        let mut nested = Properties::new();
        nested.insert("tier".into(), "gold".into());

        let mut props = Properties::new();
        props.insert("count".into(), 3.into());
        props.insert("ratio".into(), 0.5.into());
        props.insert("beta".into(), true.into());
        props.insert("tags".into(), vec!["a", "b"].into());
        props.insert("plan".into(), nested.into());

        let json = properties_to_json(&props).unwrap();
        assert_eq!(
            json,
            r#"{"beta":true,"count":3,"plan":{"tier":"gold"},"ratio":0.5,"tags":["a","b"]}"#
        );
    }

    #[test]
    fn integers_stay_integers_when_parsed() {
        let v: PropertyValue = serde_json::from_str("5").unwrap();
        assert_eq!(v, PropertyValue::Integer(5));
        let v: PropertyValue = serde_json::from_str("5.25").unwrap();
        assert_eq!(v, PropertyValue::Float(5.25));
    }

    #[test]
    fn non_finite_floats_are_refused() {
        let mut props = Properties::new();
        props.insert("ok".into(), 1.into());
        props.insert("x".into(), f64::NAN.into());
        let err = properties_to_json(&props).unwrap_err();
        assert!(matches!(err, BeaconError::NonFiniteNumber(ref key) if key == "x"));

        let nested = PropertyValue::List(vec![1.5.into(), f64::INFINITY.into()]);
        assert!(!nested.is_finite());
        assert!(matches!(nested.to_json(), Err(BeaconError::NonFiniteNumber(_))));
        assert!(PropertyValue::from(0.25).is_finite());
    }

    #[test]
    fn scalar_fragment_json() {
        assert_eq!(PropertyValue::from("-").to_json().unwrap(), r#""-""#);
        assert_eq!(PropertyValue::from(7).to_json().unwrap(), "7");
    }

    #[test]
    fn revenue_with_price_only_defaults_quantity() {
        let revenue = Revenue::new(3.99);
        assert_eq!(revenue.quantity, 1);
        assert!(revenue.product_id.is_none());
        assert!(revenue.event_properties.is_none());

        let json = serde_json::to_value(&revenue).unwrap();
        assert_eq!(json, serde_json::json!({ "price": 3.99, "quantity": 1 }));
    }

    #[test]
    fn revenue_missing_quantity_deserializes_to_one() {
        let revenue: Revenue = serde_json::from_str(r#"{"price": 1.5, "productId": "sku"}"#).unwrap();
        assert_eq!(revenue.quantity, 1);
        assert_eq!(revenue.product_id.as_deref(), Some("sku"));
    }

    #[test]
    fn group_name_keeps_its_shape() {
        assert_eq!(GroupName::from("a"), GroupName::One("a".into()));
        assert_eq!(
            GroupName::from(["a", "b"]),
            GroupName::Many(vec!["a".into(), "b".into()])
        );
        assert_eq!(serde_json::to_string(&GroupName::from("a")).unwrap(), r#""a""#);
        assert_eq!(
            serde_json::to_string(&GroupName::from(vec!["a"])).unwrap(),
            r#"["a"]"#
        );
    }
}
