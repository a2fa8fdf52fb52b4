// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// iOS analytics bridge via objc2.
//
// Requires the vendor SDK (`Amplitude-iOS`) linked into the host app. Every
// call resolves the named client with `[Amplitude instanceWithName:]` and sends
// the matching message to it. The SDK is thread-safe (it hops onto its own
// background queue), so unlike UIKit calls these do not need the main thread.
//
// Property maps and list values are converted by round-tripping through
// `NSJSONSerialization`, which yields the `NSDictionary` / `NSArray` /
// `NSNumber` / `NSString` objects the SDK expects.
//
// Unsafe code here is limited to `msg_send!` with selectors taken from the
// SDK's public headers, each annotated with its argument and return types.

#![cfg(target_os = "ios")]

use std::ffi::CStr;
use std::time::Duration;

use async_trait::async_trait;
use objc2::msg_send;
use objc2::rc::Retained;
use objc2::runtime::{AnyClass, AnyObject, Bool};
use objc2_foundation::{NSData, NSJSONReadingOptions, NSJSONSerialization, NSNumber, NSString};

use beacon_core::error::{BeaconError, Result};
use beacon_core::identify::IdentifyOperation;
use beacon_core::{GroupName, Identify, Properties, Revenue, properties_to_json};

use crate::traits::AnalyticsBridge;

// ---------------------------------------------------------------------------
// Runtime lookups
// ---------------------------------------------------------------------------

/// Look up an SDK class, failing cleanly if the SDK is not linked.
fn sdk_class(name: &CStr) -> Result<&'static AnyClass> {
    AnyClass::get(name).ok_or_else(|| {
        BeaconError::Bridge(format!(
            "class {} not found; is the analytics SDK linked?",
            name.to_string_lossy()
        ))
    })
}

/// `[Amplitude instanceWithName:instance]`.
fn client(instance: &str) -> Result<Retained<AnyObject>> {
    let cls = sdk_class(c"Amplitude")?;
    let ns_name = NSString::from_str(instance);
    // SAFETY: +[Amplitude instanceWithName:(NSString *)] -> Amplitude *.
    // Returns the shared instance for the name, creating it if needed.
    let obj: Option<Retained<AnyObject>> = unsafe { msg_send![cls, instanceWithName: &*ns_name] };
    obj.ok_or_else(|| BeaconError::Bridge(format!("no SDK instance for {instance:?}")))
}

/// Parse JSON text into Foundation objects (fragments allowed for scalars).
fn json_to_object(json: &str) -> Result<Retained<AnyObject>> {
    let data = NSData::with_bytes(json.as_bytes());
    // SAFETY: `data` is a valid NSData for the duration of the call.
    unsafe {
        NSJSONSerialization::JSONObjectWithData_options_error(
            &data,
            NSJSONReadingOptions::FragmentsAllowed,
        )
    }
    .map_err(|e| BeaconError::Bridge(format!("NSJSONSerialization: {}", e.localizedDescription())))
}

fn dictionary(properties: &Properties) -> Result<Retained<AnyObject>> {
    json_to_object(&properties_to_json(properties)?)
}

/// `NSString` for one group name, `NSArray` for several.
fn group_name_object(name: &GroupName) -> Result<Retained<AnyObject>> {
    // GroupName serializes untagged, so a single name is a string fragment.
    json_to_object(&serde_json::to_string(name)?)
}

// ---------------------------------------------------------------------------
// Identify / Revenue builders
// ---------------------------------------------------------------------------

/// Replay an identify payload onto a fresh `AMPIdentify`.
fn build_identify(identify: &Identify) -> Result<Retained<AnyObject>> {
    identify.check_finite()?;
    let cls = sdk_class(c"AMPIdentify")?;
    // SAFETY: +[AMPIdentify identify] -> AMPIdentify *.
    let amp: Option<Retained<AnyObject>> = unsafe { msg_send![cls, identify] };
    let amp = amp.ok_or_else(|| BeaconError::Bridge("AMPIdentify identify returned nil".into()))?;

    for (op, properties) in identify.operations() {
        for (key, value) in properties {
            let ns_key = NSString::from_str(key);
            let ns_value = json_to_object(&value.to_json()?)?;
            let (k, v): (&NSString, &AnyObject) = (&ns_key, &ns_value);
            // SAFETY: every AMPIdentify mutator takes (NSString *, NSObject *)
            // (unset: takes only the key) and returns the receiver.
            let _: Option<Retained<AnyObject>> = unsafe {
                match op {
                    IdentifyOperation::Set => msg_send![&*amp, set: k, value: v],
                    IdentifyOperation::SetOnce => msg_send![&*amp, setOnce: k, value: v],
                    IdentifyOperation::Add => msg_send![&*amp, add: k, value: v],
                    IdentifyOperation::Append => msg_send![&*amp, append: k, value: v],
                    IdentifyOperation::Prepend => msg_send![&*amp, prepend: k, value: v],
                    IdentifyOperation::PreInsert => msg_send![&*amp, preInsert: k, value: v],
                    IdentifyOperation::PostInsert => msg_send![&*amp, postInsert: k, value: v],
                    IdentifyOperation::Remove => msg_send![&*amp, remove: k, value: v],
                    IdentifyOperation::Unset => msg_send![&*amp, unset: k],
                }
            };
        }
    }

    Ok(amp)
}

/// Build an `AMPRevenue` from the record.
///
/// The iOS SDK validates receipts without a signature, so
/// `receipt_signature` is not forwarded.
fn build_revenue(revenue: &Revenue) -> Result<Retained<AnyObject>> {
    let cls = sdk_class(c"AMPRevenue")?;
    // SAFETY: +[AMPRevenue revenue] -> AMPRevenue *.
    let amp: Option<Retained<AnyObject>> = unsafe { msg_send![cls, revenue] };
    let amp = amp.ok_or_else(|| BeaconError::Bridge("AMPRevenue revenue returned nil".into()))?;

    let price = NSNumber::new_f64(revenue.price);
    let quantity = isize::try_from(revenue.quantity).unwrap_or(isize::MAX);
    // SAFETY: -setPrice:(NSNumber *) and -setQuantity:(NSInteger), both
    // returning the receiver.
    unsafe {
        let _: Option<Retained<AnyObject>> = msg_send![&*amp, setPrice: &*price];
        let _: Option<Retained<AnyObject>> = msg_send![&*amp, setQuantity: quantity];
    }

    if let Some(product_id) = &revenue.product_id {
        let ns = NSString::from_str(product_id);
        // SAFETY: -setProductIdentifier:(NSString *) -> AMPRevenue *.
        let _: Option<Retained<AnyObject>> = unsafe { msg_send![&*amp, setProductIdentifier: &*ns] };
    }

    if let Some(revenue_type) = &revenue.revenue_type {
        let ns = NSString::from_str(revenue_type);
        // SAFETY: -setRevenueType:(NSString *) -> AMPRevenue *.
        let _: Option<Retained<AnyObject>> = unsafe { msg_send![&*amp, setRevenueType: &*ns] };
    }

    if let Some(receipt) = &revenue.receipt {
        let data = NSData::with_bytes(receipt.as_bytes());
        // SAFETY: -setReceipt:(NSData *) -> AMPRevenue *.
        let _: Option<Retained<AnyObject>> = unsafe { msg_send![&*amp, setReceipt: &*data] };
        if revenue.receipt_signature.is_some() {
            tracing::debug!("iOS: receipt signature ignored (Android only)");
        }
    }

    if let Some(properties) = &revenue.event_properties {
        let dict = dictionary(properties)?;
        // SAFETY: -setEventProperties:(NSDictionary *) -> AMPRevenue *.
        let _: Option<Retained<AnyObject>> = unsafe { msg_send![&*amp, setEventProperties: &*dict] };
    }

    Ok(amp)
}

// ---------------------------------------------------------------------------
// Bridge struct
// ---------------------------------------------------------------------------

/// iOS implementation of the analytics bridge.
pub struct IosBridge;

impl IosBridge {
    pub fn new() -> Self {
        Self
    }

    /// Resolve the named SDK instance and run `f` against it.
    fn call(
        &self,
        instance: &str,
        operation: &'static str,
        f: impl FnOnce(&AnyObject) -> Result<()>,
    ) -> Result<bool> {
        tracing::debug!(instance, operation, "iOS: forwarding analytics call");
        let amp = client(instance)?;
        f(&amp)?;
        Ok(true)
    }
}

impl Default for IosBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnalyticsBridge for IosBridge {
    fn platform_name(&self) -> &str {
        "iOS"
    }

    async fn set_library_name(&self, instance: &str, name: &str) -> Result<bool> {
        self.call(instance, "set_library_name", |amp| {
            let ns = NSString::from_str(name);
            // SAFETY: libraryName is an NSString property; setter returns void.
            let _: () = unsafe { msg_send![amp, setLibraryName: &*ns] };
            Ok(())
        })
    }

    async fn set_library_version(&self, instance: &str, version: &str) -> Result<bool> {
        self.call(instance, "set_library_version", |amp| {
            let ns = NSString::from_str(version);
            // SAFETY: libraryVersion is an NSString property; setter returns void.
            let _: () = unsafe { msg_send![amp, setLibraryVersion: &*ns] };
            Ok(())
        })
    }

    async fn initialize(&self, instance: &str, api_key: &str) -> Result<bool> {
        self.call(instance, "initialize", |amp| {
            let ns = NSString::from_str(api_key);
            // SAFETY: -initializeApiKey:(NSString *) returns void.
            let _: () = unsafe { msg_send![amp, initializeApiKey: &*ns] };
            Ok(())
        })
    }

    async fn log_event(&self, instance: &str, event_type: &str) -> Result<bool> {
        self.call(instance, "log_event", |amp| {
            let ns = NSString::from_str(event_type);
            // SAFETY: -logEvent:(NSString *) returns void.
            let _: () = unsafe { msg_send![amp, logEvent: &*ns] };
            Ok(())
        })
    }

    async fn log_event_with_properties(
        &self,
        instance: &str,
        event_type: &str,
        properties: &Properties,
    ) -> Result<bool> {
        self.call(instance, "log_event_with_properties", |amp| {
            let ns = NSString::from_str(event_type);
            let dict = dictionary(properties)?;
            // SAFETY: -logEvent:(NSString *)withEventProperties:(NSDictionary *)
            // returns void.
            let _: () = unsafe { msg_send![amp, logEvent: &*ns, withEventProperties: &*dict] };
            Ok(())
        })
    }

    async fn log_revenue(&self, instance: &str, revenue: &Revenue) -> Result<bool> {
        self.call(instance, "log_revenue", |amp| {
            let amp_revenue = build_revenue(revenue)?;
            // SAFETY: -logRevenueV2:(AMPRevenue *) returns void.
            let _: () = unsafe { msg_send![amp, logRevenueV2: &*amp_revenue] };
            Ok(())
        })
    }

    async fn upload_events(&self, instance: &str) -> Result<bool> {
        self.call(instance, "upload_events", |amp| {
            // SAFETY: -uploadEvents returns void.
            let _: () = unsafe { msg_send![amp, uploadEvents] };
            Ok(())
        })
    }

    async fn set_user_properties(&self, instance: &str, properties: &Properties) -> Result<bool> {
        self.call(instance, "set_user_properties", |amp| {
            let dict = dictionary(properties)?;
            // SAFETY: -setUserProperties:(NSDictionary *) returns void.
            let _: () = unsafe { msg_send![amp, setUserProperties: &*dict] };
            Ok(())
        })
    }

    async fn clear_user_properties(&self, instance: &str) -> Result<bool> {
        self.call(instance, "clear_user_properties", |amp| {
            // SAFETY: -clearUserProperties returns void.
            let _: () = unsafe { msg_send![amp, clearUserProperties] };
            Ok(())
        })
    }

    async fn set_user_id(&self, instance: &str, user_id: Option<&str>) -> Result<bool> {
        self.call(instance, "set_user_id", |amp| {
            let ns = user_id.map(NSString::from_str);
            let arg: Option<&NSString> = ns.as_deref();
            // SAFETY: -setUserId:(nullable NSString *) returns void; nil clears.
            let _: () = unsafe { msg_send![amp, setUserId: arg] };
            Ok(())
        })
    }

    async fn identify(&self, instance: &str, identify: &Identify) -> Result<bool> {
        self.call(instance, "identify", |amp| {
            let amp_identify = build_identify(identify)?;
            // SAFETY: -identify:(AMPIdentify *) returns void.
            let _: () = unsafe { msg_send![amp, identify: &*amp_identify] };
            Ok(())
        })
    }

    async fn set_group(
        &self,
        instance: &str,
        group_type: &str,
        group_name: &GroupName,
    ) -> Result<bool> {
        self.call(instance, "set_group", |amp| {
            let ns_type = NSString::from_str(group_type);
            let name = group_name_object(group_name)?;
            // SAFETY: -setGroup:(NSString *)groupName:(NSObject *) returns void.
            let _: () = unsafe { msg_send![amp, setGroup: &*ns_type, groupName: &*name] };
            Ok(())
        })
    }

    async fn group_identify(
        &self,
        instance: &str,
        group_type: &str,
        group_name: &GroupName,
        identify: &Identify,
    ) -> Result<bool> {
        self.call(instance, "group_identify", |amp| {
            let ns_type = NSString::from_str(group_type);
            let name = group_name_object(group_name)?;
            let amp_identify = build_identify(identify)?;
            // SAFETY: -groupIdentifyWithGroupType:(NSString *)groupName:(NSObject *)
            // groupIdentify:(AMPIdentify *) returns void.
            let _: () = unsafe {
                msg_send![
                    amp,
                    groupIdentifyWithGroupType: &*ns_type,
                    groupName: &*name,
                    groupIdentify: &*amp_identify
                ]
            };
            Ok(())
        })
    }

    async fn enable_coppa_control(&self, instance: &str) -> Result<bool> {
        self.call(instance, "enable_coppa_control", |amp| {
            // SAFETY: -enableCoppaControl returns void.
            let _: () = unsafe { msg_send![amp, enableCoppaControl] };
            Ok(())
        })
    }

    async fn disable_coppa_control(&self, instance: &str) -> Result<bool> {
        self.call(instance, "disable_coppa_control", |amp| {
            // SAFETY: -disableCoppaControl returns void.
            let _: () = unsafe { msg_send![amp, disableCoppaControl] };
            Ok(())
        })
    }

    async fn set_opt_out(&self, instance: &str, opt_out: bool) -> Result<bool> {
        self.call(instance, "set_opt_out", |amp| {
            // SAFETY: -setOptOut:(BOOL) returns void.
            let _: () = unsafe { msg_send![amp, setOptOut: Bool::new(opt_out)] };
            Ok(())
        })
    }

    async fn regenerate_device_id(&self, instance: &str) -> Result<bool> {
        self.call(instance, "regenerate_device_id", |amp| {
            // SAFETY: -regenerateDeviceId returns void.
            let _: () = unsafe { msg_send![amp, regenerateDeviceId] };
            Ok(())
        })
    }

    async fn set_device_id(&self, instance: &str, device_id: &str) -> Result<bool> {
        self.call(instance, "set_device_id", |amp| {
            let ns = NSString::from_str(device_id);
            // SAFETY: -setDeviceId:(NSString *) returns void.
            let _: () = unsafe { msg_send![amp, setDeviceId: &*ns] };
            Ok(())
        })
    }

    async fn set_server_url(&self, instance: &str, server_url: &str) -> Result<bool> {
        self.call(instance, "set_server_url", |amp| {
            let ns = NSString::from_str(server_url);
            // SAFETY: -setServerUrl:(NSString *) returns void.
            let _: () = unsafe { msg_send![amp, setServerUrl: &*ns] };
            Ok(())
        })
    }

    async fn set_use_dynamic_config(&self, instance: &str, enabled: bool) -> Result<bool> {
        self.call(instance, "set_use_dynamic_config", |amp| {
            // SAFETY: useDynamicConfig is a BOOL property; setter returns void.
            let _: () = unsafe { msg_send![amp, setUseDynamicConfig: Bool::new(enabled)] };
            Ok(())
        })
    }

    async fn track_session_events(&self, instance: &str, enabled: bool) -> Result<bool> {
        self.call(instance, "track_session_events", |amp| {
            // SAFETY: trackingSessionEvents is a BOOL property; setter returns void.
            let _: () = unsafe { msg_send![amp, setTrackingSessionEvents: Bool::new(enabled)] };
            Ok(())
        })
    }

    async fn set_min_time_between_sessions(&self, instance: &str, gap: Duration) -> Result<bool> {
        let millis = i64::try_from(gap.as_millis()).unwrap_or(i64::MAX);
        self.call(instance, "set_min_time_between_sessions", |amp| {
            // SAFETY: minTimeBetweenSessionsMillis is a `long` property (64-bit on iOS).
            let _: () = unsafe { msg_send![amp, setMinTimeBetweenSessionsMillis: millis] };
            Ok(())
        })
    }

    async fn set_event_upload_threshold(&self, instance: &str, threshold: u32) -> Result<bool> {
        let threshold = i32::try_from(threshold).unwrap_or(i32::MAX);
        self.call(instance, "set_event_upload_threshold", |amp| {
            // SAFETY: eventUploadThreshold is an `int` property.
            let _: () = unsafe { msg_send![amp, setEventUploadThreshold: threshold] };
            Ok(())
        })
    }

    async fn set_event_upload_period(&self, instance: &str, period: Duration) -> Result<bool> {
        // The iOS SDK counts the upload period in whole seconds.
        let seconds = i32::try_from(period.as_secs()).unwrap_or(i32::MAX);
        self.call(instance, "set_event_upload_period", |amp| {
            // SAFETY: eventUploadPeriodSeconds is an `int` property.
            let _: () = unsafe { msg_send![amp, setEventUploadPeriodSeconds: seconds] };
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_name() {
        assert_eq!(IosBridge::new().platform_name(), "iOS");
    }

    // Calls into the SDK need the framework linked into a running app.
    // They are exercised in the Xcode test target rather than via `cargo test`.
}
