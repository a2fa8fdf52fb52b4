// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Android analytics bridge via JNI.
//
// Requires the Android NDK and the vendor SDK (`com.amplitude:android-sdk`) on
// the app's classpath. Every call looks up the named client with
// `Amplitude.getInstance(name)` and invokes the matching method on it.
//
// ## Marshalling
//
// - Property maps are serialized to JSON and handed to `new JSONObject(String)`.
// - Group name lists become `new JSONArray(String)`; a single name stays a
//   `java.lang.String`. `setGroup(String, Object)` accepts either.
// - Identify payloads are replayed onto a fresh `com.amplitude.api.Identify`,
//   choosing the overload from the value's type.
// - Revenue records are built through the `com.amplitude.api.Revenue` setters.
//
// The SDK methods are synchronous and only enqueue work, so they are called
// directly from the async trait methods. A Java exception is cleared and
// reported as `BeaconError::Bridge`.

#![cfg(target_os = "android")]

use std::time::Duration;

use async_trait::async_trait;
use jni::objects::{JObject, JValue};
use jni::{JNIEnv, JavaVM};

use beacon_core::error::{BeaconError, Result};
use beacon_core::identify::IdentifyOperation;
use beacon_core::{GroupName, Identify, Properties, PropertyValue, Revenue, properties_to_json};

use crate::traits::AnalyticsBridge;

// ---------------------------------------------------------------------------
// Class names and signatures
// ---------------------------------------------------------------------------

const AMPLITUDE_CLASS: &str = "com/amplitude/api/Amplitude";
const IDENTIFY_CLASS: &str = "com/amplitude/api/Identify";
const REVENUE_CLASS: &str = "com/amplitude/api/Revenue";
const JSON_OBJECT_CLASS: &str = "org/json/JSONObject";
const JSON_ARRAY_CLASS: &str = "org/json/JSONArray";

/// Return type of the chainable `AmplitudeClient` setters.
const CLIENT_RET: &str = "Lcom/amplitude/api/AmplitudeClient;";
const IDENTIFY_RET: &str = "Lcom/amplitude/api/Identify;";
const REVENUE_RET: &str = "Lcom/amplitude/api/Revenue;";

// ---------------------------------------------------------------------------
// JNI bootstrap helpers
// ---------------------------------------------------------------------------

/// Run `f` with a [`JNIEnv`] attached to the current thread.
///
/// The `JavaVM*` comes from `ndk_context`, set by the NDK glue code. The
/// thread is detached again when the guard drops (if we attached it), which
/// also releases any local references created inside `f`.
fn with_env<T>(f: impl FnOnce(&mut JNIEnv) -> Result<T>) -> Result<T> {
    let ctx = ndk_context::android_context();
    // SAFETY: `ctx.vm()` returns the `JavaVM*` set by the NDK glue code.
    // The pointer is guaranteed valid for the lifetime of the process.
    let vm = unsafe { JavaVM::from_raw(ctx.vm().cast()) }
        .map_err(|e| BeaconError::Bridge(format!("failed to obtain JavaVM: {e}")))?;
    let mut env = vm
        .attach_current_thread()
        .map_err(|e| BeaconError::Bridge(format!("failed to attach JNI thread: {e}")))?;
    f(&mut env)
}

/// The hosting `Context`, needed by `AmplitudeClient.initialize`.
fn android_context() -> Result<JObject<'static>> {
    let ptr = ndk_context::android_context().context();
    if ptr.is_null() {
        return Err(BeaconError::Bridge(
            "Android context is null; native activity not initialised".into(),
        ));
    }
    // SAFETY: the NDK guarantees this pointer is a valid global jobject for
    // the hosting Activity / Application.
    Ok(unsafe { JObject::from_raw(ptr.cast()) })
}

/// Convenience: map any `jni::errors::Error` into `BeaconError::Bridge`.
fn jni_err(context: &str, e: jni::errors::Error) -> BeaconError {
    BeaconError::Bridge(format!("{context}: {e}"))
}

/// Clear a pending Java exception so the thread can keep making JNI calls.
fn clear_exception(env: &mut JNIEnv, operation: &str) {
    if env.exception_check().unwrap_or(false) {
        let _ = env.exception_describe();
        let _ = env.exception_clear();
        tracing::warn!(operation, "Android: analytics SDK threw a Java exception");
    }
}

fn new_jstring<'local>(env: &mut JNIEnv<'local>, s: &str) -> Result<JObject<'local>> {
    env.new_string(s)
        .map(JObject::from)
        .map_err(|e| jni_err("new_string", e))
}

fn json_object<'local>(env: &mut JNIEnv<'local>, properties: &Properties) -> Result<JObject<'local>> {
    let json = properties_to_json(properties)?;
    let j_json = new_jstring(env, &json)?;
    env.new_object(
        JSON_OBJECT_CLASS,
        "(Ljava/lang/String;)V",
        &[JValue::Object(&j_json)],
    )
    .map_err(|e| jni_err("new JSONObject", e))
}

fn json_array<'local>(env: &mut JNIEnv<'local>, json: &str) -> Result<JObject<'local>> {
    let j_json = new_jstring(env, json)?;
    env.new_object(
        JSON_ARRAY_CLASS,
        "(Ljava/lang/String;)V",
        &[JValue::Object(&j_json)],
    )
    .map_err(|e| jni_err("new JSONArray", e))
}

/// `String` for one group name, `JSONArray` for several.
fn group_name_object<'local>(env: &mut JNIEnv<'local>, name: &GroupName) -> Result<JObject<'local>> {
    match name {
        GroupName::One(n) => new_jstring(env, n),
        GroupName::Many(names) => {
            let json = serde_json::to_string(names)?;
            json_array(env, &json)
        }
    }
}

/// Call an instance method, discarding its return value.
fn invoke(
    env: &mut JNIEnv,
    target: &JObject,
    method: &str,
    sig: &str,
    args: &[JValue],
) -> Result<()> {
    env.call_method(target, method, sig, args)
        .map(|_| ())
        .map_err(|e| jni_err(method, e))
}

// ---------------------------------------------------------------------------
// Identify / Revenue builders
// ---------------------------------------------------------------------------

/// Replay an identify payload onto a new `com.amplitude.api.Identify`.
fn build_identify<'local>(env: &mut JNIEnv<'local>, identify: &Identify) -> Result<JObject<'local>> {
    identify.check_finite()?;
    let j_identify = env
        .new_object(IDENTIFY_CLASS, "()V", &[])
        .map_err(|e| jni_err("new Identify", e))?;

    for (op, properties) in identify.operations() {
        for (key, value) in properties {
            let j_key = new_jstring(env, key)?;
            if *op == IdentifyOperation::Unset {
                invoke(
                    env,
                    &j_identify,
                    "unset",
                    &format!("(Ljava/lang/String;){IDENTIFY_RET}"),
                    &[JValue::Object(&j_key)],
                )?;
                continue;
            }
            apply_identify_op(env, &j_identify, op.method_name(), &j_key, value)?;
        }
    }

    Ok(j_identify)
}

/// `identify.<method>(key, value)` using the overload matching the value type.
fn apply_identify_op(
    env: &mut JNIEnv,
    identify: &JObject,
    method: &str,
    key: &JObject,
    value: &PropertyValue,
) -> Result<()> {
    let holder: JObject;
    let (arg_sig, arg) = match value {
        PropertyValue::Bool(b) => ("Z", JValue::Bool(u8::from(*b))),
        PropertyValue::Integer(i) => ("J", JValue::Long(*i)),
        PropertyValue::Float(f) => ("D", JValue::Double(*f)),
        PropertyValue::String(s) => {
            holder = new_jstring(env, s)?;
            ("Ljava/lang/String;", JValue::Object(&holder))
        }
        PropertyValue::List(_) => {
            holder = json_array(env, &value.to_json()?)?;
            ("Lorg/json/JSONArray;", JValue::Object(&holder))
        }
        PropertyValue::Map(map) => {
            holder = json_object(env, map)?;
            ("Lorg/json/JSONObject;", JValue::Object(&holder))
        }
    };

    invoke(
        env,
        identify,
        method,
        &format!("(Ljava/lang/String;{arg_sig}){IDENTIFY_RET}"),
        &[JValue::Object(key), arg],
    )
}

/// Build a `com.amplitude.api.Revenue` from the record.
fn build_revenue<'local>(env: &mut JNIEnv<'local>, revenue: &Revenue) -> Result<JObject<'local>> {
    let j_revenue = env
        .new_object(REVENUE_CLASS, "()V", &[])
        .map_err(|e| jni_err("new Revenue", e))?;

    invoke(
        env,
        &j_revenue,
        "setPrice",
        &format!("(D){REVENUE_RET}"),
        &[JValue::Double(revenue.price)],
    )?;
    invoke(
        env,
        &j_revenue,
        "setQuantity",
        &format!("(I){REVENUE_RET}"),
        &[JValue::Int(i32::try_from(revenue.quantity).unwrap_or(i32::MAX))],
    )?;

    if let Some(product_id) = &revenue.product_id {
        let j_product = new_jstring(env, product_id)?;
        invoke(
            env,
            &j_revenue,
            "setProductId",
            &format!("(Ljava/lang/String;){REVENUE_RET}"),
            &[JValue::Object(&j_product)],
        )?;
    }

    if let Some(revenue_type) = &revenue.revenue_type {
        let j_type = new_jstring(env, revenue_type)?;
        invoke(
            env,
            &j_revenue,
            "setRevenueType",
            &format!("(Ljava/lang/String;){REVENUE_RET}"),
            &[JValue::Object(&j_type)],
        )?;
    }

    if let Some(receipt) = &revenue.receipt {
        let j_receipt = new_jstring(env, receipt)?;
        let j_signature = match &revenue.receipt_signature {
            Some(sig) => new_jstring(env, sig)?,
            None => JObject::null(),
        };
        invoke(
            env,
            &j_revenue,
            "setReceipt",
            &format!("(Ljava/lang/String;Ljava/lang/String;){REVENUE_RET}"),
            &[JValue::Object(&j_receipt), JValue::Object(&j_signature)],
        )?;
    }

    if let Some(properties) = &revenue.event_properties {
        let j_props = json_object(env, properties)?;
        invoke(
            env,
            &j_revenue,
            "setEventProperties",
            &format!("(Lorg/json/JSONObject;){REVENUE_RET}"),
            &[JValue::Object(&j_props)],
        )?;
    }

    Ok(j_revenue)
}

// ---------------------------------------------------------------------------
// Bridge struct
// ---------------------------------------------------------------------------

/// Android implementation of the analytics bridge.
///
/// Zero-sized; all state lives in the SDK's `AmplitudeClient` instances.
pub struct AndroidBridge;

impl AndroidBridge {
    /// Create a new Android bridge.
    ///
    /// This does **not** touch JNI. The first JNI call happens lazily when
    /// a trait method is invoked.
    pub fn new() -> Self {
        Self
    }

    /// Resolve the named `AmplitudeClient` and run `f` against it.
    fn call<F>(&self, instance: &str, operation: &'static str, f: F) -> Result<bool>
    where
        F: for<'local> FnOnce(&mut JNIEnv<'local>, &JObject<'local>) -> Result<()>,
    {
        tracing::debug!(instance, operation, "Android: forwarding analytics call");
        with_env(|env| {
            let outcome = match client(env, instance) {
                Ok(client) => f(env, &client),
                Err(e) => Err(e),
            };
            if outcome.is_err() {
                clear_exception(env, operation);
            }
            outcome.map(|()| true)
        })
    }

    /// Forward a setter taking one `String`.
    fn call_with_string(
        &self,
        instance: &str,
        operation: &'static str,
        method: &'static str,
        value: &str,
    ) -> Result<bool> {
        self.call(instance, operation, |env, client| {
            let j_value = new_jstring(env, value)?;
            invoke(
                env,
                client,
                method,
                &format!("(Ljava/lang/String;){CLIENT_RET}"),
                &[JValue::Object(&j_value)],
            )
        })
    }

    /// Forward a setter taking one `boolean`.
    fn call_with_bool(
        &self,
        instance: &str,
        operation: &'static str,
        method: &'static str,
        value: bool,
    ) -> Result<bool> {
        self.call(instance, operation, |env, client| {
            invoke(
                env,
                client,
                method,
                &format!("(Z){CLIENT_RET}"),
                &[JValue::Bool(u8::from(value))],
            )
        })
    }

    /// Forward a no-argument method.
    fn call_no_args(
        &self,
        instance: &str,
        operation: &'static str,
        method: &'static str,
        ret: &'static str,
    ) -> Result<bool> {
        self.call(instance, operation, |env, client| {
            invoke(env, client, method, &format!("(){ret}"), &[])
        })
    }
}

impl Default for AndroidBridge {
    fn default() -> Self {
        Self::new()
    }
}

/// `Amplitude.getInstance(instance)`.
fn client<'local>(env: &mut JNIEnv<'local>, instance: &str) -> Result<JObject<'local>> {
    let j_instance = new_jstring(env, instance)?;
    env.call_static_method(
        AMPLITUDE_CLASS,
        "getInstance",
        format!("(Ljava/lang/String;){CLIENT_RET}"),
        &[JValue::Object(&j_instance)],
    )
    .map_err(|e| jni_err("Amplitude.getInstance", e))?
    .l()
    .map_err(|e| jni_err("getInstance->l", e))
}

fn millis_i64(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

fn millis_i32(d: Duration) -> i32 {
    i32::try_from(d.as_millis()).unwrap_or(i32::MAX)
}

#[async_trait]
impl AnalyticsBridge for AndroidBridge {
    fn platform_name(&self) -> &str {
        "Android"
    }

    async fn set_library_name(&self, instance: &str, name: &str) -> Result<bool> {
        self.call_with_string(instance, "set_library_name", "setLibraryName", name)
    }

    async fn set_library_version(&self, instance: &str, version: &str) -> Result<bool> {
        self.call_with_string(instance, "set_library_version", "setLibraryVersion", version)
    }

    async fn initialize(&self, instance: &str, api_key: &str) -> Result<bool> {
        let context = android_context()?;
        self.call(instance, "initialize", |env, client| {
            let j_key = new_jstring(env, api_key)?;
            invoke(
                env,
                client,
                "initialize",
                &format!("(Landroid/content/Context;Ljava/lang/String;){CLIENT_RET}"),
                &[JValue::Object(&context), JValue::Object(&j_key)],
            )
        })
    }

    async fn log_event(&self, instance: &str, event_type: &str) -> Result<bool> {
        self.call(instance, "log_event", |env, client| {
            let j_event = new_jstring(env, event_type)?;
            invoke(
                env,
                client,
                "logEvent",
                "(Ljava/lang/String;)V",
                &[JValue::Object(&j_event)],
            )
        })
    }

    async fn log_event_with_properties(
        &self,
        instance: &str,
        event_type: &str,
        properties: &Properties,
    ) -> Result<bool> {
        self.call(instance, "log_event_with_properties", |env, client| {
            let j_event = new_jstring(env, event_type)?;
            let j_props = json_object(env, properties)?;
            invoke(
                env,
                client,
                "logEvent",
                "(Ljava/lang/String;Lorg/json/JSONObject;)V",
                &[JValue::Object(&j_event), JValue::Object(&j_props)],
            )
        })
    }

    async fn log_revenue(&self, instance: &str, revenue: &Revenue) -> Result<bool> {
        self.call(instance, "log_revenue", |env, client| {
            let j_revenue = build_revenue(env, revenue)?;
            invoke(
                env,
                client,
                "logRevenueV2",
                "(Lcom/amplitude/api/Revenue;)V",
                &[JValue::Object(&j_revenue)],
            )
        })
    }

    async fn upload_events(&self, instance: &str) -> Result<bool> {
        self.call_no_args(instance, "upload_events", "uploadEvents", "V")
    }

    async fn set_user_properties(&self, instance: &str, properties: &Properties) -> Result<bool> {
        self.call(instance, "set_user_properties", |env, client| {
            let j_props = json_object(env, properties)?;
            invoke(
                env,
                client,
                "setUserProperties",
                "(Lorg/json/JSONObject;)V",
                &[JValue::Object(&j_props)],
            )
        })
    }

    async fn clear_user_properties(&self, instance: &str) -> Result<bool> {
        self.call_no_args(instance, "clear_user_properties", "clearUserProperties", "V")
    }

    async fn set_user_id(&self, instance: &str, user_id: Option<&str>) -> Result<bool> {
        self.call(instance, "set_user_id", |env, client| {
            let j_user = match user_id {
                Some(id) => new_jstring(env, id)?,
                None => JObject::null(),
            };
            invoke(
                env,
                client,
                "setUserId",
                &format!("(Ljava/lang/String;){CLIENT_RET}"),
                &[JValue::Object(&j_user)],
            )
        })
    }

    async fn identify(&self, instance: &str, identify: &Identify) -> Result<bool> {
        self.call(instance, "identify", |env, client| {
            let j_identify = build_identify(env, identify)?;
            invoke(
                env,
                client,
                "identify",
                "(Lcom/amplitude/api/Identify;)V",
                &[JValue::Object(&j_identify)],
            )
        })
    }

    async fn set_group(
        &self,
        instance: &str,
        group_type: &str,
        group_name: &GroupName,
    ) -> Result<bool> {
        self.call(instance, "set_group", |env, client| {
            let j_type = new_jstring(env, group_type)?;
            let j_name = group_name_object(env, group_name)?;
            invoke(
                env,
                client,
                "setGroup",
                "(Ljava/lang/String;Ljava/lang/Object;)V",
                &[JValue::Object(&j_type), JValue::Object(&j_name)],
            )
        })
    }

    async fn group_identify(
        &self,
        instance: &str,
        group_type: &str,
        group_name: &GroupName,
        identify: &Identify,
    ) -> Result<bool> {
        self.call(instance, "group_identify", |env, client| {
            let j_type = new_jstring(env, group_type)?;
            let j_name = group_name_object(env, group_name)?;
            let j_identify = build_identify(env, identify)?;
            invoke(
                env,
                client,
                "groupIdentify",
                "(Ljava/lang/String;Ljava/lang/Object;Lcom/amplitude/api/Identify;)V",
                &[
                    JValue::Object(&j_type),
                    JValue::Object(&j_name),
                    JValue::Object(&j_identify),
                ],
            )
        })
    }

    async fn enable_coppa_control(&self, instance: &str) -> Result<bool> {
        self.call_no_args(instance, "enable_coppa_control", "enableCoppaControl", CLIENT_RET)
    }

    async fn disable_coppa_control(&self, instance: &str) -> Result<bool> {
        self.call_no_args(instance, "disable_coppa_control", "disableCoppaControl", CLIENT_RET)
    }

    async fn set_opt_out(&self, instance: &str, opt_out: bool) -> Result<bool> {
        self.call_with_bool(instance, "set_opt_out", "setOptOut", opt_out)
    }

    async fn regenerate_device_id(&self, instance: &str) -> Result<bool> {
        self.call_no_args(instance, "regenerate_device_id", "regenerateDeviceId", CLIENT_RET)
    }

    async fn set_device_id(&self, instance: &str, device_id: &str) -> Result<bool> {
        self.call_with_string(instance, "set_device_id", "setDeviceId", device_id)
    }

    async fn set_server_url(&self, instance: &str, server_url: &str) -> Result<bool> {
        self.call_with_string(instance, "set_server_url", "setServerUrl", server_url)
    }

    async fn set_use_dynamic_config(&self, instance: &str, enabled: bool) -> Result<bool> {
        self.call_with_bool(instance, "set_use_dynamic_config", "setUseDynamicConfig", enabled)
    }

    async fn track_session_events(&self, instance: &str, enabled: bool) -> Result<bool> {
        self.call_with_bool(instance, "track_session_events", "trackSessionEvents", enabled)
    }

    async fn set_min_time_between_sessions(&self, instance: &str, gap: Duration) -> Result<bool> {
        self.call(instance, "set_min_time_between_sessions", |env, client| {
            invoke(
                env,
                client,
                "setMinTimeBetweenSessionsMillis",
                &format!("(J){CLIENT_RET}"),
                &[JValue::Long(millis_i64(gap))],
            )
        })
    }

    async fn set_event_upload_threshold(&self, instance: &str, threshold: u32) -> Result<bool> {
        self.call(instance, "set_event_upload_threshold", |env, client| {
            invoke(
                env,
                client,
                "setEventUploadThreshold",
                &format!("(I){CLIENT_RET}"),
                &[JValue::Int(i32::try_from(threshold).unwrap_or(i32::MAX))],
            )
        })
    }

    async fn set_event_upload_period(&self, instance: &str, period: Duration) -> Result<bool> {
        self.call(instance, "set_event_upload_period", |env, client| {
            invoke(
                env,
                client,
                "setEventUploadPeriodMillis",
                &format!("(I){CLIENT_RET}"),
                &[JValue::Int(millis_i32(period))],
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_name() {
        assert_eq!(AndroidBridge::new().platform_name(), "Android");
    }

    #[test]
    fn durations_saturate_into_java_ints() {
        assert_eq!(millis_i32(Duration::from_secs(30)), 30_000);
        assert_eq!(millis_i32(Duration::from_secs(u64::MAX / 1000)), i32::MAX);
        assert_eq!(millis_i64(Duration::from_millis(5)), 5);
    }

    // Calls into the SDK need a running ART with the SDK on the classpath.
    // They are exercised by the host app's instrumentation tests.
}
