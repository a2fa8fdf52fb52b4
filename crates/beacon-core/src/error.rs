// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Beacon.

use thiserror::Error;

/// Top-level error type for all Beacon operations.
#[derive(Debug, Error)]
pub enum BeaconError {
    // -- Call surface --
    /// A required argument was empty. Raised before anything is forwarded.
    #[error("missing required argument: {0}")]
    MissingArgument(&'static str),

    /// NaN and infinities have no JSON form, so they are refused rather than
    /// sent as `null`.
    #[error("property `{0}` is not a finite number")]
    NonFiniteNumber(String),

    // -- Platform bridge --
    #[error("platform bridge error: {0}")]
    Bridge(String),

    #[error("analytics SDK not available on this platform")]
    PlatformUnavailable,

    // -- Configuration / persistence --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BeaconError>;

/// Reject an empty required string argument.
///
/// Returns the argument unchanged so call sites can bind the checked value.
pub fn require<'a>(name: &'static str, value: &'a str) -> Result<&'a str> {
    if value.is_empty() {
        Err(BeaconError::MissingArgument(name))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_rejects_empty() {
        let err = require("api_key", "").unwrap_err();
        assert!(matches!(err, BeaconError::MissingArgument("api_key")));
        assert_eq!(err.to_string(), "missing required argument: api_key");
    }

    #[test]
    fn require_passes_value_through() {
        assert_eq!(require("event_type", "signup").unwrap(), "signup");
    }
}
