//! Administrative and operating states shared by devices and services.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Administrative state of an edge object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AdminState {
    /// Commands are rejected.
    Locked,
    /// Commands are accepted.
    Unlocked,
}

/// Operating state of an edge object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperatingState {
    /// The object is up.
    Enabled,
    /// The object is down.
    Disabled,
}

impl AdminState {
    /// Returns the wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminState::Locked => "LOCKED",
            AdminState::Unlocked => "UNLOCKED",
        }
    }
}

impl OperatingState {
    /// Returns the wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatingState::Enabled => "ENABLED",
            OperatingState::Disabled => "DISABLED",
        }
    }
}

impl fmt::Display for AdminState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for OperatingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdminState {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LOCKED" => Ok(AdminState::Locked),
            "UNLOCKED" => Ok(AdminState::Unlocked),
            _ => Err(ApiError::UnknownValue {
                kind: "AdminState",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for OperatingState {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            // "UP"/"DOWN" are the names newer platform releases use.
            "ENABLED" | "UP" => Ok(OperatingState::Enabled),
            "DISABLED" | "DOWN" => Ok(OperatingState::Disabled),
            _ => Err(ApiError::UnknownValue {
                kind: "OperatingState",
                value: s.to_string(),
            }),
        }
    }
}
