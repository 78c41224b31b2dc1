// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

use serde::{Deserialize, Serialize};

use crate::error::DetectionError;

/// Package scan configuration (passed from Kotlin as JSON)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Android user whose device-encrypted storage is probed
    pub user_id: u32,
    /// Primary external storage root
    pub external_storage: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            user_id: 0,
            external_storage: "/storage/emulated/0".to_string(),
        }
    }
}

impl ScanConfig {
    /// Parse from JSON; a missing or blank document yields the defaults.
    pub fn from_json(json: Option<&str>) -> Result<Self, DetectionError> {
        match json.map(str::trim) {
            None | Some("") => Ok(Self::default()),
            Some(json) => Ok(serde_json::from_str(json)?),
        }
    }
}
