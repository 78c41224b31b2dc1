// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! Severity-ranked outcome of a file detection.

use jni::sys::jint;
use serde::{Deserialize, Serialize};

/// Detection verdict, ordered by increasing severity.
///
/// The discriminants are the ordinals seen by the Kotlin `Result` enum and
/// must not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i32)]
pub enum Verdict {
    /// No evidence the path exists
    #[default]
    NotFound = 0,
    /// The detection method was blocked before it could run
    MethodUnavailable = 1,
    /// Reserved for evidence weaker than confirmed presence
    Suspicious = 2,
    /// At least one check confirmed the path exists
    Found = 3,
}

impl Verdict {
    /// Merge-by-maximum: the more severe of the two verdicts.
    #[must_use]
    pub fn merge(self, other: Verdict) -> Verdict {
        self.max(other)
    }

    pub fn as_jint(self) -> jint {
        self as jint
    }

    /// FOUND for a successful probe, NOT_FOUND otherwise.
    pub(crate) fn from_probe<E>(outcome: &Result<(), E>) -> Verdict {
        if outcome.is_ok() {
            Verdict::Found
        } else {
            Verdict::NotFound
        }
    }
}

impl TryFrom<i32> for Verdict {
    type Error = i32;

    fn try_from(ordinal: i32) -> Result<Self, Self::Error> {
        match ordinal {
            0 => Ok(Verdict::NotFound),
            1 => Ok(Verdict::MethodUnavailable),
            2 => Ok(Verdict::Suspicious),
            3 => Ok(Verdict::Found),
            other => Err(other),
        }
    }
}
