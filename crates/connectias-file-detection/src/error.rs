// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

use std::io;

use thiserror::Error;

/// Why a direct syscall probe did not succeed.
#[derive(Debug, Error)]
pub enum SyscallError {
    /// A sandboxing layer trapped the call with SIGSYS
    #[error("syscall was blocked by the sandbox")]
    Blocked,

    /// Without a SIGSYS handler a trapped call would kill the process, so it was not attempted
    #[error("SIGSYS handler unavailable: {0}")]
    HandlerUnavailable(#[source] io::Error),

    /// Direct syscall probing is only wired up for Linux and Android
    #[error("direct syscall probing is not supported on this platform")]
    Unsupported,

    /// The kernel ran the call and returned an error
    #[error("syscall failed: {0}")]
    Os(#[from] io::Error),
}

/// Errors at the package-scan and JNI boundary layers.
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("packages should not be null")]
    MissingPackages,

    #[error("invalid scan configuration: {0}")]
    InvalidConfig(#[from] serde_json::Error),

    #[error("JNI call failed: {0}")]
    Jni(#[from] jni::errors::Error),
}
