// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! Path existence detection.
//!
//! Two independent strategies classify a single path:
//! - `DirectSyscall` issues `SYS_faccessat` by number, so a libc hook cannot
//!   intercept it, and treats a SIGSYS trap as "method unavailable".
//! - `Libc` runs `access`, `stat` and `open(O_PATH)+fstat` unconditionally and keeps
//!   the most severe result, so an environment has to defeat all three to hide a file.

use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use log::debug;

use crate::error::SyscallError;
use crate::probes::{Probes, SystemProbes};
use crate::verdict::Verdict;

/// Detection strategy selected per call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    DirectSyscall,
    Libc,
}

impl Strategy {
    pub fn from_use_syscall(use_direct_syscall: bool) -> Self {
        if use_direct_syscall {
            Strategy::DirectSyscall
        } else {
            Strategy::Libc
        }
    }

    /// Display name shown in the app's detector list
    pub fn name(self) -> &'static str {
        match self {
            Strategy::DirectSyscall => "Syscall File Detection",
            Strategy::Libc => "Libc File Detection",
        }
    }
}

/// Running verdict for one detection call. Only ever raised.
#[derive(Debug, Default)]
pub(crate) struct DetectionSession {
    verdict: Verdict,
}

impl DetectionSession {
    pub(crate) fn record(&mut self, observed: Verdict) {
        self.verdict = self.verdict.merge(observed);
    }

    pub(crate) fn verdict(&self) -> Verdict {
        self.verdict
    }
}

/// Map the outcome of a direct `faccessat` to a verdict.
///
/// EPERM still proves the path is there; only other errors count as absence.
pub fn classify_direct(outcome: &Result<(), SyscallError>) -> Verdict {
    match outcome {
        Ok(()) => Verdict::Found,
        Err(SyscallError::Os(error)) if error.raw_os_error() == Some(libc::EPERM) => Verdict::Found,
        Err(SyscallError::Os(_)) => Verdict::NotFound,
        Err(SyscallError::Blocked | SyscallError::HandlerUnavailable(_) | SyscallError::Unsupported) => {
            Verdict::MethodUnavailable
        }
    }
}

/// Classifies whether a single path exists.
#[derive(Debug, Default)]
pub struct PathExistenceDetector<P = SystemProbes> {
    probes: P,
}

impl PathExistenceDetector<SystemProbes> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<P: Probes> PathExistenceDetector<P> {
    pub fn with_probes(probes: P) -> Self {
        Self { probes }
    }

    /// Classify `path` with the direct syscall probe or the layered libc probes.
    pub fn detect(&self, path: impl AsRef<Path>, use_direct_syscall: bool) -> Verdict {
        self.detect_with_strategy(path.as_ref(), Strategy::from_use_syscall(use_direct_syscall))
    }

    pub fn detect_with_strategy(&self, path: impl AsRef<Path>, strategy: Strategy) -> Verdict {
        let path = path.as_ref();
        let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
            // Interior NUL: the OS could never resolve it.
            debug!("Path with interior NUL treated as not found: {:?}", path);
            return Verdict::NotFound;
        };

        let mut session = DetectionSession::default();

        match strategy {
            Strategy::DirectSyscall => {
                let outcome = self.probes.direct_faccessat(&c_path);
                if let Err(error) = &outcome {
                    debug!("Direct faccessat on {:?}: {}", path, error);
                }
                session.record(classify_direct(&outcome));
            }
            Strategy::Libc => {
                session.record(Verdict::from_probe(&self.probes.access(&c_path)));
                session.record(Verdict::from_probe(&self.probes.stat(&c_path)));
                session.record(Verdict::from_probe(&self.probes.open_fstat(&c_path)));
            }
        }

        session.verdict()
    }

    /// Direct syscall first; when the sandbox blocks it, fall back to the libc probes.
    ///
    /// The verdict is returned as is: a FOUND from either strategy stays FOUND and is
    /// never downgraded to SUSPICIOUS. Any such mapping belongs to the caller.
    pub fn detect_with_fallback(&self, path: impl AsRef<Path>) -> Verdict {
        let path = path.as_ref();
        match self.detect_with_strategy(path, Strategy::DirectSyscall) {
            Verdict::MethodUnavailable => self.detect_with_strategy(path, Strategy::Libc),
            verdict => verdict,
        }
    }
}

/// Classify `path` against the real operating system.
pub fn detect(path: impl AsRef<Path>, use_direct_syscall: bool) -> Verdict {
    PathExistenceDetector::new().detect(path, use_direct_syscall)
}

/// [`detect`] with the direct syscall, falling back to libc probes if it is blocked.
pub fn detect_with_fallback(path: impl AsRef<Path>) -> Verdict {
    PathExistenceDetector::new().detect_with_fallback(path)
}
