// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! SIGSYS interception for seccomp-trapped system calls.
//!
//! A seccomp filter with `SECCOMP_RET_TRAP` does not fail a blocked syscall with
//! an errno; it raises SIGSYS on the calling thread instead, which terminates the
//! process under the default disposition. We register a resumable handler once per
//! process that only records the trap in a thread-local flag, so execution
//! continues after the blocked instruction and the caller can classify the probe
//! as unavailable.

use std::io;
use std::mem;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use libc::{c_int, c_void, siginfo_t};
use log::{debug, warn};

thread_local! {
    // SIGSYS from seccomp is delivered synchronously to the offending thread, so
    // a per-thread flag never observes another thread's trap. Const-initialized and
    // without Drop, which keeps access from the handler free of lazy TLS setup.
    static SYSCALL_BLOCKED: AtomicBool = const { AtomicBool::new(false) };
}

// Outcome of the one and only sigaction() call, as a raw errno on failure.
static REGISTRATION: OnceLock<Result<(), i32>> = OnceLock::new();

extern "C" fn on_sigsys(_signal: c_int, _info: *mut siginfo_t, _context: *mut c_void) {
    // try_with: the thread may be tearing down its TLS. Nothing else here is
    // async-signal-safe, so this is the only side effect.
    let _ = SYSCALL_BLOCKED.try_with(|flag| flag.store(true, Ordering::SeqCst));
}

/// Register the SIGSYS handler for the lifetime of the process.
///
/// Idempotent: only the first call performs the registration; later calls return
/// the cached outcome.
pub fn install_handler() -> io::Result<()> {
    let outcome = *REGISTRATION.get_or_init(|| {
        // SAFETY: All-zero is a valid initial value for this type.
        let mut action: libc::sigaction = unsafe { mem::zeroed() };
        let handler: extern "C" fn(c_int, *mut siginfo_t, *mut c_void) = on_sigsys;
        action.sa_sigaction = handler as libc::sighandler_t;
        // SA_RESTART keeps the disposition resumable; SA_SIGINFO selects the three-argument form.
        action.sa_flags = (libc::SA_SIGINFO | libc::SA_RESTART) as _;

        // SAFETY: sa_mask is a valid, exclusively borrowed sigset_t.
        unsafe { libc::sigemptyset(&mut action.sa_mask) };

        // SAFETY: `action` is fully initialized and the handler only touches an atomic.
        let result = unsafe { libc::sigaction(libc::SIGSYS, &action, ptr::null_mut()) };

        if result == 0 {
            debug!("SIGSYS handler registered");
            Ok(())
        } else {
            let error = io::Error::last_os_error();
            warn!("Failed to register SIGSYS handler: {}", error);
            Err(error.raw_os_error().unwrap_or(libc::EINVAL))
        }
    });

    outcome.map_err(io::Error::from_raw_os_error)
}

/// Reset the current thread's flag before a syscall attempt.
pub(crate) fn clear_blocked() {
    let _ = SYSCALL_BLOCKED.try_with(|flag| flag.store(false, Ordering::SeqCst));
}

/// Consume the current thread's flag: true if a SIGSYS arrived since the last clear.
///
/// A flag already destroyed by thread teardown reads as not blocked.
pub(crate) fn take_blocked() -> bool {
    SYSCALL_BLOCKED
        .try_with(|flag| flag.swap(false, Ordering::SeqCst))
        .unwrap_or(false)
}
