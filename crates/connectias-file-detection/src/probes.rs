// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! Operating system existence probes.
//!
//! Every call into libc or the raw syscall interface goes through [`Probes`], so
//! detector logic can be exercised against a mock that reproduces sandboxed or
//! permission-restricted devices.

use std::ffi::CStr;
use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

use libc::c_int;
#[cfg(any(target_os = "linux", target_os = "android"))]
use log::debug;

use crate::error::SyscallError;
#[cfg(any(target_os = "linux", target_os = "android"))]
use crate::sigsys;

#[cfg(any(target_os = "linux", target_os = "android"))]
const OPEN_PATH_FLAGS: c_int = libc::O_PATH | libc::O_CLOEXEC;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
const OPEN_PATH_FLAGS: c_int = libc::O_RDONLY | libc::O_CLOEXEC;

/// Existence probes, one per OS primitive.
///
/// Each probe returns `Ok(())` when the OS reports success.
#[cfg_attr(test, mockall::automock)]
pub trait Probes: Send + Sync {
    /// `access(path, F_OK)`
    fn access(&self, path: &CStr) -> io::Result<()>;

    /// `stat(path)`
    fn stat(&self, path: &CStr) -> io::Result<()>;

    /// `open(path, O_PATH)` followed by `fstat` on the resulting descriptor
    fn open_fstat(&self, path: &CStr) -> io::Result<()>;

    /// Raw `SYS_faccessat(AT_FDCWD, path, 0)`, bypassing the libc wrapper
    fn direct_faccessat(&self, path: &CStr) -> Result<(), SyscallError>;
}

/// Probes backed by the real operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbes;

fn check(result: c_int) -> io::Result<()> {
    if result == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

impl Probes for SystemProbes {
    fn access(&self, path: &CStr) -> io::Result<()> {
        // SAFETY: `path` is a valid NUL-terminated string for the duration of the call.
        check(unsafe { libc::access(path.as_ptr(), libc::F_OK) })
    }

    fn stat(&self, path: &CStr) -> io::Result<()> {
        // SAFETY: All-zero is a valid initial value for this type.
        let mut buf: libc::stat = unsafe { mem::zeroed() };

        // SAFETY: `path` is NUL-terminated and `buf` is a valid, exclusively borrowed stat.
        check(unsafe { libc::stat(path.as_ptr(), &mut buf) })
    }

    fn open_fstat(&self, path: &CStr) -> io::Result<()> {
        // SAFETY: `path` is a valid NUL-terminated string for the duration of the call.
        let fd = unsafe { libc::open(path.as_ptr(), OPEN_PATH_FLAGS) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }

        // SAFETY: open() just returned this descriptor and nothing else owns it.
        // OwnedFd closes it when this function returns.
        let fd = unsafe { OwnedFd::from_raw_fd(fd) };

        // SAFETY: All-zero is a valid initial value for this type.
        let mut buf: libc::stat = unsafe { mem::zeroed() };

        // SAFETY: `fd` is open and `buf` is a valid, exclusively borrowed stat.
        check(unsafe { libc::fstat(fd.as_raw_fd(), &mut buf) })
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    fn direct_faccessat(&self, path: &CStr) -> Result<(), SyscallError> {
        sigsys::install_handler().map_err(SyscallError::HandlerUnavailable)?;

        sigsys::clear_blocked();

        // SAFETY: SYS_faccessat takes (dirfd, const char*, mode); all three are valid.
        // If seccomp traps the call, the SIGSYS handler resumes us right after it.
        let result = unsafe { libc::syscall(libc::SYS_faccessat, libc::AT_FDCWD, path.as_ptr(), 0 as c_int) };

        // Read errno before anything else can overwrite it.
        let error = io::Error::last_os_error();

        if sigsys::take_blocked() {
            debug!("SYS_faccessat trapped by SIGSYS");
            return Err(SyscallError::Blocked);
        }

        if result == 0 {
            Ok(())
        } else {
            Err(SyscallError::Os(error))
        }
    }

    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    fn direct_faccessat(&self, _path: &CStr) -> Result<(), SyscallError> {
        Err(SyscallError::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::fs;

    fn c_path(path: &std::path::Path) -> CString {
        CString::new(path.to_str().unwrap()).unwrap()
    }

    #[test]
    fn every_probe_sees_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("su");
        fs::write(&file, b"#!/system/bin/sh\n").unwrap();
        let path = c_path(&file);

        let probes = SystemProbes;
        probes.access(&path).unwrap();
        probes.stat(&path).unwrap();
        probes.open_fstat(&path).unwrap();
    }

    #[test]
    fn every_libc_probe_fails_for_a_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = c_path(&dir.path().join("missing"));

        let probes = SystemProbes;
        assert_eq!(probes.access(&path).unwrap_err().kind(), io::ErrorKind::NotFound);
        assert_eq!(probes.stat(&path).unwrap_err().kind(), io::ErrorKind::NotFound);
        assert_eq!(probes.open_fstat(&path).unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn open_fstat_accepts_directories() {
        let dir = tempfile::tempdir().unwrap();
        SystemProbes.open_fstat(&c_path(dir.path())).unwrap();
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn direct_faccessat_reports_errno_for_a_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = c_path(&dir.path().join("missing"));

        match SystemProbes.direct_faccessat(&path) {
            Err(SyscallError::Os(error)) => assert_eq!(error.raw_os_error(), Some(libc::ENOENT)),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn direct_faccessat_succeeds_for_an_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        SystemProbes.direct_faccessat(&c_path(dir.path())).unwrap();
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    fn open_descriptor_count() -> usize {
        fs::read_dir("/proc/self/fd").unwrap().count()
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn open_fstat_closes_its_descriptor() {
        const ROUNDS: usize = 300;
        // Other tests run in parallel and may hold a few descriptors of their own.
        const SLACK: usize = 32;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("libxposed_art.so");
        fs::write(&file, b"").unwrap();
        let present = c_path(&file);
        let absent = c_path(&dir.path().join("libsubstrate.so"));

        let before = open_descriptor_count();
        for _ in 0..ROUNDS {
            SystemProbes.open_fstat(&present).unwrap();
            SystemProbes.open_fstat(&absent).unwrap_err();
        }
        let after = open_descriptor_count();

        assert!(after <= before + SLACK, "descriptors leaked: {before} before, {after} after");
    }

    /// Seccomp filter for the calling thread only: SYS_faccessat traps, everything else is allowed.
    #[cfg(any(target_os = "linux", target_os = "android"))]
    fn trap_faccessat_on_current_thread() {
        // Classic BPF opcodes and seccomp return actions from the kernel UAPI headers.
        // BPF_LD | BPF_W | BPF_ABS
        const BPF_LD_W_ABS: u16 = 0x20;
        // BPF_JMP | BPF_JEQ | BPF_K
        const BPF_JMP_JEQ_K: u16 = 0x15;
        // BPF_RET | BPF_K
        const BPF_RET_K: u16 = 0x06;
        const SECCOMP_RET_TRAP: u32 = 0x0003_0000;
        const SECCOMP_RET_ALLOW: u32 = 0x7fff_0000;
        // Offset of `nr` in struct seccomp_data
        const SECCOMP_DATA_NR: u32 = 0;

        let mut filter = [
            libc::sock_filter { code: BPF_LD_W_ABS, jt: 0, jf: 0, k: SECCOMP_DATA_NR },
            libc::sock_filter { code: BPF_JMP_JEQ_K, jt: 0, jf: 1, k: libc::SYS_faccessat as u32 },
            libc::sock_filter { code: BPF_RET_K, jt: 0, jf: 0, k: SECCOMP_RET_TRAP },
            libc::sock_filter { code: BPF_RET_K, jt: 0, jf: 0, k: SECCOMP_RET_ALLOW },
        ];
        let program = libc::sock_fprog {
            len: filter.len() as libc::c_ushort,
            filter: filter.as_mut_ptr(),
        };

        // SAFETY: PR_SET_NO_NEW_PRIVS takes plain integer arguments.
        let result = unsafe {
            libc::prctl(
                libc::PR_SET_NO_NEW_PRIVS,
                1 as libc::c_ulong,
                0 as libc::c_ulong,
                0 as libc::c_ulong,
                0 as libc::c_ulong,
            )
        };
        assert_eq!(result, 0, "{}", io::Error::last_os_error());

        // SAFETY: `program` points at `filter`, which outlives the call; the kernel copies it.
        let result = unsafe {
            libc::prctl(
                libc::PR_SET_SECCOMP,
                libc::SECCOMP_MODE_FILTER as libc::c_ulong,
                &program as *const libc::sock_fprog,
            )
        };
        assert_eq!(result, 0, "{}", io::Error::last_os_error());
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn seccomp_trapped_faccessat_is_reported_as_blocked() {
        use crate::detector::{detect, detect_with_fallback};
        use crate::verdict::Verdict;
        use std::thread;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("magisk");
        fs::write(&file, b"").unwrap();
        let missing = dir.path().join("su");

        let sandboxed = {
            let file = file.clone();
            thread::spawn(move || {
                trap_faccessat_on_current_thread();

                let existing = SystemProbes.direct_faccessat(&c_path(&file));
                let absent = SystemProbes.direct_faccessat(&c_path(&missing));
                assert!(matches!(existing, Err(SyscallError::Blocked)), "existing: {existing:?}");
                assert!(matches!(absent, Err(SyscallError::Blocked)), "missing: {absent:?}");

                (
                    detect(&file, true),
                    detect(&missing, true),
                    detect_with_fallback(&file),
                    detect(&file, false),
                )
            })
            .join()
            .unwrap()
        };

        assert_eq!(
            sandboxed,
            (Verdict::MethodUnavailable, Verdict::MethodUnavailable, Verdict::Found, Verdict::Found)
        );

        // A fresh thread carries no filter and still runs the syscall.
        let unfiltered = thread::spawn(move || detect(&file, true)).join().unwrap();
        assert_eq!(unfiltered, Verdict::Found);
    }
}
