// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! Connectias File Detection - Rust Implementation
//!
//! Classifies whether a filesystem path exists, for spotting root managers,
//! hook frameworks and hidden apps. Two strategies are available: a raw
//! `faccessat` syscall that survives seccomp trapping through a SIGSYS handler,
//! and layered libc probes (`access`, `stat`, `open(O_PATH)+fstat`) merged by
//! maximum severity.

pub mod config;
pub mod detector;
pub mod error;
pub mod packages;
pub mod probes;
pub mod sigsys;
pub mod verdict;

use jni::objects::{JClass, JObjectArray, JString};
use jni::sys::{jboolean, jint, jstring, JNI_FALSE};
use jni::JNIEnv;
use log::warn;

#[cfg(target_os = "android")]
use android_logger::Config;
#[cfg(target_os = "android")]
use log::LevelFilter;

pub use config::ScanConfig;
pub use detector::{classify_direct, detect, detect_with_fallback, PathExistenceDetector, Strategy};
pub use error::{DetectionError, SyscallError};
pub use packages::{package_paths, PackageScanReport, PackageVerdict, EMPTY_REPORT_JSON};
pub use probes::{Probes, SystemProbes};
pub use verdict::Verdict;

// ============================================================================
// JNI Bindings
// ============================================================================

/// Initialize logging and the SIGSYS handler
#[no_mangle]
pub extern "C" fn Java_com_ble1st_connectias_core_security_file_RustFileDetector_nativeInit(
    _env: JNIEnv,
    _class: JClass,
) {
    #[cfg(target_os = "android")]
    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Info)
            .with_tag("RustFileDetector"),
    );

    if let Err(error) = sigsys::install_handler() {
        warn!("Syscall file detection unavailable: {}", error);
    }
}

/// Detect a single path - JNI entry point
///
/// Returns the verdict ordinal (NOT_FOUND=0 .. FOUND=3)
#[no_mangle]
pub extern "C" fn Java_com_ble1st_connectias_core_security_file_RustFileDetector_nativeDetect(
    mut env: JNIEnv,
    _class: JClass,
    path: JString,
    use_syscall: jboolean,
) -> jint {
    match read_string(&mut env, &path) {
        Ok(path) => detect(path, use_syscall != JNI_FALSE).as_jint(),
        Err(error) => {
            warn!("Failed to read path from JVM: {}", error);
            Verdict::NotFound.as_jint()
        }
    }
}

/// Detect a single path, syscall first with libc fallback - JNI entry point
#[no_mangle]
pub extern "C" fn Java_com_ble1st_connectias_core_security_file_RustFileDetector_nativeDetectWithFallback(
    mut env: JNIEnv,
    _class: JClass,
    path: JString,
) -> jint {
    match read_string(&mut env, &path) {
        Ok(path) => detect_with_fallback(path).as_jint(),
        Err(error) => {
            warn!("Failed to read path from JVM: {}", error);
            Verdict::NotFound.as_jint()
        }
    }
}

/// Scan package data directories - JNI entry point
///
/// Returns JSON string with PackageScanReport. A null package array or invalid
/// config JSON throws IllegalArgumentException.
#[no_mangle]
pub extern "C" fn Java_com_ble1st_connectias_core_security_file_RustFileDetector_nativeDetectPackages(
    mut env: JNIEnv,
    _class: JClass,
    packages: JObjectArray,
    use_syscall: jboolean,
    config_json: JString,
) -> jstring {
    let strategy = Strategy::from_use_syscall(use_syscall != JNI_FALSE);

    let report = read_packages(&mut env, &packages).and_then(|packages| {
        let config = read_optional_string(&mut env, &config_json)?;
        let config = ScanConfig::from_json(config.as_deref())?;
        PathExistenceDetector::new().scan_packages(packages.as_deref(), strategy, &config)
    });

    let report = match report {
        Ok(report) => report,
        Err(error) => {
            warn!("{} failed: {}", strategy.name(), error);
            // A failed JNI call already left an exception pending.
            if !env.exception_check().unwrap_or(true) {
                let _ = env.throw_new("java/lang/IllegalArgumentException", error.to_string());
            }
            return std::ptr::null_mut();
        }
    };

    let json = serde_json::to_string(&report).unwrap_or_else(|_| EMPTY_REPORT_JSON.to_string());

    match env.new_string(&json) {
        Ok(jstr) => jstr.into_raw(),
        Err(_) => match env.new_string(EMPTY_REPORT_JSON) {
            Ok(jstr) => jstr.into_raw(),
            Err(_) => std::ptr::null_mut(),
        },
    }
}

fn read_string(env: &mut JNIEnv, value: &JString) -> Result<String, DetectionError> {
    Ok(env.get_string(value)?.into())
}

fn read_optional_string(env: &mut JNIEnv, value: &JString) -> Result<Option<String>, DetectionError> {
    if value.is_null() {
        Ok(None)
    } else {
        read_string(env, value).map(Some)
    }
}

fn read_packages(env: &mut JNIEnv, array: &JObjectArray) -> Result<Option<Vec<String>>, DetectionError> {
    if array.is_null() {
        return Ok(None);
    }

    let len = env.get_array_length(array)?;
    let mut packages = Vec::with_capacity(usize::try_from(len).unwrap_or_default());

    for i in 0..len {
        let element = JString::from(env.get_object_array_element(array, i)?);
        if !element.is_null() {
            packages.push(read_string(env, &element)?);
        }
        env.delete_local_ref(element)?;
    }

    Ok(Some(packages))
}
