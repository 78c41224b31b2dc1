// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

// Build script for Rust file detector
// Ensures proper linking on Android

fn main() {
    // cfg!(target_os) in a build script describes the host, so ask Cargo for the target
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("android") {
        println!("cargo:rustc-link-lib=log");
    }
}
