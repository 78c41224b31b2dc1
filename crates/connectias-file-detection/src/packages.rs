// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! Installed-package detection through per-package data directories.
//!
//! Apps hidden from the package manager usually still leave their data
//! directories behind, so probing those paths reveals them.

use serde::{Deserialize, Serialize};

use crate::config::ScanConfig;
use crate::detector::{PathExistenceDetector, Strategy};
use crate::error::DetectionError;
use crate::probes::Probes;
use crate::verdict::Verdict;

/// Verdict for one package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageVerdict {
    pub package: String,
    pub verdict: Verdict,
}

/// Package scan result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageScanReport {
    /// Most severe verdict across all packages
    pub result: Verdict,
    /// Per-package verdicts in input order
    pub details: Vec<PackageVerdict>,
}

/// Fallback JSON when a report cannot be serialized
pub const EMPTY_REPORT_JSON: &str = r#"{"result":"NOT_FOUND","details":[]}"#;

/// Data locations Android creates for an installed package
pub fn package_paths(package: &str, config: &ScanConfig) -> [String; 6] {
    let external = config.external_storage.trim_end_matches('/');
    [
        format!("/data/data/{}", package),
        format!("/data/user_de/{}/{}", config.user_id, package),
        format!("/data/misc/profiles/ref/{}", package),
        format!("{}/Android/data/{}", external, package),
        format!("{}/Android/media/{}", external, package),
        format!("{}/Android/obb/{}", external, package),
    ]
}

impl<P: Probes> PathExistenceDetector<P> {
    /// Probe every data location of every package with `strategy`.
    ///
    /// `None` mirrors a null array from Kotlin and is rejected.
    pub fn scan_packages(
        &self,
        packages: Option<&[String]>,
        strategy: Strategy,
        config: &ScanConfig,
    ) -> Result<PackageScanReport, DetectionError> {
        let packages = packages.ok_or(DetectionError::MissingPackages)?;

        let mut result = Verdict::NotFound;
        let mut details = Vec::with_capacity(packages.len());

        for package in packages {
            let verdict = package_paths(package, config)
                .iter()
                .map(|path| self.detect_with_strategy(path, strategy))
                .fold(Verdict::NotFound, Verdict::merge);

            result = result.merge(verdict);
            details.push(PackageVerdict {
                package: package.clone(),
                verdict,
            });
        }

        Ok(PackageScanReport { result, details })
    }
}
