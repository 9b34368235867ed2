// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Harness configuration, loaded once from a TOML file by the runner and
//! passed down explicitly. Nothing in the harness reads configuration from
//! ambient state.

use std::time::Duration;

use anyhow::Context;
use camino::Utf8Path;
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    pub compute: ComputeConfig,
    #[serde(default)]
    pub compute_features: ComputeFeatures,
    #[serde(default)]
    pub hyperv: HypervConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComputeConfig {
    /// Base URL of the compute API, e.g. `http://controller:8774/v2.1`.
    pub endpoint: String,

    /// Pre-issued token with administrative scope. The migration and
    /// hypervisor listings are admin-only.
    pub token: String,

    /// Image to boot servers from in tests that don't name their own.
    pub image_ref: String,

    /// Flavor to boot servers with, and the base that scenario flavors are
    /// derived from.
    pub flavor_ref: String,

    /// Port probed by the connectivity check.
    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,

    /// Upper bound on each wait for a server to settle (boot, resize,
    /// connectivity).
    #[serde(default = "default_build_timeout_secs")]
    pub build_timeout_secs: u64,

    /// Network whose addresses are used to reach guests. When unset, the
    /// first network reported for the server is used.
    #[serde(default)]
    pub network_name: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComputeFeatures {
    #[serde(default = "default_true")]
    pub resize: bool,
}

impl Default for ComputeFeatures {
    fn default() -> Self {
        Self { resize: true }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HypervConfig {
    /// Compute nodes' hypervisor version, encoded `major * 1000 + minor`
    /// (Windows / Hyper-V Server 2012 R2 is 6003). Zero means "not
    /// configured"; the harness then asks the hypervisor listing instead.
    #[serde(default)]
    pub hypervisor_version: u64,

    /// VHD image to boot disk-validation tests from.
    #[serde(default)]
    pub vhd_image_ref: Option<String>,

    /// VHDX image to boot disk-validation tests from.
    #[serde(default)]
    pub vhdx_image_ref: Option<String>,

    /// Generation 2 VM VHDX image to boot disk-validation tests from.
    #[serde(default)]
    pub gen2_image_ref: Option<String>,
}

impl HarnessConfig {
    pub fn load(path: &Utf8Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading harness config {path}"))?;
        toml::from_str(&contents)
            .with_context(|| format!("parsing harness config {path}"))
    }

    pub fn build_timeout(&self) -> Duration {
        Duration::from_secs(self.compute.build_timeout_secs)
    }
}

fn default_ssh_port() -> u16 {
    22
}

fn default_build_timeout_secs() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn full_config_parses() {
        let cfg: HarnessConfig = toml::from_str(
            r#"
            [compute]
            endpoint = "http://controller:8774/v2.1"
            token = "gAAAAA-admin"
            image_ref = "3e2b3f6a-4f0c-4cf5-9a37-dd9a1e209c00"
            flavor_ref = "m1.small"
            ssh_port = 2222
            build_timeout_secs = 120
            network_name = "private"

            [compute_features]
            resize = false

            [hyperv]
            hypervisor_version = 6003
            vhd_image_ref = "vhd-image"
            vhdx_image_ref = "vhdx-image"
            gen2_image_ref = "gen2-image"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.compute.ssh_port, 2222);
        assert_eq!(cfg.build_timeout(), Duration::from_secs(120));
        assert!(!cfg.compute_features.resize);
        assert_eq!(cfg.hyperv.hypervisor_version, 6003);
        assert_eq!(cfg.hyperv.gen2_image_ref.as_deref(), Some("gen2-image"));
    }

    #[test]
    fn optional_sections_default() {
        let cfg: HarnessConfig = toml::from_str(
            r#"
            [compute]
            endpoint = "http://controller:8774/v2.1"
            token = "tok"
            image_ref = "img"
            flavor_ref = "flv"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.compute.ssh_port, 22);
        assert_eq!(cfg.compute.build_timeout_secs, 300);
        assert!(cfg.compute_features.resize);
        assert_eq!(cfg.hyperv.hypervisor_version, 0);
        assert!(cfg.hyperv.vhd_image_ref.is_none());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let parsed: Result<HarnessConfig, _> = toml::from_str(
            r#"
            [compute]
            endpoint = "http://controller:8774/v2.1"
            token = "tok"
            image_ref = "img"
            flavor_ref = "flv"
            floavor_ref = "typo"
            "#,
        );
        assert!(parsed.is_err());
    }
}
