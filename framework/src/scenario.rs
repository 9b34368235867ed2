// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-scenario configuration records.
//!
//! Disk-image scenarios differ only in which configured image they boot and
//! which hypervisor generation they need; each variant is an explicit
//! record built from the harness config and handed to a shared scenario
//! body.

use crate::config::HarnessConfig;

/// Hypervisor version floor for generation 1 images (Windows / Hyper-V
/// Server 2012).
pub const MIN_HYPERV_VERSION_GEN1: u64 = 6002;

/// Generation 2 VMs need Windows / Hyper-V Server 2012 R2 or later.
pub const MIN_HYPERV_VERSION_GEN2: u64 = 6003;

#[derive(Clone, Debug)]
pub struct DiskScenario {
    /// Short name used in server/flavor names and log lines.
    pub label: &'static str,

    /// The config option that would have supplied the image, named in the
    /// skip message when it is unset.
    pub option_name: &'static str,

    pub image_ref: Option<String>,

    pub min_hypervisor_version: u64,
}

impl DiskScenario {
    pub fn vhd(config: &HarnessConfig) -> Self {
        Self {
            label: "vhd",
            option_name: "hyperv.vhd_image_ref",
            image_ref: config.hyperv.vhd_image_ref.clone(),
            min_hypervisor_version: MIN_HYPERV_VERSION_GEN1,
        }
    }

    pub fn vhdx(config: &HarnessConfig) -> Self {
        Self {
            label: "vhdx",
            option_name: "hyperv.vhdx_image_ref",
            image_ref: config.hyperv.vhdx_image_ref.clone(),
            min_hypervisor_version: MIN_HYPERV_VERSION_GEN1,
        }
    }

    pub fn gen2(config: &HarnessConfig) -> Self {
        Self {
            label: "gen2",
            option_name: "hyperv.gen2_image_ref",
            image_ref: config.hyperv.gen2_image_ref.clone(),
            min_hypervisor_version: MIN_HYPERV_VERSION_GEN2,
        }
    }
}
