// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Disk-image validation scenarios.
//!
//! Each test boots a server from one of the configured Hyper-V image kinds
//! and verifies the guest comes up reachable. The scenarios share one body
//! and differ only in the [`DiskScenario`] record they pass in.

use oswin_framework::scenario::DiskScenario;
use oswin_testcase::*;

use crate::support::require_hypervisor_version;

#[oswin_testcase]
async fn vhd_boot_test(ctx: &Framework) {
    boot_from_scenario(ctx, DiskScenario::vhd(ctx.config())).await?;
}

#[oswin_testcase]
async fn vhdx_boot_test(ctx: &Framework) {
    boot_from_scenario(ctx, DiskScenario::vhdx(ctx.config())).await?;
}

#[oswin_testcase]
async fn gen2_boot_test(ctx: &Framework) {
    boot_from_scenario(ctx, DiskScenario::gen2(ctx.config())).await?;
}

async fn boot_from_scenario(
    ctx: &Framework,
    scenario: DiskScenario,
) -> Result<()> {
    require_hypervisor_version(ctx, scenario.min_hypervisor_version).await?;

    let Some(image_ref) = scenario.image_ref.clone() else {
        oswin_skip!(
            "the config option \"{}\" has not been set",
            scenario.option_name
        );
    };

    let server = ctx
        .create_server(&format!("{}_boot_test", scenario.label), &image_ref)
        .await?;
    ctx.check_connectivity(&server).await?;
    Ok(())
}
