// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Skip checks shared by the scenario modules.

use oswin_testcase::{oswin_skip, Framework, Result};

/// Skips the current test unless the compute nodes' Hyper-V version is at
/// least `min` (encoded `major * 1000 + minor`).
pub(crate) async fn require_hypervisor_version(
    ctx: &Framework,
    min: u64,
) -> Result<()> {
    let version = ctx.hypervisor_version().await?;
    if version < min {
        oswin_skip!(
            "hypervisor version {version} is not supported; it must be at \
             least {min}"
        );
    }
    Ok(())
}

/// Skips the current test when the cloud doesn't offer resize.
pub(crate) fn require_resize(ctx: &Framework) -> Result<()> {
    if !ctx.resize_enabled() {
        oswin_skip!("resize is not available");
    }
    Ok(())
}
