// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cold resize scenarios.
//!
//! The scenario flavors are derived from the configured base flavor: one
//! GiB more root disk for the happy path, one GiB less for the rejection
//! path. Shrinking the root disk is refused by the compute layer, which
//! surfaces through the migration listing as a migration in the `error`
//! status.

use oswin_framework::{
    flavor::FlavorDelta, scenario::MIN_HYPERV_VERSION_GEN1, ResizeError,
};
use oswin_testcase::*;
use tracing::info;

use crate::support::{require_hypervisor_version, require_resize};

#[oswin_testcase]
async fn grow_disk_test(ctx: &Framework) {
    require_resize(ctx)?;
    require_hypervisor_version(ctx, MIN_HYPERV_VERSION_GEN1).await?;

    let flavor = ctx
        .create_flavor_from("grow_disk_test-flavor", &FlavorDelta::grow_disk())
        .await?;
    let server = ctx
        .create_server("grow_disk_test", &ctx.config().compute.image_ref)
        .await?;

    ctx.resize_server(&server, &flavor).await?;
    ctx.check_connectivity(&server).await?;
}

#[oswin_testcase]
async fn shrink_disk_rejected_test(ctx: &Framework) {
    require_resize(ctx)?;
    require_hypervisor_version(ctx, MIN_HYPERV_VERSION_GEN1).await?;

    let flavor = ctx
        .create_flavor_from(
            "shrink_disk_rejected_test-flavor",
            &FlavorDelta::shrink_disk(),
        )
        .await?;
    let server = ctx
        .create_server(
            "shrink_disk_rejected_test",
            &ctx.config().compute.image_ref,
        )
        .await?;

    let error = ctx
        .resize_server(&server, &flavor)
        .await
        .expect_err("resizing to a smaller root disk must fail");
    let resize_error = error
        .downcast_ref::<ResizeError>()
        .expect("the failure should come from the migration, not the API");
    assert_eq!(resize_error.server_id, server.id);
    assert_eq!(resize_error.flavor, flavor.id);
    info!(%resize_error, "resize failed as expected");

    // The failed resize must leave the guest running and reachable.
    ctx.check_connectivity(&server).await?;
}
