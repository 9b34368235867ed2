// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Deriving scenario flavors from the configured base flavor.
//!
//! Resize scenarios don't hard-code absolute flavor sizes; they describe an
//! offset from whatever base flavor the harness was configured with, so the
//! same scenario works against clouds of very different shapes.

use anyhow::{bail, Context};
use oswin_client::types::{Flavor, FlavorCreateRequest};
use tracing::info;

use crate::Framework;

/// Signed offsets applied to a base flavor.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FlavorDelta {
    pub vcpus: i64,
    pub ram_mib: i64,
    pub disk_gib: i64,
}

impl FlavorDelta {
    /// One more GiB of root disk; the shape used by the happy-path cold
    /// resize scenario.
    pub const fn grow_disk() -> Self {
        Self { vcpus: 0, ram_mib: 0, disk_gib: 1 }
    }

    /// One less GiB of root disk. The derived flavor is valid, but resizing
    /// an instance onto it shrinks the root disk, which the compute layer
    /// refuses; the failing-resize scenario is built on this.
    pub const fn shrink_disk() -> Self {
        Self { vcpus: 0, ram_mib: 0, disk_gib: -1 }
    }

    /// Applies the delta to `base`, producing the create request for a new
    /// flavor named `name`. A delta that leaves no vcpus or memory, or a
    /// negative amount of disk, is rejected here rather than round-tripped
    /// through the API.
    pub fn apply(&self, name: &str, base: &Flavor) -> anyhow::Result<FlavorCreateRequest> {
        let vcpus = base.vcpus as i64 + self.vcpus;
        if vcpus < 1 {
            bail!(
                "flavor {name}: {} vcpus {:+} leaves no vcpus",
                base.vcpus,
                self.vcpus
            );
        }

        let ram = base.ram as i64 + self.ram_mib;
        if ram < 1 {
            bail!(
                "flavor {name}: {} MiB {:+} leaves no memory",
                base.ram,
                self.ram_mib
            );
        }

        let disk = base.disk as i64 + self.disk_gib;
        if disk < 0 {
            bail!(
                "flavor {name}: {} GiB disk {:+} is negative",
                base.disk,
                self.disk_gib
            );
        }

        Ok(FlavorCreateRequest {
            name: name.to_string(),
            vcpus: vcpus as u32,
            ram: ram as u64,
            disk: disk as u64,
        })
    }
}

impl Framework {
    /// Creates a flavor derived from the configured base flavor by `delta`
    /// and records it for cleanup. `name` is used as-is; callers are
    /// expected to pass something unique to the scenario.
    pub async fn create_flavor_from(
        &self,
        name: &str,
        delta: &FlavorDelta,
    ) -> anyhow::Result<Flavor> {
        let base_ref = &self.config.compute.flavor_ref;
        let base = self
            .client
            .get_flavor(base_ref)
            .await
            .with_context(|| format!("fetching base flavor {base_ref}"))?;
        let request = delta.apply(name, &base)?;
        let flavor = self
            .client
            .create_flavor(&request)
            .await
            .with_context(|| format!("creating flavor {name}"))?;
        self.cleanup.lock().await.flavors.push(flavor.id.clone());
        info!(
            flavor = %flavor.id,
            name,
            vcpus = flavor.vcpus,
            ram = flavor.ram,
            disk = flavor.disk,
            "created scenario flavor"
        );
        Ok(flavor)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn base() -> Flavor {
        Flavor {
            id: "42".to_string(),
            name: "m1.small".to_string(),
            vcpus: 1,
            ram: 2048,
            disk: 20,
        }
    }

    #[test]
    fn grow_disk_adds_one_gib() {
        let request = FlavorDelta::grow_disk().apply("bigger", &base()).unwrap();
        assert_eq!(request.disk, 21);
        assert_eq!(request.vcpus, 1);
        assert_eq!(request.ram, 2048);
        assert_eq!(request.name, "bigger");
    }

    #[test]
    fn shrink_disk_removes_one_gib() {
        let request = FlavorDelta::shrink_disk().apply("bad", &base()).unwrap();
        assert_eq!(request.disk, 19);
    }

    #[test]
    fn disk_may_shrink_to_zero_but_not_below() {
        let mut small = base();
        small.disk = 1;
        let request = FlavorDelta::shrink_disk().apply("tiny", &small).unwrap();
        assert_eq!(request.disk, 0);

        small.disk = 0;
        assert!(FlavorDelta::shrink_disk().apply("tiny", &small).is_err());
    }

    #[test]
    fn vcpus_and_ram_must_stay_positive() {
        let delta = FlavorDelta { vcpus: -1, ram_mib: 0, disk_gib: 0 };
        assert!(delta.apply("no-cpus", &base()).is_err());

        let delta = FlavorDelta { vcpus: 0, ram_mib: -2048, disk_gib: 0 };
        assert!(delta.apply("no-ram", &base()).is_err());
    }
}
