// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The harness framework: a shared fixture for driving Hyper-V compute
//! scenario tests against a cloud's compute API.
//!
//! Scenario tests receive a [`Framework`] and call its helpers explicitly;
//! there is no ambient configuration and no per-scenario subclassing. The
//! fixture owns the API client, the harness configuration, and a ledger of
//! every resource it created so the runner can clean up after each test.

use anyhow::{bail, Context};
use tracing::{info, warn};

pub mod config;
pub mod flavor;
pub mod migration;
pub mod scenario;
pub mod server;

pub use config::HarnessConfig;
pub use server::{ResizeError, TestServer};

use oswin_client::ComputeClient;

/// Cloud resources created on behalf of the current test, in creation
/// order. Drained by [`Framework::cleanup_test_resources`].
#[derive(Default)]
struct CleanupLedger {
    servers: Vec<String>,
    flavors: Vec<String>,
    keypairs: Vec<String>,
    security_groups: Vec<String>,
}

pub struct Framework {
    pub(crate) config: HarnessConfig,
    pub(crate) client: ComputeClient,
    pub(crate) cleanup: tokio::sync::Mutex<CleanupLedger>,
    hyperv_version: tokio::sync::OnceCell<u64>,
}

impl Framework {
    pub fn new(config: HarnessConfig) -> Self {
        let client =
            ComputeClient::new(&config.compute.endpoint, &config.compute.token);
        Self {
            config,
            client,
            cleanup: tokio::sync::Mutex::default(),
            hyperv_version: tokio::sync::OnceCell::new(),
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn resize_enabled(&self) -> bool {
        self.config.compute_features.resize
    }

    /// One cheap round trip to the API before any test runs, so a bad
    /// endpoint or token fails the run up front instead of inside the first
    /// scenario.
    pub async fn verify_api(&self) -> anyhow::Result<()> {
        let hypervisors = self
            .client
            .list_hypervisors()
            .await
            .context("listing hypervisors to verify compute API access")?;
        info!(nodes = hypervisors.len(), "compute API reachable");
        Ok(())
    }

    /// The compute nodes' Hyper-V version, encoded `major * 1000 + minor`.
    /// Uses the configured value when one was given; otherwise asks the
    /// hypervisor listing and takes the oldest Hyper-V node, since that is
    /// the one a scheduled instance might land on. The discovered value is
    /// cached for the run.
    pub async fn hypervisor_version(&self) -> anyhow::Result<u64> {
        if self.config.hyperv.hypervisor_version != 0 {
            return Ok(self.config.hyperv.hypervisor_version);
        }

        self.hyperv_version
            .get_or_try_init(|| async {
                let nodes = self
                    .client
                    .list_hypervisors()
                    .await
                    .context("listing hypervisors")?;
                let oldest = nodes
                    .iter()
                    .filter(|h| h.is_hyperv())
                    .map(|h| h.hypervisor_version)
                    .min();
                match oldest {
                    Some(version) => {
                        info!(version, "discovered Hyper-V compute node version");
                        Ok(version)
                    }
                    None => bail!(
                        "no Hyper-V compute nodes reported by the hypervisor \
                         listing"
                    ),
                }
            })
            .await
            .map(|version| *version)
    }

    /// Deletes everything the current test created. Servers go first and
    /// are waited out, since their groups and keypairs can't be removed
    /// while an instance still references them. Individual failures are
    /// logged and skipped so one stuck resource doesn't strand the rest.
    pub async fn cleanup_test_resources(&self) {
        let ledger = std::mem::take(&mut *self.cleanup.lock().await);

        for id in &ledger.servers {
            match self.client.delete_server(id).await {
                Ok(()) => {
                    if let Err(e) = self.wait_for_server_gone(id).await {
                        warn!(server = %id, error = %e, "server slow to delete");
                    } else {
                        info!(server = %id, "deleted test server");
                    }
                }
                Err(e) => warn!(server = %id, error = %e, "failed to delete test server"),
            }
        }
        for id in &ledger.flavors {
            match self.client.delete_flavor(id).await {
                Ok(()) => info!(flavor = %id, "deleted test flavor"),
                Err(e) => warn!(flavor = %id, error = %e, "failed to delete test flavor"),
            }
        }
        for name in &ledger.keypairs {
            match self.client.delete_keypair(name).await {
                Ok(()) => info!(keypair = %name, "deleted test keypair"),
                Err(e) => warn!(keypair = %name, error = %e, "failed to delete test keypair"),
            }
        }
        for id in &ledger.security_groups {
            match self.client.delete_security_group(id).await {
                Ok(()) => info!(security_group = %id, "deleted test security group"),
                Err(e) => {
                    warn!(security_group = %id, error = %e, "failed to delete test security group")
                }
            }
        }
    }
}
