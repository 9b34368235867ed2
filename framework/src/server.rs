// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Server lifecycle helpers: booting test servers, waiting out status
//! transitions, probing guest connectivity, and driving cold resizes.

use std::time::Duration;

use anyhow::{anyhow, Context};
use backoff::ExponentialBackoff;
use oswin_client::{
    types::{
        Flavor, Keypair, SecurityGroup, SecurityGroupRef, Server,
        ServerCreateRequest,
    },
    ClientError,
};
use thiserror::Error;
use tokio::net::TcpStream;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::migration::{self, MigrationWait};
use crate::Framework;

pub const SERVER_STATUS_ACTIVE: &str = "ACTIVE";
pub const SERVER_STATUS_VERIFY_RESIZE: &str = "VERIFY_RESIZE";
pub const SERVER_STATUS_ERROR: &str = "ERROR";

/// Cap on a single TCP connect attempt; the overall connectivity wait is
/// bounded separately by the configured build timeout.
const CONNECT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// A cold resize whose migration ended in the `error` status.
#[derive(Debug, Error)]
#[error("cold resize of server {server_id} to flavor {flavor} failed")]
pub struct ResizeError {
    pub server_id: String,
    pub flavor: String,
}

/// A server booted by the fixture, bundled with the credentials and group
/// it was booted with. Deletion is handled by the fixture's cleanup ledger,
/// not by dropping this value.
pub struct TestServer {
    pub id: String,
    pub name: String,
    pub access_address: Option<String>,
    pub keypair: Keypair,
    pub security_group: SecurityGroup,
}

impl Framework {
    /// Boots a server from `image_ref` with a fresh keypair and security
    /// group, waits for it to reach `ACTIVE`, and resolves the address the
    /// connectivity check will probe. Every resource created here is
    /// recorded for cleanup, so a failure partway through doesn't leak.
    #[instrument(skip(self))]
    pub async fn create_server(
        &self,
        name: &str,
        image_ref: &str,
    ) -> anyhow::Result<TestServer> {
        let suffix = short_id();
        let server_name = format!("{name}-{suffix}");

        let keypair = self
            .client
            .create_keypair(&format!("{name}-key-{suffix}"))
            .await
            .context("creating keypair")?;
        self.cleanup.lock().await.keypairs.push(keypair.name.clone());

        let security_group = self
            .client
            .create_security_group(
                &format!("{name}-secgroup-{suffix}"),
                "scenario test security group",
            )
            .await
            .context("creating security group")?;
        self.cleanup.lock().await.security_groups.push(security_group.id.clone());

        let request = ServerCreateRequest {
            name: server_name.clone(),
            image_ref: image_ref.to_string(),
            flavor_ref: self.config.compute.flavor_ref.clone(),
            key_name: Some(keypair.name.clone()),
            // The boot request takes the group's name, not its id.
            security_groups: vec![SecurityGroupRef {
                name: security_group.name.clone(),
            }],
        };
        let created =
            self.client.create_server(&request).await.context("booting server")?;
        self.cleanup.lock().await.servers.push(created.id.clone());
        info!(server = %created.id, name = %server_name, "requested server boot");

        self.wait_for_server_status(&created.id, SERVER_STATUS_ACTIVE).await?;

        let server = self
            .client
            .get_server(&created.id)
            .await
            .context("fetching booted server")?;
        let access_address = access_address(
            &server,
            self.config.compute.network_name.as_deref(),
        );
        if access_address.is_none() {
            warn!(server = %server.id, "server reports no usable address");
        }

        Ok(TestServer {
            id: server.id,
            name: server.name,
            access_address,
            keypair,
            security_group,
        })
    }

    /// Polls the server until its status equals `target`. A server that
    /// falls into `ERROR` on the way is a permanent failure, not something
    /// to wait out.
    pub async fn wait_for_server_status(
        &self,
        server_id: &str,
        target: &str,
    ) -> anyhow::Result<()> {
        info!(
            server_id,
            target,
            timeout = ?self.config.build_timeout(),
            "waiting for server status"
        );

        let wait_fn = || async {
            let server = self
                .client
                .get_server(server_id)
                .await
                .map_err(|e| backoff::Error::permanent(anyhow::Error::new(e)))?;
            if server.status == target {
                Ok(())
            } else if server.status == SERVER_STATUS_ERROR {
                Err(backoff::Error::permanent(anyhow!(
                    "server {server_id} entered {SERVER_STATUS_ERROR} while \
                     waiting for {target}"
                )))
            } else {
                Err(backoff::Error::transient(anyhow!(
                    "server {server_id} is {}, waiting for {target}",
                    server.status
                )))
            }
        };

        backoff::future::retry(
            ExponentialBackoff {
                max_elapsed_time: Some(self.config.build_timeout()),
                ..Default::default()
            },
            wait_fn,
        )
        .await
        .with_context(|| {
            format!("waiting for server {server_id} to reach {target}")
        })
    }

    /// Waits for a deleted server to disappear from the API.
    pub(crate) async fn wait_for_server_gone(
        &self,
        server_id: &str,
    ) -> anyhow::Result<()> {
        let wait_fn = || async {
            match self.client.get_server(server_id).await {
                Ok(server) => Err(backoff::Error::transient(anyhow!(
                    "server {server_id} still present ({})",
                    server.status
                ))),
                Err(ClientError::Api { status: 404, .. }) => Ok(()),
                Err(e) => {
                    Err(backoff::Error::permanent(anyhow::Error::new(e)))
                }
            }
        };

        backoff::future::retry(
            ExponentialBackoff {
                max_elapsed_time: Some(self.config.build_timeout()),
                ..Default::default()
            },
            wait_fn,
        )
        .await
        .with_context(|| format!("waiting for server {server_id} deletion"))
    }

    /// Connectivity is defined as "an SSH transport can be opened": probe
    /// the guest's SSH port until a TCP connection succeeds. The guest's
    /// SSH service routinely comes up well after the server reports
    /// `ACTIVE`, so refusals and timeouts are retried until the build
    /// timeout runs out.
    pub async fn check_connectivity(
        &self,
        server: &TestServer,
    ) -> anyhow::Result<()> {
        let address = server.access_address.as_deref().ok_or_else(|| {
            anyhow!("server {} has no address to probe", server.id)
        })?;
        let target = ssh_target(address, self.config.compute.ssh_port);
        info!(server = %server.id, %target, "probing guest SSH port");

        let connect_fn = || async {
            match tokio::time::timeout(
                CONNECT_ATTEMPT_TIMEOUT,
                TcpStream::connect(&target),
            )
            .await
            {
                Ok(Ok(_stream)) => Ok(()),
                Ok(Err(e)) => Err(backoff::Error::transient(anyhow!(
                    "connecting to {target}: {e}"
                ))),
                Err(_) => Err(backoff::Error::transient(anyhow!(
                    "connecting to {target}: timed out"
                ))),
            }
        };

        backoff::future::retry(
            ExponentialBackoff {
                max_elapsed_time: Some(self.config.build_timeout()),
                ..Default::default()
            },
            connect_fn,
        )
        .await
        .with_context(|| {
            format!("guest {} never became reachable", server.id)
        })?;

        info!(server = %server.id, "guest is reachable");
        Ok(())
    }

    /// Cold-resizes `server` to `new_flavor`: request the resize, watch the
    /// resulting migration, then confirm once the server lands in
    /// `VERIFY_RESIZE`.
    ///
    /// A migration that terminates in `error` fails the resize with a
    /// [`ResizeError`]. A migration that was never observed, or that was
    /// still in flight when the polling budget ran out, is tolerated: the
    /// `VERIFY_RESIZE` wait that follows is the authoritative gate.
    pub async fn resize_server(
        &self,
        server: &TestServer,
        new_flavor: &Flavor,
    ) -> anyhow::Result<()> {
        info!(server = %server.id, flavor = %new_flavor.id, "requesting cold resize");
        self.client
            .resize_server(&server.id, &new_flavor.id)
            .await
            .context("requesting resize")?;

        let outcome = migration::wait_for_migration(&self.client, &server.id)
            .await
            .context("polling migration listing")?;
        check_migration_outcome(outcome, &server.id, new_flavor)?;

        self.wait_for_server_status(&server.id, SERVER_STATUS_VERIFY_RESIZE)
            .await?;
        self.client
            .confirm_resize(&server.id)
            .await
            .context("confirming resize")?;
        Ok(())
    }
}

/// Translates the poller's observation into the resize's verdict. Only a
/// terminal `error` fails the resize; the caller identifies the server and
/// the flavor it was being moved to so the failure can be traced.
fn check_migration_outcome(
    outcome: MigrationWait,
    server_id: &str,
    flavor: &Flavor,
) -> Result<(), ResizeError> {
    match outcome {
        MigrationWait::Terminal(m) if m.is_error() => Err(ResizeError {
            server_id: server_id.to_string(),
            flavor: flavor.id.clone(),
        }),
        MigrationWait::Terminal(m) => {
            debug!(server_id, status = %m.status, "migration reached terminal status");
            Ok(())
        }
        MigrationWait::InProgress(m) => {
            info!(
                server_id,
                status = %m.status,
                "migration still in progress after polling budget"
            );
            Ok(())
        }
        MigrationWait::NotFound => {
            info!(server_id, "no migration observed for server");
            Ok(())
        }
    }
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// IPv6 literals need brackets in a connect target.
fn ssh_target(address: &str, port: u16) -> String {
    if address.contains(':') {
        format!("[{address}]:{port}")
    } else {
        format!("{address}:{port}")
    }
}

/// Picks the address used to reach the guest: the configured network if one
/// was named (absent means no address), otherwise the first network the
/// server reports; IPv4 preferred within the chosen network.
fn access_address(server: &Server, network: Option<&str>) -> Option<String> {
    let addresses = match network {
        Some(name) => server.addresses.get(name),
        None => server.addresses.values().next(),
    }?;
    addresses
        .iter()
        .find(|a| a.version == 4)
        .or_else(|| addresses.first())
        .map(|a| a.addr.clone())
}
