// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polling for the outcome of an asynchronous migration.
//!
//! A cold resize shows up in the administrative migration listing as a
//! migration record for the resized server, but the record can lag the
//! resize request, and it moves through provider-defined statuses of which
//! only `error` and `confirmed` are terminal. [`wait_for_migration`] polls
//! the listing on a fixed budget and reports which of the three possible
//! outcomes it observed, leaving it to the caller to decide what each one
//! means for the scenario at hand.

use std::time::Duration;

use async_trait::async_trait;
use oswin_client::{types::Migration, ClientError, ComputeClient};
use tracing::{debug, info};

/// Number of times the migration listing is consulted before giving up.
pub const MIGRATION_POLL_ATTEMPTS: u32 = 10;

/// Fixed delay between consecutive listing attempts.
pub const MIGRATION_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// The listing endpoint the poller reads. The real implementation is the
/// admin compute client; tests substitute scripted fakes.
#[async_trait]
pub trait MigrationSource {
    async fn list_migrations(&self) -> Result<Vec<Migration>, ClientError>;
}

#[async_trait]
impl MigrationSource for ComputeClient {
    async fn list_migrations(&self) -> Result<Vec<Migration>, ClientError> {
        ComputeClient::list_migrations(self).await
    }
}

/// What the poller observed within its attempt budget.
#[derive(Clone, Debug, PartialEq)]
pub enum MigrationWait {
    /// No migration for the server ever appeared in the listing.
    NotFound,

    /// The budget ran out with the migration still in a non-terminal
    /// status; carries the record from the last attempt that saw one.
    InProgress(Migration),

    /// The migration reached `error` or `confirmed`.
    Terminal(Migration),
}

/// Polls the migration listing until the migration of `server_id` reaches a
/// terminal status or the attempt budget runs out.
///
/// "Not found" and "still in progress" are expected transient observations,
/// not failures, and are returned as data. A failure of the listing call
/// itself is propagated: an administrative endpoint that errors means a
/// broken test environment, not an in-flight migration.
pub async fn wait_for_migration<S: MigrationSource>(
    source: &S,
    server_id: &str,
) -> Result<MigrationWait, ClientError> {
    let mut last_seen = None;
    for attempt in 1..=MIGRATION_POLL_ATTEMPTS {
        if attempt > 1 {
            tokio::time::sleep(MIGRATION_POLL_INTERVAL).await;
        }

        let migrations = source.list_migrations().await?;
        match migrations.into_iter().find(|m| m.instance_uuid == server_id) {
            Some(migration) => {
                debug!(
                    server_id,
                    status = %migration.status,
                    attempt,
                    "observed migration status"
                );
                if migration.is_terminal() {
                    return Ok(MigrationWait::Terminal(migration));
                }
                last_seen = Some(migration);
            }
            None => {
                // The record might not appear immediately after the resize
                // was requested.
                info!(server_id, attempt, "migration not found yet");
            }
        }
    }

    Ok(match last_seen {
        Some(migration) => MigrationWait::InProgress(migration),
        None => MigrationWait::NotFound,
    })
}
