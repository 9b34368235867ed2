// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A hand-rolled client for the compute API endpoints the scenario harness
//! exercises: server lifecycle, server actions, flavors, keypairs, security
//! groups, and the administrative migration and hypervisor listings.
//!
//! Administrative scope is the caller's problem: the token supplied at
//! construction must carry it for the admin-only calls to succeed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod types;

use types::{
    Flavor, FlavorCreateRequest, Hypervisor, Keypair, Migration,
    SecurityGroup, Server, ServerCreateRequest,
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("compute API request failed")]
    Request(#[from] reqwest::Error),

    #[error("compute API returned {status}: {message}")]
    Api { status: u16, message: String },
}

pub type Result<T> = std::result::Result<T, ClientError>;

pub struct ComputeClient {
    http: reqwest::Client,
    endpoint: String,
    token: String,
}

impl ComputeClient {
    /// Creates a client for the compute endpoint at `endpoint` (e.g.
    /// `http://controller:8774/v2.1`), authenticating every request with
    /// `token`.
    pub fn new(endpoint: &str, token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .http
            .get(self.url(path))
            .header("X-Auth-Token", &self.token)
            .send()
            .await?;
        Ok(checked(response).await?.json().await?)
    }

    async fn post<B: Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .http
            .post(self.url(path))
            .header("X-Auth-Token", &self.token)
            .json(body)
            .send()
            .await?;
        Ok(checked(response).await?.json().await?)
    }

    /// POSTs a body for which the API acknowledges with an empty response.
    async fn post_no_content<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let response = self
            .http
            .post(self.url(path))
            .header("X-Auth-Token", &self.token)
            .json(body)
            .send()
            .await?;
        checked(response).await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let response = self
            .http
            .delete(self.url(path))
            .header("X-Auth-Token", &self.token)
            .send()
            .await?;
        checked(response).await?;
        Ok(())
    }

    pub async fn create_server(&self, request: &ServerCreateRequest) -> Result<Server> {
        let envelope: ServerEnvelope = self
            .post("/servers", &ServerCreateEnvelope { server: request })
            .await?;
        Ok(envelope.server)
    }

    pub async fn get_server(&self, id: &str) -> Result<Server> {
        let envelope: ServerEnvelope = self.get(&format!("/servers/{id}")).await?;
        Ok(envelope.server)
    }

    pub async fn delete_server(&self, id: &str) -> Result<()> {
        self.delete(&format!("/servers/{id}")).await
    }

    /// Requests a (cold) resize of `id` to `flavor_ref`. The caller is
    /// expected to watch the resulting migration and then confirm.
    pub async fn resize_server(&self, id: &str, flavor_ref: &str) -> Result<()> {
        self.post_no_content(
            &format!("/servers/{id}/action"),
            &serde_json::json!({ "resize": { "flavorRef": flavor_ref } }),
        )
        .await
    }

    pub async fn confirm_resize(&self, id: &str) -> Result<()> {
        self.post_no_content(
            &format!("/servers/{id}/action"),
            &serde_json::json!({ "confirmResize": null }),
        )
        .await
    }

    /// Lists every migration visible to the caller. Requires an
    /// administrative token.
    pub async fn list_migrations(&self) -> Result<Vec<Migration>> {
        let envelope: MigrationsEnvelope = self.get("/os-migrations").await?;
        Ok(envelope.migrations)
    }

    pub async fn get_flavor(&self, id: &str) -> Result<Flavor> {
        let envelope: FlavorEnvelope = self.get(&format!("/flavors/{id}")).await?;
        Ok(envelope.flavor)
    }

    pub async fn create_flavor(&self, request: &FlavorCreateRequest) -> Result<Flavor> {
        let envelope: FlavorEnvelope = self
            .post("/flavors", &FlavorCreateEnvelope { flavor: request })
            .await?;
        Ok(envelope.flavor)
    }

    pub async fn delete_flavor(&self, id: &str) -> Result<()> {
        self.delete(&format!("/flavors/{id}")).await
    }

    /// Creates a keypair, letting the provider generate the key material.
    /// The response is the only place the private key is ever reported.
    pub async fn create_keypair(&self, name: &str) -> Result<Keypair> {
        let envelope: KeypairEnvelope = self
            .post(
                "/os-keypairs",
                &serde_json::json!({ "keypair": { "name": name } }),
            )
            .await?;
        Ok(envelope.keypair)
    }

    pub async fn delete_keypair(&self, name: &str) -> Result<()> {
        self.delete(&format!("/os-keypairs/{name}")).await
    }

    pub async fn create_security_group(
        &self,
        name: &str,
        description: &str,
    ) -> Result<SecurityGroup> {
        let envelope: SecurityGroupEnvelope = self
            .post(
                "/os-security-groups",
                &serde_json::json!({
                    "security_group": { "name": name, "description": description }
                }),
            )
            .await?;
        Ok(envelope.security_group)
    }

    pub async fn delete_security_group(&self, id: &str) -> Result<()> {
        self.delete(&format!("/os-security-groups/{id}")).await
    }

    /// Lists compute nodes with their reported hypervisor type and version.
    /// Requires an administrative token.
    pub async fn list_hypervisors(&self) -> Result<Vec<Hypervisor>> {
        let envelope: HypervisorsEnvelope =
            self.get("/os-hypervisors/detail").await?;
        Ok(envelope.hypervisors)
    }
}

/// Maps non-2xx responses to [`ClientError::Api`], preserving whatever the
/// API put in the response body.
async fn checked(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let message = response.text().await.unwrap_or_default();
        Err(ClientError::Api { status: status.as_u16(), message })
    }
}

#[derive(Serialize)]
struct ServerCreateEnvelope<'a> {
    server: &'a ServerCreateRequest,
}

#[derive(Deserialize)]
struct ServerEnvelope {
    server: Server,
}

#[derive(Deserialize)]
struct MigrationsEnvelope {
    migrations: Vec<Migration>,
}

#[derive(Serialize)]
struct FlavorCreateEnvelope<'a> {
    flavor: &'a FlavorCreateRequest,
}

#[derive(Deserialize)]
struct FlavorEnvelope {
    flavor: Flavor,
}

#[derive(Deserialize)]
struct KeypairEnvelope {
    keypair: Keypair,
}

#[derive(Deserialize)]
struct SecurityGroupEnvelope {
    security_group: SecurityGroup,
}

#[derive(Deserialize)]
struct HypervisorsEnvelope {
    hypervisors: Vec<Hypervisor>,
}
