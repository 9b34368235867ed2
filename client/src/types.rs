// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire types for the subset of the compute API the harness drives.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Migration statuses after which the provider reports no further state
/// transitions.
pub const TERMINAL_MIGRATION_STATUSES: [&str; 2] = ["error", "confirmed"];

/// One entry from the administrative migration listing. A migration record
/// is a transient read of remote state; the provider owns its lifecycle and
/// the harness only ever observes it.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Migration {
    pub id: i64,
    pub instance_uuid: String,
    pub status: String,
    #[serde(default)]
    pub source_compute: Option<String>,
    #[serde(default)]
    pub dest_compute: Option<String>,
}

impl Migration {
    /// Returns true if no further status transition is expected. Providers
    /// are not consistent about status casing, so compare loosely.
    pub fn is_terminal(&self) -> bool {
        TERMINAL_MIGRATION_STATUSES
            .iter()
            .any(|s| self.status.eq_ignore_ascii_case(s))
    }

    pub fn is_error(&self) -> bool {
        self.status.eq_ignore_ascii_case("error")
    }

    pub fn is_confirmed(&self) -> bool {
        self.status.eq_ignore_ascii_case("confirmed")
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Server {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: String,
    /// Network name -> attached addresses on that network.
    #[serde(default)]
    pub addresses: BTreeMap<String, Vec<ServerAddress>>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ServerAddress {
    pub addr: String,
    pub version: u8,
}

#[derive(Clone, Debug, Serialize)]
pub struct ServerCreateRequest {
    pub name: String,
    #[serde(rename = "imageRef")]
    pub image_ref: String,
    #[serde(rename = "flavorRef")]
    pub flavor_ref: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,
    /// The instance only picks up a security group that is named in the
    /// boot request, so the group's name (not its id) goes here.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security_groups: Vec<SecurityGroupRef>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SecurityGroupRef {
    pub name: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Flavor {
    pub id: String,
    pub name: String,
    pub vcpus: u32,
    /// Memory in MiB.
    pub ram: u64,
    /// Root disk in GiB.
    pub disk: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct FlavorCreateRequest {
    pub name: String,
    pub vcpus: u32,
    pub ram: u64,
    pub disk: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Keypair {
    pub name: String,
    pub public_key: String,
    /// Only present in the response to the create call that generated the
    /// pair.
    #[serde(default)]
    pub private_key: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SecurityGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Hypervisor {
    pub id: serde_json::Value,
    pub hypervisor_hostname: String,
    pub hypervisor_type: String,
    /// Encoded as `major * 1000 + minor`, e.g. 6003 for Windows / Hyper-V
    /// Server 2012 R2.
    pub hypervisor_version: u64,
}

impl Hypervisor {
    pub fn is_hyperv(&self) -> bool {
        self.hypervisor_type.eq_ignore_ascii_case("hyperv")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn migration_with_status(status: &str) -> Migration {
        Migration {
            id: 1,
            instance_uuid: "6b3f9a32-9e2d-4b5a-9c35-f0e9aa9b7b4a".to_string(),
            status: status.to_string(),
            source_compute: None,
            dest_compute: None,
        }
    }

    #[test]
    fn terminal_statuses_recognized() {
        assert!(migration_with_status("error").is_terminal());
        assert!(migration_with_status("confirmed").is_terminal());
        assert!(migration_with_status("Confirmed").is_terminal());
        assert!(!migration_with_status("migrating").is_terminal());
        assert!(!migration_with_status("post-migrating").is_terminal());
        assert!(!migration_with_status("").is_terminal());
    }

    #[test]
    fn error_and_confirmed_are_distinct() {
        assert!(migration_with_status("error").is_error());
        assert!(!migration_with_status("error").is_confirmed());
        assert!(migration_with_status("confirmed").is_confirmed());
        assert!(!migration_with_status("confirmed").is_error());
    }

    #[test]
    fn migration_listing_deserializes() {
        let json = r#"{
            "id": 42,
            "instance_uuid": "0e44cc9c-e35f-42a9-9014-b84a7466242c",
            "status": "post-migrating",
            "source_compute": "hv-node-1",
            "dest_compute": "hv-node-2",
            "created_at": "2017-01-31T08:03:25Z"
        }"#;
        let m: Migration = serde_json::from_str(json).unwrap();
        assert_eq!(m.id, 42);
        assert_eq!(m.status, "post-migrating");
        assert_eq!(m.dest_compute.as_deref(), Some("hv-node-2"));
    }

    #[test]
    fn server_addresses_deserialize() {
        let json = r#"{
            "id": "9168b536-cd40-4630-b43f-b259807c6e87",
            "name": "vhd_boot_test-e5b0",
            "status": "ACTIVE",
            "addresses": {
                "private": [
                    {"addr": "10.0.0.4", "version": 4},
                    {"addr": "fd00::4", "version": 6}
                ]
            }
        }"#;
        let s: Server = serde_json::from_str(json).unwrap();
        assert_eq!(s.addresses["private"].len(), 2);
        assert_eq!(s.addresses["private"][0].addr, "10.0.0.4");
    }

    #[test]
    fn boot_request_serializes_camel_case_refs() {
        let req = ServerCreateRequest {
            name: "disk_test".to_string(),
            image_ref: "image-1".to_string(),
            flavor_ref: "flavor-1".to_string(),
            key_name: Some("key-1".to_string()),
            security_groups: vec![SecurityGroupRef {
                name: "group-1".to_string(),
            }],
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["imageRef"], "image-1");
        assert_eq!(value["flavorRef"], "flavor-1");
        assert_eq!(value["security_groups"][0]["name"], "group-1");
    }
}
