use crate::virt::NetworkManager;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelationError {
    #[error("failed to read relation snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse relation snapshot: {0}")]
    ParseJson(#[from] serde_json::Error),
}

/// SSH material imported from the cloud controller, complete on both sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshKeyBundle {
    pub known_hosts: Vec<String>,
    pub authorized_keys: Vec<String>,
}

/// Point-in-time view of what cooperating deployment units have advertised.
///
/// The agent never talks to the relation transport itself; the deployment
/// framework materializes the current relation data into this snapshot and
/// hands it over on every invocation. Absent relations are simply absent
/// fields, so recomputing against a fresh snapshot is always safe.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RelationSnapshot {
    /// Raw network-manager mode from the cloud-compute relation.
    pub network_manager: Option<String>,
    pub neutron_plugin: Option<String>,
    pub quantum_plugin: Option<String>,
    /// Messaging (amqp) relation present.
    pub messaging: bool,
    /// Image-service relation present.
    pub image_service: bool,
    /// Storage-backend (ceph) relation present.
    pub storage_backend: bool,
    /// Networking-plugin subordinate relation present.
    pub network_plugin: bool,
    /// Database relation present.
    pub database: bool,
    /// Base64-encoded CA certificate forwarded by the identity service.
    pub ca_cert: Option<String>,
    /// Shared secret indicating the metadata service must run locally.
    pub metadata_shared_secret: Option<String>,
    /// Flat relation settings, for indexed lists such as SSH key imports.
    pub settings: BTreeMap<String, String>,
}

impl RelationSnapshot {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RelationError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn network_manager(&self) -> Option<NetworkManager> {
        self.network_manager.as_deref().map(NetworkManager::parse)
    }

    /// Plugin name, preferring the neutron key over the legacy quantum one.
    pub fn plugin(&self) -> Option<&str> {
        self.neutron_plugin
            .as_deref()
            .or(self.quantum_plugin.as_deref())
    }

    /// Metadata service must run on this node.
    pub fn metadata_required(&self) -> bool {
        self.metadata_shared_secret.is_some()
    }

    /// Collect the SSH known-hosts and authorized-keys lists.
    ///
    /// Each list is advertised as `<prefix>_<name>_max_index` plus
    /// `<prefix>_<name>_<i>` entries. Returns `None` unless both lists are
    /// fully present: a missing count key, a missing indexed entry, or an
    /// empty list on either side makes the whole bundle incomplete, and no
    /// partial import may happen.
    pub fn ssh_key_bundle(&self, prefix: Option<&str>) -> Option<SshKeyBundle> {
        let known_hosts = self.indexed_list("known_hosts", prefix)?;
        let authorized_keys = self.indexed_list("authorized_keys", prefix)?;
        if known_hosts.is_empty() || authorized_keys.is_empty() {
            return None;
        }
        Some(SshKeyBundle {
            known_hosts,
            authorized_keys,
        })
    }

    fn indexed_list(&self, name: &str, prefix: Option<&str>) -> Option<Vec<String>> {
        let key = |suffix: &str| match prefix {
            Some(p) => format!("{p}_{name}_{suffix}"),
            None => format!("{name}_{suffix}"),
        };
        let count: usize = self.settings.get(&key("max_index"))?.parse().ok()?;
        let mut out = Vec::with_capacity(count);
        for i in 0..count {
            out.push(self.settings.get(&key(&i.to_string()))?.clone());
        }
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_with(settings: &[(&str, &str)]) -> RelationSnapshot {
        RelationSnapshot {
            settings: settings
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
            ..RelationSnapshot::default()
        }
    }

    #[test]
    fn parses_snapshot_json() {
        let input = r#"{
            "network-manager": "FlatDHCPManager",
            "neutron-plugin": "ovs",
            "storage-backend": true,
            "settings": {"known_hosts_max_index": "1", "known_hosts_0": "h0"}
        }"#;
        let snap: RelationSnapshot = serde_json::from_str(input).unwrap();
        assert_eq!(snap.network_manager(), Some(NetworkManager::FlatDhcpManager));
        assert_eq!(snap.plugin(), Some("ovs"));
        assert!(snap.storage_backend);
        assert!(!snap.database);
    }

    #[test]
    fn plugin_prefers_neutron_over_quantum() {
        let snap = RelationSnapshot {
            neutron_plugin: Some("ovs".to_owned()),
            quantum_plugin: Some("legacy".to_owned()),
            ..RelationSnapshot::default()
        };
        assert_eq!(snap.plugin(), Some("ovs"));
        let snap = RelationSnapshot {
            quantum_plugin: Some("legacy".to_owned()),
            ..RelationSnapshot::default()
        };
        assert_eq!(snap.plugin(), Some("legacy"));
    }

    #[test]
    fn complete_ssh_bundle_is_returned() {
        let snap = snapshot_with(&[
            ("known_hosts_max_index", "2"),
            ("known_hosts_0", "h0"),
            ("known_hosts_1", "h1"),
            ("authorized_keys_max_index", "1"),
            ("authorized_keys_0", "k0"),
        ]);
        let bundle = snap.ssh_key_bundle(None).expect("complete bundle");
        assert_eq!(bundle.known_hosts, vec!["h0", "h1"]);
        assert_eq!(bundle.authorized_keys, vec!["k0"]);
    }

    #[test]
    fn partial_ssh_data_yields_nothing() {
        // known_hosts present, authorized_keys list empty
        let snap = snapshot_with(&[
            ("known_hosts_max_index", "3"),
            ("known_hosts_0", "h0"),
            ("known_hosts_1", "h1"),
            ("known_hosts_2", "h2"),
            ("authorized_keys_max_index", "0"),
        ]);
        assert_eq!(snap.ssh_key_bundle(None), None);

        // count key claims more entries than exist
        let snap = snapshot_with(&[
            ("known_hosts_max_index", "2"),
            ("known_hosts_0", "h0"),
            ("authorized_keys_max_index", "1"),
            ("authorized_keys_0", "k0"),
        ]);
        assert_eq!(snap.ssh_key_bundle(None), None);
    }

    #[test]
    fn prefixed_ssh_bundle() {
        let snap = snapshot_with(&[
            ("nova_known_hosts_max_index", "1"),
            ("nova_known_hosts_0", "h0"),
            ("nova_authorized_keys_max_index", "1"),
            ("nova_authorized_keys_0", "k0"),
        ]);
        assert!(snap.ssh_key_bundle(Some("nova")).is_some());
        assert_eq!(snap.ssh_key_bundle(None), None);
    }
}
