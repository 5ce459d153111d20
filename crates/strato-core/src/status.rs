use crate::resolver::VERSION_PACKAGE;
use crate::CoreError;
use serde::Serialize;
use std::collections::BTreeMap;
use strato_host::apt::package_version;
use strato_host::CommandRunner;
use strato_schema::RelationSnapshot;

/// Operator-facing workload state of the unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "state", content = "message")]
pub enum WorkloadStatus {
    Active,
    Blocked(String),
    Maintenance(String),
}

/// Interfaces this unit needs before it can do useful work.
///
/// Messaging and the image service are always required; storage, the
/// networking plugin, and the database join the set once their relations
/// exist (a present-but-incomplete relation should block, an absent
/// optional one should not).
pub fn required_interfaces(
    relations: &RelationSnapshot,
) -> BTreeMap<&'static str, Vec<&'static str>> {
    let mut required = BTreeMap::new();
    required.insert("messaging", vec!["amqp"]);
    required.insert("image", vec!["image-service"]);
    if relations.storage_backend {
        required.insert("storage-backend", vec!["ceph"]);
    }
    if relations.network_plugin {
        required.insert("neutron-plugin", vec!["neutron-plugin"]);
    }
    if relations.database {
        required.insert("database", vec!["shared-db"]);
    }
    required
}

/// Decide what the unit's status should be under the current snapshot.
pub fn assess_status(relations: &RelationSnapshot, paused: bool) -> WorkloadStatus {
    if paused {
        return WorkloadStatus::Maintenance("unit paused".to_owned());
    }
    let mut missing = Vec::new();
    if !relations.messaging {
        missing.push("messaging");
    }
    if !relations.image_service {
        missing.push("image");
    }
    if missing.is_empty() {
        WorkloadStatus::Active
    } else {
        WorkloadStatus::Blocked(format!("missing relations: {}", missing.join(", ")))
    }
}

/// Installed version of the component, for the status surface.
pub fn component_version(runner: &dyn CommandRunner) -> Result<Option<String>, CoreError> {
    Ok(package_version(runner, VERSION_PACKAGE)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strato_host::RecordingRunner;

    #[test]
    fn base_interfaces_are_always_required() {
        let required = required_interfaces(&RelationSnapshot::default());
        assert_eq!(required.len(), 2);
        assert!(required.contains_key("messaging"));
        assert!(required.contains_key("image"));
    }

    #[test]
    fn optional_interfaces_join_when_related() {
        let relations = RelationSnapshot {
            storage_backend: true,
            database: true,
            ..RelationSnapshot::default()
        };
        let required = required_interfaces(&relations);
        assert!(required.contains_key("storage-backend"));
        assert!(required.contains_key("database"));
        assert!(!required.contains_key("neutron-plugin"));
    }

    #[test]
    fn missing_relations_block() {
        let status = assess_status(&RelationSnapshot::default(), false);
        assert_eq!(
            status,
            WorkloadStatus::Blocked("missing relations: messaging, image".to_owned())
        );
    }

    #[test]
    fn complete_relations_are_active() {
        let relations = RelationSnapshot {
            messaging: true,
            image_service: true,
            ..RelationSnapshot::default()
        };
        assert_eq!(assess_status(&relations, false), WorkloadStatus::Active);
    }

    #[test]
    fn paused_wins_over_everything() {
        let relations = RelationSnapshot {
            messaging: true,
            image_service: true,
            ..RelationSnapshot::default()
        };
        assert!(matches!(
            assess_status(&relations, true),
            WorkloadStatus::Maintenance(_)
        ));
    }

    #[test]
    fn version_comes_from_the_version_package() {
        let runner = RecordingRunner::new().succeed_with("dpkg-query", "2:15.0.0-0ubuntu1");
        assert_eq!(
            component_version(&runner).unwrap(),
            Some("2:15.0.0-0ubuntu1".to_owned())
        );
        assert_eq!(runner.calls_matching("dpkg-query --show"), 1);
    }
}
