use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use strato_schema::{AgentConfig, HostRelease, NetworkManager, OsRelease, RelationSnapshot};

pub const NOVA_CONF_DIR: &str = "/etc/nova";
pub const NOVA_CONF: &str = "/etc/nova/nova.conf";
pub const QEMU_CONF: &str = "/etc/libvirt/qemu.conf";
pub const QEMU_KVM: &str = "/etc/default/qemu-kvm";
pub const LIBVIRTD_CONF: &str = "/etc/libvirt/libvirtd.conf";
pub const LIBVIRT_BIN: &str = "/etc/default/libvirt-bin";
pub const LIBVIRT_BIN_OVERRIDES: &str = "/etc/init/libvirt-bin.override";
pub const API_AA_PROFILE: &str = "/etc/apparmor.d/usr.bin.nova-api";
pub const COMPUTE_AA_PROFILE: &str = "/etc/apparmor.d/usr.bin.nova-compute";
pub const NETWORK_AA_PROFILE: &str = "/etc/apparmor.d/usr.bin.nova-network";
pub const CEPH_SECRET: &str = "/etc/ceph/secret.xml";

pub const COMPUTE_SERVICE: &str = "nova-compute";
const LIBVIRT_BIN_DAEMON: &str = "libvirt-bin";
const LIBVIRTD_DAEMON: &str = "libvirtd";

const BASE_PACKAGES: &[&str] = &[
    "nova-compute",
    "genisoimage",
    "librbd1",
    "python-six",
    "python-psutil",
];

pub const VERSION_PACKAGE: &str = "nova-common";

/// Template-variable provider attached to one config file.
///
/// Providers themselves are evaluated by the renderer; the resolver only
/// decides which ones each file needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContextKind {
    Amqp,
    SharedDb,
    ImageService,
    CloudCompute,
    Lxd,
    LibvirtDaemon,
    LibvirtOverride,
    Ceph,
    Neutron,
    MetadataService,
    InstanceConsole,
    SerialConsole,
    HostIp,
    ApparmorApi,
    ApparmorCompute,
    ApparmorNetwork,
}

/// One managed configuration file: the services its rendering must restart
/// and the context providers supplying its template variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceEntry {
    pub services: Vec<String>,
    pub contexts: Vec<ContextKind>,
}

impl ResourceEntry {
    fn new(services: &[&str], contexts: &[ContextKind]) -> Self {
        Self {
            services: services.iter().map(|s| (*s).to_owned()).collect(),
            contexts: contexts.to_vec(),
        }
    }
}

/// Everything the resolver reads. A fresh value is assembled per invocation;
/// the resolver holds no state across calls.
#[derive(Debug, Clone, Copy)]
pub struct ResolverInputs<'a> {
    pub config: &'a AgentConfig,
    pub relations: &'a RelationSnapshot,
    pub host_release: HostRelease,
    pub os_release: OsRelease,
    /// `uname -m` output, e.g. `x86_64` or `aarch64`.
    pub machine_arch: &'a str,
}

impl ResolverInputs<'_> {
    /// Legacy flat networking run locally: flat manager mode, multi-host
    /// enabled, and a release that still ships nova-network.
    fn runs_legacy_network(&self) -> bool {
        self.relations
            .network_manager()
            .is_some_and(|m| m.is_legacy_flat())
            && self.config.multi_host
            && self.os_release < OsRelease::Ocata
    }

    /// The libvirt service was renamed from libvirt-bin to libvirtd.
    fn uses_renamed_libvirt_daemon(&self) -> bool {
        self.host_release >= HostRelease::Yakkety || self.os_release >= OsRelease::Ocata
    }
}

/// Name of the libvirt daemon service on this host.
pub fn libvirt_daemon(inputs: &ResolverInputs<'_>) -> &'static str {
    if inputs.uses_renamed_libvirt_daemon() {
        LIBVIRTD_DAEMON
    } else {
        LIBVIRT_BIN_DAEMON
    }
}

fn base_resource_map(inputs: &ResolverInputs<'_>) -> BTreeMap<String, ResourceEntry> {
    let mut map = BTreeMap::new();
    map.insert(
        NOVA_CONF.to_owned(),
        ResourceEntry::new(
            &[COMPUTE_SERVICE],
            &[
                ContextKind::Amqp,
                ContextKind::SharedDb,
                ContextKind::ImageService,
                ContextKind::CloudCompute,
                ContextKind::Lxd,
                ContextKind::LibvirtDaemon,
                ContextKind::Ceph,
                ContextKind::InstanceConsole,
                ContextKind::MetadataService,
                ContextKind::HostIp,
                ContextKind::SerialConsole,
            ],
        ),
    );
    map.insert(
        API_AA_PROFILE.to_owned(),
        ResourceEntry::new(&["nova-api"], &[ContextKind::ApparmorApi]),
    );
    map.insert(
        COMPUTE_AA_PROFILE.to_owned(),
        ResourceEntry::new(&[COMPUTE_SERVICE], &[ContextKind::ApparmorCompute]),
    );
    map.insert(
        NETWORK_AA_PROFILE.to_owned(),
        ResourceEntry::new(&["nova-network"], &[ContextKind::ApparmorNetwork]),
    );

    // LXD nodes carry no libvirt daemon, so none of its config files.
    if inputs.config.virt_type.uses_libvirt() {
        for path in [QEMU_CONF, LIBVIRTD_CONF, LIBVIRT_BIN, LIBVIRT_BIN_OVERRIDES] {
            let contexts = if path == LIBVIRT_BIN_OVERRIDES {
                [ContextKind::LibvirtOverride]
            } else {
                [ContextKind::LibvirtDaemon]
            };
            map.insert(
                path.to_owned(),
                ResourceEntry::new(&[LIBVIRT_BIN_DAEMON], &contexts),
            );
        }
        map.insert(
            QEMU_KVM.to_owned(),
            ResourceEntry::new(&["qemu-kvm"], &[ContextKind::LibvirtDaemon]),
        );
    }
    map
}

/// Compute the resource map for the current configuration and relation
/// snapshot.
///
/// Pure with respect to its inputs: no caching, no shared state, so a
/// repeat call under unchanged inputs returns a structurally equal map.
pub fn resource_map(inputs: &ResolverInputs<'_>) -> BTreeMap<String, ResourceEntry> {
    let mut map = base_resource_map(inputs);

    // Network manager arrives late over the cloud-compute relation. Under
    // legacy flat networking this node also runs the API and network
    // services; otherwise their apparmor profiles are meaningless.
    if inputs.runs_legacy_network() {
        let entry = map.get_mut(NOVA_CONF).expect("nova.conf is always present");
        entry.services.push("nova-api".to_owned());
        entry.services.push("nova-network".to_owned());
    } else {
        map.remove(API_AA_PROFILE);
        map.remove(NETWORK_AA_PROFILE);
    }

    if inputs.uses_renamed_libvirt_daemon() {
        for entry in map.values_mut() {
            for service in &mut entry.services {
                if service == LIBVIRT_BIN_DAEMON {
                    LIBVIRTD_DAEMON.clone_into(service);
                }
            }
        }
    }

    if inputs
        .relations
        .network_manager()
        .is_some_and(|m| m.is_sdn())
    {
        map.get_mut(NOVA_CONF)
            .expect("nova.conf is always present")
            .contexts
            .push(ContextKind::Neutron);
    }

    if inputs.relations.storage_backend {
        map.insert(
            CEPH_SECRET.to_owned(),
            ResourceEntry::new(&[COMPUTE_SERVICE], &[ContextKind::Ceph]),
        );
    }

    if inputs.relations.metadata_required() {
        map.get_mut(NOVA_CONF)
            .expect("nova.conf is always present")
            .services
            .push("nova-api-metadata".to_owned());
    }

    map
}

/// Project the resource map down to file -> services.
pub fn restart_map(inputs: &ResolverInputs<'_>) -> BTreeMap<String, Vec<String>> {
    resource_map(inputs)
        .into_iter()
        .map(|(path, entry)| (path, entry.services))
        .collect()
}

/// Deduplicated union of every service the agent manages.
pub fn services(inputs: &ResolverInputs<'_>) -> Vec<String> {
    restart_map(inputs)
        .into_values()
        .flatten()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Package set required for the current configuration.
pub fn determine_packages(inputs: &ResolverInputs<'_>) -> Vec<String> {
    let mut packages: Vec<String> = BASE_PACKAGES.iter().map(|p| (*p).to_owned()).collect();

    if inputs.runs_legacy_network() {
        packages.push("nova-api".to_owned());
        packages.push("nova-network".to_owned());
    }
    if inputs.relations.storage_backend {
        packages.push("ceph-common".to_owned());
    }
    packages.extend(
        inputs
            .config
            .virt_type
            .packages()
            .iter()
            .map(|p| (*p).to_owned()),
    );
    if inputs.relations.metadata_required() {
        packages.push("nova-api-metadata".to_owned());
    }
    // AArch64 cloud images boot via UEFI firmware.
    if inputs.machine_arch == "aarch64" && inputs.host_release >= HostRelease::Wily {
        packages.push("qemu-efi".to_owned());
    }
    packages
}

#[cfg(test)]
mod tests {
    use super::*;
    use strato_schema::VirtType;

    fn config(toml: &str) -> AgentConfig {
        AgentConfig::from_toml_str(toml).unwrap()
    }

    fn kvm_config() -> AgentConfig {
        config("virt-type = \"kvm\"")
    }

    fn inputs<'a>(
        cfg: &'a AgentConfig,
        rel: &'a RelationSnapshot,
        host: HostRelease,
        os: OsRelease,
    ) -> ResolverInputs<'a> {
        ResolverInputs {
            config: cfg,
            relations: rel,
            host_release: host,
            os_release: os,
            machine_arch: "x86_64",
        }
    }

    #[test]
    fn resource_map_is_pure() {
        let cfg = config("virt-type = \"kvm\"\nmulti-host = true");
        let rel = RelationSnapshot {
            network_manager: Some("flatdhcpmanager".to_owned()),
            storage_backend: true,
            ..RelationSnapshot::default()
        };
        let i = inputs(&cfg, &rel, HostRelease::Xenial, OsRelease::Mitaka);
        assert_eq!(resource_map(&i), resource_map(&i));
    }

    #[test]
    fn legacy_flat_multihost_preocata_adds_services_and_keeps_profiles() {
        let cfg = config("virt-type = \"kvm\"\nmulti-host = true");
        let rel = RelationSnapshot {
            network_manager: Some("flatdhcpmanager".to_owned()),
            ..RelationSnapshot::default()
        };
        let map = resource_map(&inputs(&cfg, &rel, HostRelease::Xenial, OsRelease::Mitaka));
        let nova = &map[NOVA_CONF];
        assert!(nova.services.contains(&"nova-api".to_owned()));
        assert!(nova.services.contains(&"nova-network".to_owned()));
        assert!(map.contains_key(API_AA_PROFILE));
        assert!(map.contains_key(NETWORK_AA_PROFILE));
    }

    #[test]
    fn modern_release_drops_legacy_network_resources() {
        let cfg = config("virt-type = \"kvm\"\nmulti-host = true");
        let rel = RelationSnapshot {
            network_manager: Some("flatdhcpmanager".to_owned()),
            ..RelationSnapshot::default()
        };
        let map = resource_map(&inputs(&cfg, &rel, HostRelease::Zesty, OsRelease::Ocata));
        let nova = &map[NOVA_CONF];
        assert!(!nova.services.contains(&"nova-api".to_owned()));
        assert!(!map.contains_key(API_AA_PROFILE));
        assert!(!map.contains_key(NETWORK_AA_PROFILE));
        assert!(map.contains_key(COMPUTE_AA_PROFILE));
    }

    #[test]
    fn libvirt_daemon_renamed_at_thresholds() {
        let cfg = kvm_config();
        let rel = RelationSnapshot::default();

        for (host, os) in [
            (HostRelease::Yakkety, OsRelease::Newton),
            (HostRelease::Xenial, OsRelease::Ocata),
        ] {
            let map = resource_map(&inputs(&cfg, &rel, host, os));
            for entry in map.values() {
                assert!(
                    !entry.services.contains(&"libvirt-bin".to_owned()),
                    "legacy daemon name survived at host={host} os={os}"
                );
            }
            assert!(map[LIBVIRTD_CONF].services.contains(&"libvirtd".to_owned()));
        }

        let map = resource_map(&inputs(&cfg, &rel, HostRelease::Xenial, OsRelease::Mitaka));
        assert!(map[LIBVIRTD_CONF]
            .services
            .contains(&"libvirt-bin".to_owned()));
    }

    #[test]
    fn sdn_mode_appends_neutron_context() {
        let cfg = kvm_config();
        let rel = RelationSnapshot {
            network_manager: Some("neutron".to_owned()),
            ..RelationSnapshot::default()
        };
        let map = resource_map(&inputs(&cfg, &rel, HostRelease::Xenial, OsRelease::Mitaka));
        assert!(map[NOVA_CONF].contexts.contains(&ContextKind::Neutron));

        let rel = RelationSnapshot::default();
        let map = resource_map(&inputs(&cfg, &rel, HostRelease::Xenial, OsRelease::Mitaka));
        assert!(!map[NOVA_CONF].contexts.contains(&ContextKind::Neutron));
    }

    #[test]
    fn storage_relation_adds_secret_resource() {
        let cfg = kvm_config();
        let rel = RelationSnapshot {
            storage_backend: true,
            ..RelationSnapshot::default()
        };
        let map = resource_map(&inputs(&cfg, &rel, HostRelease::Xenial, OsRelease::Mitaka));
        let secret = &map[CEPH_SECRET];
        assert_eq!(secret.services, vec![COMPUTE_SERVICE.to_owned()]);
        assert_eq!(secret.contexts, vec![ContextKind::Ceph]);
    }

    #[test]
    fn metadata_requirement_adds_service() {
        let cfg = kvm_config();
        let rel = RelationSnapshot {
            metadata_shared_secret: Some("s".to_owned()),
            ..RelationSnapshot::default()
        };
        let map = resource_map(&inputs(&cfg, &rel, HostRelease::Xenial, OsRelease::Mitaka));
        assert!(map[NOVA_CONF]
            .services
            .contains(&"nova-api-metadata".to_owned()));
    }

    #[test]
    fn lxd_map_has_no_libvirt_files() {
        let cfg = config("virt-type = \"lxd\"\nmulti-host = false");
        let rel = RelationSnapshot::default();
        let map = resource_map(&inputs(&cfg, &rel, HostRelease::Xenial, OsRelease::Mitaka));
        for path in [QEMU_CONF, QEMU_KVM, LIBVIRTD_CONF, LIBVIRT_BIN, LIBVIRT_BIN_OVERRIDES] {
            assert!(!map.contains_key(path), "unexpected {path}");
        }
        assert!(!map.contains_key(API_AA_PROFILE));
        assert!(!map.contains_key(NETWORK_AA_PROFILE));
    }

    #[test]
    fn lxd_packages_are_base_plus_backend() {
        let cfg = config("virt-type = \"lxd\"\nmulti-host = false");
        let rel = RelationSnapshot::default();
        let packages =
            determine_packages(&inputs(&cfg, &rel, HostRelease::Xenial, OsRelease::Mitaka));
        let mut expected: Vec<String> = BASE_PACKAGES.iter().map(|p| (*p).to_owned()).collect();
        expected.push("nova-compute-lxd".to_owned());
        assert_eq!(packages, expected);
    }

    #[test]
    fn packages_nonempty_for_every_backend() {
        let rel = RelationSnapshot::default();
        for vt in ["kvm", "qemu", "uml", "lxc", "lxd"] {
            let cfg = config(&format!("virt-type = \"{vt}\""));
            let packages =
                determine_packages(&inputs(&cfg, &rel, HostRelease::Xenial, OsRelease::Mitaka));
            assert!(packages.len() > BASE_PACKAGES.len(), "{vt}");
        }
    }

    #[test]
    fn legacy_network_and_storage_extend_packages() {
        let cfg = config("virt-type = \"kvm\"\nmulti-host = true");
        let rel = RelationSnapshot {
            network_manager: Some("flatmanager".to_owned()),
            storage_backend: true,
            ..RelationSnapshot::default()
        };
        let packages =
            determine_packages(&inputs(&cfg, &rel, HostRelease::Xenial, OsRelease::Mitaka));
        for p in ["nova-api", "nova-network", "ceph-common", "nova-compute-kvm"] {
            assert!(packages.contains(&p.to_owned()), "missing {p}");
        }
    }

    #[test]
    fn aarch64_gets_uefi_firmware_from_wily() {
        let cfg = kvm_config();
        let rel = RelationSnapshot::default();
        let mut i = inputs(&cfg, &rel, HostRelease::Xenial, OsRelease::Mitaka);
        i.machine_arch = "aarch64";
        assert!(determine_packages(&i).contains(&"qemu-efi".to_owned()));

        i.host_release = HostRelease::Trusty;
        i.os_release = OsRelease::Icehouse;
        assert!(!determine_packages(&i).contains(&"qemu-efi".to_owned()));
    }

    #[test]
    fn services_are_deduplicated() {
        let cfg = kvm_config();
        let rel = RelationSnapshot::default();
        let i = inputs(&cfg, &rel, HostRelease::Xenial, OsRelease::Mitaka);
        let all = services(&i);
        let unique: BTreeSet<_> = all.iter().collect();
        assert_eq!(all.len(), unique.len());
        assert!(all.contains(&COMPUTE_SERVICE.to_owned()));
        assert!(all.contains(&"libvirt-bin".to_owned()));
    }

    #[test]
    fn virt_type_classification_used_by_base_map() {
        assert!(!VirtType::Lxd.uses_libvirt());
        assert!(VirtType::Kvm.uses_libvirt());
    }
}
