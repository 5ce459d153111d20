use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unsupported virt-type: '{0}' (expected one of: kvm, qemu, uml, lxc, lxd)")]
pub struct UnknownVirtType(pub String);

/// Hypervisor backend selected for this compute node.
///
/// An unrecognized backend is a hard error at configuration load: no package
/// set can be determined for it, so the whole operation must abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VirtType {
    Kvm,
    Qemu,
    Uml,
    Lxc,
    Lxd,
}

impl VirtType {
    /// Compute packages required for this backend.
    pub fn packages(self) -> &'static [&'static str] {
        match self {
            Self::Kvm => &["nova-compute-kvm"],
            Self::Qemu => &["nova-compute-qemu"],
            Self::Uml => &["nova-compute-uml"],
            Self::Lxc => &["nova-compute-lxc"],
            Self::Lxd => &["nova-compute-lxd"],
        }
    }

    /// Connection URI for the libvirt daemon, or `None` for backends that
    /// are not managed through libvirt.
    pub fn libvirt_uri(self) -> Option<&'static str> {
        match self {
            Self::Kvm | Self::Qemu => Some("qemu:///system"),
            Self::Uml => Some("uml:///system"),
            Self::Lxc => Some("lxc:///"),
            Self::Lxd => None,
        }
    }

    /// Whether this backend is managed through the libvirt daemon.
    pub fn uses_libvirt(self) -> bool {
        self.libvirt_uri().is_some()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kvm => "kvm",
            Self::Qemu => "qemu",
            Self::Uml => "uml",
            Self::Lxc => "lxc",
            Self::Lxd => "lxd",
        }
    }
}

impl FromStr for VirtType {
    type Err = UnknownVirtType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "kvm" => Ok(Self::Kvm),
            "qemu" => Ok(Self::Qemu),
            "uml" => Ok(Self::Uml),
            "lxc" => Ok(Self::Lxc),
            "lxd" => Ok(Self::Lxd),
            other => Err(UnknownVirtType(other.to_owned())),
        }
    }
}

impl fmt::Display for VirtType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Network manager mode advertised over the cloud-compute relation.
///
/// Set late by the cloud controller, so "not advertised yet" is a normal
/// state. Unknown modes are carried through verbatim; they simply match
/// none of the resolver's networking rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkManager {
    FlatManager,
    FlatDhcpManager,
    Neutron,
    Quantum,
    Other(String),
}

impl NetworkManager {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "flatmanager" => Self::FlatManager,
            "flatdhcpmanager" => Self::FlatDhcpManager,
            "neutron" => Self::Neutron,
            "quantum" => Self::Quantum,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Legacy flat networking, superseded by the pluggable SDN service.
    pub fn is_legacy_flat(&self) -> bool {
        matches!(self, Self::FlatManager | Self::FlatDhcpManager)
    }

    pub fn is_sdn(&self) -> bool {
        matches!(self, Self::Neutron | Self::Quantum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_supported_virt_types() {
        for (s, expected) in [
            ("kvm", VirtType::Kvm),
            ("QEMU", VirtType::Qemu),
            ("uml", VirtType::Uml),
            ("lxc", VirtType::Lxc),
            ("lxd", VirtType::Lxd),
        ] {
            assert_eq!(s.parse::<VirtType>().unwrap(), expected);
        }
    }

    #[test]
    fn unknown_virt_type_is_an_error() {
        let err = "xen".parse::<VirtType>().unwrap_err();
        assert_eq!(err, UnknownVirtType("xen".to_owned()));
    }

    #[test]
    fn every_virt_type_has_packages() {
        for vt in [
            VirtType::Kvm,
            VirtType::Qemu,
            VirtType::Uml,
            VirtType::Lxc,
            VirtType::Lxd,
        ] {
            assert!(!vt.packages().is_empty());
        }
    }

    #[test]
    fn lxd_has_no_libvirt_uri() {
        assert_eq!(VirtType::Lxd.libvirt_uri(), None);
        assert_eq!(VirtType::Kvm.libvirt_uri(), Some("qemu:///system"));
    }

    #[test]
    fn network_manager_classification() {
        assert!(NetworkManager::parse("FlatDHCPManager").is_legacy_flat());
        assert!(NetworkManager::parse("flatmanager").is_legacy_flat());
        assert!(NetworkManager::parse("neutron").is_sdn());
        assert!(NetworkManager::parse("quantum").is_sdn());
        let other = NetworkManager::parse("vlanmanager");
        assert!(!other.is_legacy_flat() && !other.is_sdn());
        assert_eq!(other, NetworkManager::Other("vlanmanager".to_owned()));
    }
}
