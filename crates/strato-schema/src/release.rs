use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReleaseParseError {
    #[error("unknown host release codename: '{0}'")]
    UnknownHostRelease(String),
    #[error("unknown OpenStack release codename: '{0}'")]
    UnknownOsRelease(String),
    #[error("cannot derive an OpenStack release from installation source '{0}'")]
    UnparsableSource(String),
    #[error("cannot map package version '{0}' to an OpenStack release")]
    UnknownVersion(String),
}

/// Ubuntu series the host runs, ordered by release date.
///
/// Ordering is the whole point: resolver decisions hinge on threshold
/// comparisons such as "yakkety or later".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostRelease {
    Trusty,
    Utopic,
    Vivid,
    Wily,
    Xenial,
    Yakkety,
    Zesty,
}

impl HostRelease {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trusty => "trusty",
            Self::Utopic => "utopic",
            Self::Vivid => "vivid",
            Self::Wily => "wily",
            Self::Xenial => "xenial",
            Self::Yakkety => "yakkety",
            Self::Zesty => "zesty",
        }
    }

    /// OpenStack release shipped in this series' main archive.
    pub fn default_os_release(self) -> OsRelease {
        match self {
            Self::Trusty => OsRelease::Icehouse,
            Self::Utopic => OsRelease::Juno,
            Self::Vivid => OsRelease::Kilo,
            Self::Wily => OsRelease::Liberty,
            Self::Xenial => OsRelease::Mitaka,
            Self::Yakkety => OsRelease::Newton,
            Self::Zesty => OsRelease::Ocata,
        }
    }
}

impl FromStr for HostRelease {
    type Err = ReleaseParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trusty" => Ok(Self::Trusty),
            "utopic" => Ok(Self::Utopic),
            "vivid" => Ok(Self::Vivid),
            "wily" => Ok(Self::Wily),
            "xenial" => Ok(Self::Xenial),
            "yakkety" => Ok(Self::Yakkety),
            "zesty" => Ok(Self::Zesty),
            other => Err(ReleaseParseError::UnknownHostRelease(other.to_owned())),
        }
    }
}

impl fmt::Display for HostRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OpenStack coordinated release, ordered by release date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsRelease {
    Icehouse,
    Juno,
    Kilo,
    Liberty,
    Mitaka,
    Newton,
    Ocata,
    Pike,
}

impl OsRelease {
    /// Every known release, oldest first.
    pub const ALL: [Self; 8] = [
        Self::Icehouse,
        Self::Juno,
        Self::Kilo,
        Self::Liberty,
        Self::Mitaka,
        Self::Newton,
        Self::Ocata,
        Self::Pike,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Icehouse => "icehouse",
            Self::Juno => "juno",
            Self::Kilo => "kilo",
            Self::Liberty => "liberty",
            Self::Mitaka => "mitaka",
            Self::Newton => "newton",
            Self::Ocata => "ocata",
            Self::Pike => "pike",
        }
    }

    /// Derive the target release from an installation-source string.
    ///
    /// Recognized forms:
    /// - `distro` — host archive; resolves via `host.default_os_release()`
    /// - `cloud:<series>-<release>` (with optional `/updates`, `/proposed`,
    ///   or a `-updates`/`-proposed` pocket suffix)
    /// - a bare release codename
    pub fn from_install_source(
        source: &str,
        host: HostRelease,
    ) -> Result<Self, ReleaseParseError> {
        let source = source.trim();
        if source.is_empty() || source.eq_ignore_ascii_case("distro") {
            return Ok(host.default_os_release());
        }
        if let Some(rest) = source.strip_prefix("cloud:") {
            // cloud:xenial-ocata, cloud:xenial-updates/ocata, ...
            let rest = rest.split('/').next().unwrap_or(rest);
            for part in rest.split('-') {
                if let Ok(release) = part.parse::<Self>() {
                    return Ok(release);
                }
            }
            // cloud:xenial-updates/ocata puts the codename after the slash
            if let Some(after_slash) = source.split('/').nth(1) {
                if let Ok(release) = after_slash.parse::<Self>() {
                    return Ok(release);
                }
            }
            return Err(ReleaseParseError::UnparsableSource(source.to_owned()));
        }
        source
            .parse::<Self>()
            .map_err(|_| ReleaseParseError::UnparsableSource(source.to_owned()))
    }

    /// Map an installed nova package version to its coordinated release.
    ///
    /// Nova used date-based versions through Kilo and switched to plain
    /// major versions from Liberty (12) onwards.
    pub fn from_nova_version(version: &str) -> Result<Self, ReleaseParseError> {
        let unknown = || ReleaseParseError::UnknownVersion(version.to_owned());
        // Strip any epoch ("2:14.0.1-0ubuntu1") and Debian revision.
        let upstream = version
            .split_once(':')
            .map_or(version, |(_, v)| v)
            .split('-')
            .next()
            .ok_or_else(unknown)?;
        let mut parts = upstream.split('.');
        let major = parts.next().ok_or_else(unknown)?;
        match major {
            "2014" => match parts.next() {
                Some("1") => Ok(Self::Icehouse),
                Some("2") => Ok(Self::Juno),
                _ => Err(unknown()),
            },
            "2015" => Ok(Self::Kilo),
            "12" => Ok(Self::Liberty),
            "13" => Ok(Self::Mitaka),
            "14" => Ok(Self::Newton),
            "15" => Ok(Self::Ocata),
            "16" => Ok(Self::Pike),
            _ => Err(unknown()),
        }
    }
}

impl FromStr for OsRelease {
    type Err = ReleaseParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "icehouse" => Ok(Self::Icehouse),
            "juno" => Ok(Self::Juno),
            "kilo" => Ok(Self::Kilo),
            "liberty" => Ok(Self::Liberty),
            "mitaka" => Ok(Self::Mitaka),
            "newton" => Ok(Self::Newton),
            "ocata" => Ok(Self::Ocata),
            "pike" => Ok(Self::Pike),
            other => Err(ReleaseParseError::UnknownOsRelease(other.to_owned())),
        }
    }
}

impl fmt::Display for OsRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
