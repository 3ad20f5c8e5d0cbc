//! FreeBSD release parsing and repository configuration

use super::{PkgError, Result};

pub const DEFAULT_REPOS_CONF: &str = "/usr/local/etc/pkg/repos/FreeBSD.conf";

/// Repository configuration written before every install. `${ABI}` and
/// `${VERSION_MINOR}` are expanded by pkg itself.
pub const FREEBSD_REPOS: &str = r#"FreeBSD: {
  url: "pkg+https://pkg.FreeBSD.org/${ABI}/latest"
}
FreeBSD-base: {
  url: "pkg+https://pkg.FreeBSD.org/${ABI}/base_release_${VERSION_MINOR}",
  mirror_type: "srv",
  signature_type: "fingerprints",
  fingerprints: "/usr/share/keys/pkg",
  enabled: yes
}
FreeBSD-kmods: {
  enabled: no
}
"#;

/// A FreeBSD release such as `14.2`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeBsdRelease {
    major: String,
    minor: String,
}

impl FreeBsdRelease {
    /// Accepts exactly `MM.m`: a two-digit major and a one-digit minor.
    pub fn parse(release: &str) -> Result<Self> {
        let invalid = || PkgError::InvalidRelease(release.to_string());

        let (major, minor) = release.split_once('.').ok_or_else(invalid)?;
        let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());

        if major.len() != 2 || minor.len() != 1 || !digits(major) || !digits(minor) {
            return Err(invalid());
        }

        Ok(Self {
            major: major.to_string(),
            minor: minor.to_string(),
        })
    }

    pub fn major(&self) -> &str {
        &self.major
    }

    pub fn minor(&self) -> &str {
        &self.minor
    }

    /// pkg ABI string, e.g. `FreeBSD:14:aarch64`
    pub fn abi(&self, arch: &str) -> String {
        format!("FreeBSD:{}:{}", self.major, machine(arch))
    }

    /// `__FreeBSD_version` style number, e.g. `1402000`
    pub fn osversion(&self) -> String {
        format!("{}0{}000", self.major, self.minor)
    }
}

fn machine(arch: &str) -> &str {
    match arch {
        "arm64" => "aarch64",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_release() {
        let release = FreeBsdRelease::parse("14.2").unwrap();
        assert_eq!(release.major(), "14");
        assert_eq!(release.minor(), "2");
        assert_eq!(release.abi("amd64"), "FreeBSD:14:amd64");
        assert_eq!(release.abi("arm64"), "FreeBSD:14:aarch64");
        assert_eq!(release.osversion(), "1402000");
    }

    #[test]
    fn test_reject_malformed_releases() {
        for release in ["140", "14", "4.2", "14.10", "14.", ".2", "1a.2", "14.x", ""] {
            assert!(
                matches!(FreeBsdRelease::parse(release), Err(PkgError::InvalidRelease(_))),
                "{release:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_repos_stanzas() {
        assert!(FREEBSD_REPOS.starts_with("FreeBSD: {"));
        assert!(FREEBSD_REPOS.contains("base_release_${VERSION_MINOR}"));
        assert!(FREEBSD_REPOS.contains("FreeBSD-kmods: {\n  enabled: no\n}"));
    }
}
