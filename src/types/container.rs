//! Per-target deployment context and placeholder expansion

use serde::{Deserialize, Serialize};

/// The resolved record for one (package, architecture) deployment.
///
/// Every configuration string that reaches the engine (URLs, globs,
/// destination templates) is expanded against this record with
/// [`ContainerInfo::apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub project: String,
    pub version: String,
    pub package: String,
    /// FreeBSD release of the target, `MAJOR.MINOR`
    pub freebsd: String,
    pub arch: String,
    pub triple: String,
}

impl ContainerInfo {
    pub fn new(
        project: impl Into<String>,
        package: impl Into<String>,
        freebsd: impl Into<String>,
        arch: impl Into<String>,
    ) -> Self {
        let arch = arch.into();
        Self {
            project: project.into(),
            version: String::new(),
            package: package.into(),
            freebsd: freebsd.into(),
            triple: target_triple(&arch),
            arch,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Expand `{project}`, `{version}`, `{package}`, `{arch}`, `{triple}` and
    /// `{freebsd}` in a single left-to-right pass.
    ///
    /// Unknown placeholders are copied verbatim and substituted values are
    /// never expanded again.
    pub fn apply(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];

            match self.placeholder(tail) {
                Some((token, value)) => {
                    out.push_str(value);
                    rest = &tail[token.len()..];
                }
                None => {
                    out.push('{');
                    rest = &tail[1..];
                }
            }
        }

        out.push_str(rest);
        out
    }

    fn placeholder(&self, tail: &str) -> Option<(&'static str, &str)> {
        [
            ("{project}", self.project.as_str()),
            ("{version}", self.version.as_str()),
            ("{package}", self.package.as_str()),
            ("{arch}", self.arch.as_str()),
            ("{triple}", self.triple.as_str()),
            ("{freebsd}", self.freebsd.as_str()),
        ]
        .into_iter()
        .find(|(token, _)| tail.starts_with(token))
    }
}

/// Rust-style target triple for a FreeBSD architecture name.
pub fn target_triple(arch: &str) -> String {
    let cpu = match arch {
        "amd64" => "x86_64",
        "arm64" => "aarch64",
        other => other,
    };
    format!("{cpu}-unknown-freebsd")
}
