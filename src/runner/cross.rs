//! Execution inside the dockcross FreeBSD cross-build container

use super::{execute, CapturedOutput, Command, CommandRunner, Result, RunnerError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_CROSS_IMAGE: &str = "ghcr.io/cynix/dockcross-freebsd:latest";

/// Mount point of the working directory inside the container
const WORK_DIR: &str = "/work";

/// Identity forwarded to the container so files it creates stay owned by
/// the invoking user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderIdentity {
    pub user: String,
    pub group: String,
    pub uid: u32,
    pub gid: u32,
}

impl BuilderIdentity {
    #[cfg(unix)]
    pub fn current() -> Result<Self> {
        use nix::unistd::{getuid, Group, User};

        let user = User::from_uid(getuid())
            .map_err(|e| RunnerError::UnknownUser(e.to_string()))?
            .ok_or_else(|| RunnerError::UnknownUser(format!("no passwd entry for uid {}", getuid())))?;

        let group = Group::from_gid(user.gid)
            .ok()
            .flatten()
            .map(|g| g.name)
            .unwrap_or_else(|| user.name.clone());

        Ok(Self {
            group,
            uid: user.uid.as_raw(),
            gid: user.gid.as_raw(),
            user: user.name,
        })
    }

    #[cfg(not(unix))]
    pub fn current() -> Result<Self> {
        Err(RunnerError::UnknownUser(
            "user lookup is not supported on this platform".to_string(),
        ))
    }
}

/// Re-invokes every command inside a freshly pulled cross-build image.
#[derive(Debug, Clone)]
pub struct CrossRunner {
    runtime: String,
    image: String,
    arch: Option<String>,
}

impl Default for CrossRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CrossRunner {
    pub fn new() -> Self {
        Self {
            runtime: "docker".to_string(),
            image: DEFAULT_CROSS_IMAGE.to_string(),
            arch: None,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn with_runtime(mut self, runtime: impl Into<String>) -> Self {
        self.runtime = runtime.into();
        self
    }

    /// Target architecture exported as `FREEBSD_ARCH`
    pub fn with_arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = Some(arch.into());
        self
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    /// Arguments passed to the container runtime for `command`.
    pub fn container_args(
        &self,
        command: &Command,
        cwd: &Path,
        identity: &BuilderIdentity,
    ) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "--rm".to_string(),
            "--pull=always".to_string(),
        ];

        if command.get_stdin().is_some() {
            args.push("--interactive".to_string());
        }

        args.push(format!("--volume={}:{WORK_DIR}", cwd.display()));
        args.push(format!("--env=BUILDER_USER={}", identity.user));
        args.push(format!("--env=BUILDER_GROUP={}", identity.group));
        args.push(format!("--env=BUILDER_UID={}", identity.uid));
        args.push(format!("--env=BUILDER_GID={}", identity.gid));

        for (key, value) in command.get_env() {
            args.push(format!("--env={key}={value}"));
        }

        if let Some(arch) = &self.arch {
            args.push(format!("--env=FREEBSD_ARCH={arch}"));
        }

        args.push(self.image.clone());
        args.push(command.program().to_string());
        args.extend(command.get_args().iter().cloned());
        args
    }

    fn prepare(&self, command: &Command) -> Result<tokio::process::Command> {
        let runtime = which::which(&self.runtime).map_err(|source| RunnerError::RuntimeNotFound {
            runtime: self.runtime.clone(),
            source,
        })?;

        let cwd = match command.get_current_dir() {
            Some(dir) => dir.to_path_buf(),
            None => std::env::current_dir()?,
        };
        let cwd = absolute(cwd)?;
        let identity = BuilderIdentity::current()?;

        let mut process = tokio::process::Command::new(runtime);
        process.args(self.container_args(command, &cwd, &identity));
        Ok(process)
    }
}

fn absolute(path: PathBuf) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

#[async_trait]
impl CommandRunner for CrossRunner {
    fn name(&self) -> &'static str {
        "cross"
    }

    async fn run(&self, command: &Command) -> Result<()> {
        let process = self.prepare(command)?;
        info!("Running {command} in {}", self.image);
        execute(process, command, false).await?;
        Ok(())
    }

    async fn output(&self, command: &Command) -> Result<CapturedOutput> {
        let process = self.prepare(command)?;
        info!("Running {command} in {}", self.image);
        execute(process, command, true).await
    }
}
