//! Command execution on the host or inside the cross-build container
//!
//! Callers describe a [`Command`] once and hand it to whichever
//! [`CommandRunner`] the deployment was configured with. Both backends share
//! [`execute`], so exit-status handling and output capture behave the same
//! regardless of where the program actually runs.

pub mod cross;
pub mod error;
pub mod local;

pub use cross::{BuilderIdentity, CrossRunner, DEFAULT_CROSS_IMAGE};
pub use error::{Result, RunnerError};
pub use local::LocalRunner;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// A program invocation, independent of the backend that runs it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
    cwd: Option<PathBuf>,
    stdin: Option<Vec<u8>>,
}

impl Command {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn get_env(&self) -> &[(String, String)] {
        &self.env
    }

    pub fn get_current_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn get_stdin(&self) -> Option<&[u8]> {
        self.stdin.as_deref()
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured standard output of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: String,
}

impl CapturedOutput {
    pub fn new(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
        }
    }

    /// Trimmed, non-empty lines in order.
    pub fn lines(&self) -> impl Iterator<Item = &str> + '_ {
        self.stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
    }

    pub fn first_line(&self) -> Option<&str> {
        self.lines().next()
    }
}

/// Backend-agnostic command execution.
///
/// `run` streams the program's stdout to the host's stdout (for user-facing
/// tools such as `pkg install`), `output` captures it for parsing. Stderr is
/// always inherited.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    async fn run(&self, command: &Command) -> Result<()>;

    async fn output(&self, command: &Command) -> Result<CapturedOutput>;

    /// First non-empty line of the command's output.
    async fn first_line(&self, command: &Command) -> Result<Option<String>> {
        let output = self.output(command).await?;
        Ok(output.first_line().map(str::to_string))
    }
}

/// Spawn a prepared process, feed its stdin and wait for it.
///
/// `command` is the caller's description, used for stdin and error
/// reporting.
pub(crate) async fn execute(
    mut process: tokio::process::Command,
    command: &Command,
    capture: bool,
) -> Result<CapturedOutput> {
    process
        .stdin(if command.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(if capture {
            Stdio::piped()
        } else {
            Stdio::inherit()
        })
        .stderr(Stdio::inherit());

    let mut child = process.spawn().map_err(|source| RunnerError::Spawn {
        program: command.program.clone(),
        source,
    })?;

    // stdin is fed while stdout drains, otherwise a full pipe blocks both
    let stdin = child.stdin.take();
    let feed = async move {
        if let (Some(input), Some(mut stdin)) = (command.stdin.as_deref(), stdin) {
            stdin.write_all(input).await?;
            stdin.shutdown().await?;
        }
        Ok::<_, std::io::Error>(())
    };

    let (fed, output) = tokio::join!(feed, child.wait_with_output());
    let output = output?;
    debug!("{} finished with {}", command.program, output.status);

    if !output.status.success() {
        return Err(RunnerError::Failed {
            program: command.program.clone(),
            status: output.status.to_string(),
        });
    }

    match fed {
        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
            debug!("{} exited before reading all of its input", command.program);
        }
        fed => fed?,
    }

    Ok(CapturedOutput::new(
        String::from_utf8_lossy(&output.stdout).into_owned(),
    ))
}
