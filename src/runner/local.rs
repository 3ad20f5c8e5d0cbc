//! Direct execution on the build host

use super::{execute, CapturedOutput, Command, CommandRunner, Result};
use async_trait::async_trait;
use tracing::info;

/// Runs programs directly on the host.
///
/// The child inherits the process environment; variables set on the
/// [`Command`] are layered on top.
#[derive(Debug, Clone, Default)]
pub struct LocalRunner;

impl LocalRunner {
    pub fn new() -> Self {
        Self
    }

    fn prepare(&self, command: &Command) -> tokio::process::Command {
        let mut process = tokio::process::Command::new(command.program());
        process
            .args(command.get_args())
            .envs(command.get_env().iter().map(|(k, v)| (k, v)));

        if let Some(dir) = command.get_current_dir() {
            process.current_dir(dir);
        }

        process
    }
}

#[async_trait]
impl CommandRunner for LocalRunner {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn run(&self, command: &Command) -> Result<()> {
        info!("Running {command}");
        execute(self.prepare(command), command, false).await?;
        Ok(())
    }

    async fn output(&self, command: &Command) -> Result<CapturedOutput> {
        info!("Running {command}");
        execute(self.prepare(command), command, true).await
    }
}
