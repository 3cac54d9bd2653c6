//! Runs the planned golangci-lint command line and classifies its exit.

use std::path::Path;
use std::time::Instant;

use tokio::process::Command;
use tracing::{debug, info};

use crate::infrastructure::error::ActionError;

/// Classified result of one tool invocation. Exit code 1 is an analysis
/// result, not an infrastructure failure; the distinction is made by the
/// orchestrator, this type only carries the facts.
#[derive(Debug)]
pub enum ExecOutcome {
    Success { stdout: String, stderr: String },
    Failed { code: i32, stdout: String, stderr: String },
}

impl ExecOutcome {
    pub fn stdout(&self) -> &str {
        match self {
            ExecOutcome::Success { stdout, .. } | ExecOutcome::Failed { stdout, .. } => stdout,
        }
    }

    pub fn stderr(&self) -> &str {
        match self {
            ExecOutcome::Success { stderr, .. } | ExecOutcome::Failed { stderr, .. } => stderr,
        }
    }
}

pub async fn run_tool(
    tool: &Path,
    args: &[String],
    working_directory: Option<&Path>,
) -> Result<ExecOutcome, ActionError> {
    let mut command = Command::new(tool);
    command.args(args);
    if let Some(dir) = working_directory {
        command.current_dir(dir);
    }
    debug!("running {} {}", tool.display(), args.join(" "));

    let started = Instant::now();
    let output = command.output().await.map_err(|e| {
        ActionError::launch(format!("{}: {}", tool.display(), e))
    })?;
    info!("{} finished in {:.2?}", tool.display(), started.elapsed());

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    match output.status.code() {
        Some(0) => Ok(ExecOutcome::Success { stdout, stderr }),
        Some(code) => Ok(ExecOutcome::Failed { code, stdout, stderr }),
        None => Err(ActionError::launch(format!(
            "{} was terminated by a signal",
            tool.display()
        ))),
    }
}
