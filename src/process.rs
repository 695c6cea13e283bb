//! Lifecycle of a locally started service process.

use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{info, warn};

#[async_trait]
pub trait ProcessController: Send {
    fn is_running(&mut self) -> bool;

    async fn run(&mut self, args: &[String], env: &HashMap<String, String>) -> Result<()>;

    /// Stop the process, waiting at most `timeout` for it to exit.
    async fn close(&mut self, timeout: Duration) -> Result<()>;

    /// Give up ownership; the process keeps running. Returns its pid.
    fn detach(&mut self) -> Option<u32>;
}

/// Spawns the executable with `tokio::process`.
///
/// A controller that still owns a running child kills it when dropped.
#[derive(Debug)]
pub struct TokioProcessController {
    executable: PathBuf,
    working_dir: Option<PathBuf>,
    child: Option<Child>,
}

impl TokioProcessController {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            working_dir: None,
            child: None,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    fn context(&self) -> ErrorContext {
        ErrorContext::new()
            .with_details(self.executable.display().to_string())
            .with_source("process")
    }
}

#[async_trait]
impl ProcessController for TokioProcessController {
    fn is_running(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    async fn run(&mut self, args: &[String], env: &HashMap<String, String>) -> Result<()> {
        if self.is_running() {
            return Err(Error::launch_with_context("process is already running", self.context()));
        }
        let mut command = Command::new(&self.executable);
        command
            .args(args)
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        let child = command.spawn().map_err(|e| {
            Error::launch_with_context(format!("failed to spawn: {}", e), self.context())
        })?;
        info!(executable = %self.executable.display(), pid = ?child.id(), "process started");
        self.child = Some(child);
        Ok(())
    }

    async fn close(&mut self, timeout: Duration) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        child.start_kill()?;
        match tokio::time::timeout(timeout, child.wait()).await {
            Ok(status) => {
                let status = status?;
                info!(executable = %self.executable.display(), status = %status, "process stopped");
                Ok(())
            }
            Err(_) => {
                warn!(executable = %self.executable.display(), "process did not exit in time");
                Err(Error::launch_with_context(
                    format!("process did not exit within {:?}", timeout),
                    self.context(),
                ))
            }
        }
    }

    fn detach(&mut self) -> Option<u32> {
        let pid = self.pid();
        // Dropping a tokio child without kill_on_drop leaves it running.
        self.child.take();
        pid
    }
}

impl Drop for TokioProcessController {
    fn drop(&mut self) {
        if let Some(child) = self.child.as_mut() {
            let _ = child.start_kill();
        }
    }
}
