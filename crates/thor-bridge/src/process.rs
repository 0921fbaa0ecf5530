//! Engine process supervision

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use thor_core::{Result, ThorError};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, warn};

/// How to launch an engine that speaks the framed pipe on stdio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineCommand {
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: Vec<(String, String)>,
}

impl EngineCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Spawn the engine with piped stdin/stdout; stderr is inherited
    pub fn spawn(&self) -> Result<EngineProcess> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|e| {
            ThorError::Process(format!(
                "failed to spawn {}: {e}",
                self.program.display()
            ))
        })?;
        info!(
            "Spawned engine {} (pid {:?})",
            self.program.display(),
            child.id()
        );
        Ok(EngineProcess { child })
    }
}

/// A running engine; killed when dropped
#[derive(Debug)]
pub struct EngineProcess {
    child: Child,
}

impl EngineProcess {
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Take ownership of the engine's stdio pipes
    pub fn take_stdio(&mut self) -> Result<(ChildStdout, ChildStdin)> {
        let stdout = self
            .child
            .stdout
            .take()
            .ok_or_else(|| ThorError::Process("engine stdout already taken".into()))?;
        let stdin = self
            .child
            .stdin
            .take()
            .ok_or_else(|| ThorError::Process("engine stdin already taken".into()))?;
        Ok((stdout, stdin))
    }

    /// Whether the process has exited
    pub fn has_exited(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(Some(_)))
    }

    /// Kill the engine and reap it
    pub async fn kill(&mut self) -> Result<()> {
        if self.has_exited() {
            debug!("Engine already exited");
            return Ok(());
        }
        match self.child.kill().await {
            Ok(()) => {
                info!("Engine process stopped");
                Ok(())
            }
            Err(e) => {
                warn!("Failed to kill engine: {}", e);
                Err(ThorError::Process(format!("kill failed: {e}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_from_config_json() {
        let json = r#"{"program": "/opt/engine/thor", "args": ["--batch"]}"#;
        let command: EngineCommand = serde_json::from_str(json).unwrap();
        assert_eq!(command, EngineCommand::new("/opt/engine/thor").arg("--batch"));
    }

    #[tokio::test]
    async fn test_spawn_missing_program() {
        let err = EngineCommand::new("/nonexistent/thor-engine").spawn().unwrap_err();
        assert!(matches!(err, ThorError::Process(_)));
    }
}
