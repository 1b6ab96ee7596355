//! Routing table source backed by an external command

use async_trait::async_trait;
use routewatch_core::{
    CollectorConfig, RoutewatchError, RoutewatchResult, SnapshotSource,
};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Runs a command such as `ip route show` and returns its stdout lines
#[derive(Debug, Clone)]
pub struct CommandSource {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
    display: String,
}

impl CommandSource {
    pub fn new(command: &[String], timeout: Option<Duration>) -> RoutewatchResult<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| RoutewatchError::Config("empty source command".into()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout,
            display: command.join(" "),
        })
    }

    pub fn from_config(config: &CollectorConfig) -> RoutewatchResult<Self> {
        Self::new(&config.command, config.fetch_timeout())
    }
}

#[async_trait]
impl SnapshotSource for CommandSource {
    fn name(&self) -> &str {
        &self.display
    }

    async fn fetch(&self, cancel: &CancellationToken) -> RoutewatchResult<Vec<String>> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        // dropping the output future kills the child
        let run = async {
            let result = match self.timeout {
                Some(limit) => match timeout(limit, command.output()).await {
                    Ok(result) => result,
                    Err(_) => return Err(RoutewatchError::Timeout(limit)),
                },
                None => command.output().await,
            };
            result.map_err(|e| RoutewatchError::Spawn {
                command: self.display.clone(),
                reason: e.to_string(),
            })
        };

        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RoutewatchError::Cancelled),
            result = run => result?,
        };

        if !output.status.success() {
            return Err(RoutewatchError::CommandFailed {
                command: self.display.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let lines: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect();
        debug!(command = %self.display, lines = lines.len(), "Fetched routing table");
        Ok(lines)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;

    fn sh(script: &str, timeout: Option<Duration>) -> CommandSource {
        let command = vec!["sh".to_string(), "-c".to_string(), script.to_string()];
        CommandSource::new(&command, timeout).unwrap()
    }

    #[test]
    fn test_empty_command_rejected() {
        assert!(CommandSource::new(&[], None).is_err());
    }

    #[test]
    fn test_from_config_defaults() {
        let source = CommandSource::from_config(&CollectorConfig::default()).unwrap();
        assert_eq!(source.name(), "ip route show");
        assert_eq!(source.timeout, Some(Duration::from_secs(10)));
    }

    #[tokio::test]
    async fn test_fetch_lines() {
        let source = sh("printf 'default via 10.0.0.1 dev eth0\\n10.0.0.0/24 dev eth0\\n'", None);
        let lines = source.fetch(&CancellationToken::new()).await.unwrap();
        assert_eq!(lines, vec!["default via 10.0.0.1 dev eth0", "10.0.0.0/24 dev eth0"]);
    }

    #[tokio::test]
    async fn test_nonzero_exit() {
        let source = sh("echo 'RTNETLINK answers: Operation not permitted' >&2; exit 2", None);
        let err = source.fetch(&CancellationToken::new()).await.unwrap_err();
        match err {
            RoutewatchError::CommandFailed { stderr, .. } => {
                assert_eq!(stderr, "RTNETLINK answers: Operation not permitted");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_program() {
        let command = vec!["routewatch-no-such-binary".to_string()];
        let source = CommandSource::new(&command, None).unwrap();
        let err = source.fetch(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, RoutewatchError::Spawn { .. }));
        assert!(err.is_fetch_failure());
    }

    #[tokio::test]
    async fn test_timeout() {
        let source = sh("sleep 5", Some(Duration::from_millis(100)));
        let err = source.fetch(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, RoutewatchError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_cancel_aborts_promptly() {
        let source = sh("sleep 5", None);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = source.fetch(&cancel).await.unwrap_err();
        assert!(matches!(err, RoutewatchError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
