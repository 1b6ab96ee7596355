//! routewatch node binary

use clap::{Parser, Subcommand};
use routewatch_core::{CancellationToken, NodeConfig, SchedulePolicy, SnapshotSource};
use routewatch_node::{CommandSource, NodeBuilder};
use routewatch_state::{diff, Snapshot};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "routewatch")]
#[command(about = "Samples the kernel routing table and exports route changes as Prometheus metrics")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Seconds between collection cycles
    #[arg(long, global = true)]
    interval: Option<u64>,

    /// API listen address
    #[arg(long, global = true)]
    listen: Option<String>,

    /// Interval policy: fixed-delay or fixed-rate
    #[arg(long, global = true)]
    schedule: Option<SchedulePolicy>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the node (default)
    Run,

    /// Validate the configuration and print it with defaults filled in
    CheckConfig,

    /// Fetch the routing table once and print it as a change record
    Once,
}

impl Cli {
    fn builder(&self) -> anyhow::Result<NodeBuilder> {
        let config = match &self.config {
            Some(path) => NodeConfig::from_toml_file(path)?,
            None => NodeConfig::default(),
        };

        let mut builder = NodeBuilder::new().config(config);
        if let Some(secs) = self.interval {
            builder = builder.interval_secs(secs);
        }
        if let Some(addr) = &self.listen {
            builder = builder.api_addr(addr);
        }
        if let Some(policy) = self.schedule {
            builder = builder.schedule(policy);
        }
        if let Some(level) = &self.log_level {
            builder = builder.log_level(level);
        }
        Ok(builder)
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let builder = cli.builder()?;
    init_logging(&builder.current_config().log_level);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            info!("Starting routewatch...");
            let node = builder.build()?;
            node.start().await?;
        }

        Commands::CheckConfig => {
            let config = builder.current_config();
            config.validate()?;
            print!("{}", config.to_toml_string()?);
        }

        Commands::Once => {
            let config = builder.current_config();
            config.validate()?;

            let source = CommandSource::from_config(&config.collector)?;
            let lines = source.fetch(&CancellationToken::new()).await?;
            let record = diff(&Snapshot::new(), &Snapshot::from_lines(lines));

            println!("{}", serde_json::to_string_pretty(&record)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("routewatch-{}-{}.toml", name, std::process::id()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_defaults_without_flags() {
        let cli = Cli::try_parse_from(["routewatch"]).unwrap();
        assert!(cli.command.is_none());

        let builder = cli.builder().unwrap();
        assert_eq!(builder.current_config(), &NodeConfig::default());
    }

    #[test]
    fn test_flags_override_config_file() {
        let path = write_config(
            "override",
            r#"
log_level = "warn"

[collector]
interval_secs = 60
schedule = "fixed-delay"

[api]
listen_addr = "127.0.0.1:9000"
"#,
        );
        let cli = Cli::try_parse_from([
            "routewatch",
            "--config",
            path.to_str().unwrap(),
            "--interval",
            "5",
            "--listen",
            "127.0.0.1:9100",
            "--schedule",
            "fixed-rate",
            "--log-level",
            "debug",
            "check-config",
        ])
        .unwrap();
        assert!(matches!(cli.command, Some(Commands::CheckConfig)));

        let builder = cli.builder().unwrap();
        let config = builder.current_config();
        assert_eq!(config.collector.interval_secs, 5);
        assert_eq!(config.collector.schedule, SchedulePolicy::FixedRate);
        assert_eq!(config.api.listen_addr, "127.0.0.1:9100");
        assert_eq!(config.log_level, "debug");
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_config_file_applies_without_flags() {
        let path = write_config(
            "file-only",
            r#"
[collector]
interval_secs = 60
"#,
        );
        let cli = Cli::try_parse_from(["routewatch", "--config", path.to_str().unwrap(), "once"])
            .unwrap();
        assert!(matches!(cli.command, Some(Commands::Once)));

        let builder = cli.builder().unwrap();
        let config = builder.current_config();
        assert_eq!(config.collector.interval_secs, 60);
        assert_eq!(config.collector.schedule, SchedulePolicy::FixedDelay);
        assert_eq!(config.log_level, "info");
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_unknown_schedule_rejected() {
        assert!(Cli::try_parse_from(["routewatch", "--schedule", "hourly"]).is_err());
    }
}
