//! Main entry point for the dialer administration CLI
//!
//! Operates directly on the dialer database: schema setup, contact import,
//! recycling, releasing an evicted agent's locks, sweeping stale locks and
//! printing campaign snapshots.

mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dialer_core::config::LogSettings;
use dialer_core::logging::{setup_logging, LoggingConfig};
use dialer_core::notifier::NoopNotifier;
use dialer_core::{DialerConfig, DialerEngine};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(author, version, about = "Outbound dialer administration", long_about = None)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, env = "DIALER_CONFIG")]
    config: Option<PathBuf>,

    /// Database URL, overriding the configuration
    #[arg(short, long)]
    database: Option<String>,

    /// Enable debug logging with source locations and span events
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    /// Logging from the `[logging]` section, with command-line flags on top
    fn logging_config(&self, settings: &LogSettings) -> dialer_core::Result<LoggingConfig> {
        let mut logging = LoggingConfig::from_settings(settings)?;
        if self.log_json {
            logging = logging.with_json();
        }
        if self.verbose {
            logging.level = tracing::Level::DEBUG;
            logging = logging.with_file_info().with_spans();
        }
        Ok(logging)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database schema, and optionally a campaign
    Init {
        /// Name of a campaign to create
        #[arg(long)]
        campaign: Option<String>,

        /// Qualification group the campaign draws outcomes from
        #[arg(long, requires = "campaign")]
        group: Option<String>,

        /// JSON file holding the campaign's quota rules
        #[arg(long, requires = "campaign")]
        rules: Option<PathBuf>,

        /// Enforce the quota rules during allocation
        #[arg(long, requires = "campaign")]
        quotas_enabled: bool,
    },

    /// Import contacts from a JSON array of rows
    Import {
        #[arg(long)]
        campaign: String,

        #[arg(long)]
        file: PathBuf,

        /// Reject rows duplicating an existing or earlier row
        #[arg(long)]
        dedup: bool,

        /// Field forming the dedup key (repeatable)
        #[arg(long = "dedup-field", requires = "dedup")]
        dedup_fields: Vec<String>,
    },

    /// Put contacts qualified with a recyclable outcome back in the pool
    Recycle {
        #[arg(long)]
        campaign: String,

        #[arg(long)]
        qualification: String,
    },

    /// Release every lock held by an agent
    ReleaseAgent {
        #[arg(long)]
        agent: String,
    },

    /// Resolve locks older than the configured stale age
    SweepLocks,

    /// Print a campaign snapshot
    Snapshot {
        #[arg(long)]
        campaign: String,

        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = DialerConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(url) = &cli.database {
        config.database.url = url.clone();
    }

    setup_logging(cli.logging_config(&config.logging)?)?;

    debug!("Using database {}", config.database.url);
    let engine = DialerEngine::new(config, Arc::new(NoopNotifier))
        .await
        .context("opening dialer database")?;

    match cli.command {
        Command::Init {
            campaign,
            group,
            rules,
            quotas_enabled,
        } => commands::init::execute(&engine, campaign, group, rules, quotas_enabled).await,
        Command::Import {
            campaign,
            file,
            dedup,
            dedup_fields,
        } => commands::import::execute(&engine, &campaign, &file, dedup, dedup_fields).await,
        Command::Recycle { campaign, qualification } => {
            commands::recycle::execute(&engine, &campaign, &qualification).await
        }
        Command::ReleaseAgent { agent } => commands::locks::release_agent(&engine, &agent).await,
        Command::SweepLocks => commands::locks::sweep(&engine).await,
        Command::Snapshot { campaign, json } => commands::snapshot::execute(&engine, &campaign, json).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("dialer").chain(args.iter().copied()))
    }

    #[test]
    fn test_parse_import() {
        let cli = parse(&[
            "--database",
            "sqlite::memory:",
            "import",
            "--campaign",
            "c1",
            "--file",
            "rows.json",
            "--dedup",
            "--dedup-field",
            "phone_number",
            "--dedup-field",
            "last_name",
        ])
        .unwrap();

        assert_eq!(cli.database.as_deref(), Some("sqlite::memory:"));
        match cli.command {
            Command::Import {
                campaign,
                file,
                dedup,
                dedup_fields,
            } => {
                assert_eq!(campaign, "c1");
                assert_eq!(file, PathBuf::from("rows.json"));
                assert!(dedup);
                assert_eq!(dedup_fields, vec!["phone_number", "last_name"]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_maintenance_commands() {
        assert!(matches!(
            parse(&["release-agent", "--agent", "agent-a"]).unwrap().command,
            Command::ReleaseAgent { agent } if agent == "agent-a"
        ));
        assert!(matches!(parse(&["sweep-locks"]).unwrap().command, Command::SweepLocks));
        assert!(matches!(
            parse(&["snapshot", "--campaign", "c1", "--json"]).unwrap().command,
            Command::Snapshot { json: true, .. }
        ));
        assert!(matches!(
            parse(&["init"]).unwrap().command,
            Command::Init { campaign: None, quotas_enabled: false, .. }
        ));
    }

    #[test]
    fn test_dependent_flags_are_rejected_alone() {
        let err = parse(&["import", "--campaign", "c1", "--file", "rows.json", "--dedup-field", "phone_number"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);

        let err = parse(&["init", "--group", "g1"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);

        let err = parse(&["release-agent"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);

        assert!(parse(&[]).is_err());
    }

    #[test]
    fn test_logging_flags() {
        let settings = LogSettings {
            level: "warn".to_string(),
            json: false,
        };

        let quiet = parse(&["sweep-locks"]).unwrap().logging_config(&settings).unwrap();
        assert_eq!(quiet.level, tracing::Level::WARN);
        assert!(!quiet.json && !quiet.file_info && !quiet.log_spans);

        let loud = parse(&["-v", "--log-json", "sweep-locks"])
            .unwrap()
            .logging_config(&settings)
            .unwrap();
        assert_eq!(loud.level, tracing::Level::DEBUG);
        assert!(loud.json && loud.file_info && loud.log_spans);
    }
}
