pub mod output;

use crate::core::config::{load_config, Config, ConnectionConfig, TableLayout};
use crate::core::deduplicator::Deduplicator;
use crate::report::DedupReport;
use crate::storage;
use clap::Parser;
use sqlx::Connection;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "phenotype-dedup",
    version,
    about = "Merge phenotype rows whose descriptions differ only in case or punctuation",
    long_about = "Groups phenotype descriptions by a case- and punctuation-insensitive key, keeps \
                  one canonical row per group, repoints phenotype_feature and \
                  phenotype_ontology_accession rows to it and deletes the rest. Every touched row \
                  is copied into a backup table first.",
    disable_help_flag = true
)]
pub struct Cli {
    /// Database host
    #[arg(short = 'h', long, env = "PHENODEDUP_HOST")]
    pub host: Option<String>,

    /// Database user
    #[arg(short = 'u', long, env = "PHENODEDUP_USER")]
    pub user: Option<String>,

    /// Database port [default: 3306]
    #[arg(short = 'P', long, env = "PHENODEDUP_PORT")]
    pub port: Option<u16>,

    /// Database password
    #[arg(short = 'p', long, env = "PHENODEDUP_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Variation database name
    #[arg(short = 'd', long, env = "PHENODEDUP_DB")]
    pub db: Option<String>,

    /// Full connection URL (mysql:// or sqlite://), replaces the flags above
    #[arg(long, env = "PHENODEDUP_URL", hide_env_values = true)]
    pub url: Option<String>,

    /// TOML file with [connection] and [tables] sections
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Report duplicates without changing the database
    #[arg(long)]
    pub dry_run: bool,

    /// Write the run summary as JSON
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Print help
    #[arg(long, action = clap::ArgAction::Help)]
    pub help: Option<bool>,
}

impl Cli {
    fn connection_overrides(&self) -> ConnectionConfig {
        ConnectionConfig {
            host: self.host.clone(),
            user: self.user.clone(),
            port: self.port,
            password: self.password.clone(),
            db: self.db.clone(),
        }
    }

    /// Resolve the connection URL from `--url` or the merged connection
    /// settings. Fails on missing parameters before anything connects.
    pub fn resolve_url(&self, config: &Config) -> crate::Result<String> {
        if let Some(url) = &self.url {
            storage::Dialect::from_url(url)?;
            return Ok(url.clone());
        }
        let settings = config
            .connection
            .clone()
            .merge(self.connection_overrides())
            .validate()?;
        output::tree_item(true, "Target", Some(&settings.display_target()));
        settings.to_url()
    }
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    config.tables.validate()?;

    let url = cli.resolve_url(&config)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let report = runtime.block_on(execute(
        &url,
        config.tables,
        cli.dry_run,
        !cli.no_progress,
    ))?;

    report.render();

    if let Some(path) = &cli.report {
        report.write_json(path)?;
        output::success(&format!("Report written to {}", path.display()));
    }
    Ok(())
}

async fn execute(
    url: &str,
    layout: TableLayout,
    dry_run: bool,
    show_progress: bool,
) -> crate::Result<DedupReport> {
    let (mut conn, dialect) = storage::connect(url).await?;

    let report = Deduplicator::new(&mut conn, dialect, layout)
        .with_dry_run(dry_run)
        .with_progress(show_progress)
        .run()
        .await?;

    conn.close().await?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_short_flags() {
        let cli = Cli::try_parse_from([
            "phenotype-dedup",
            "-h",
            "db-host",
            "-u",
            "admin",
            "-P",
            "3307",
            "-p",
            "pw",
            "-d",
            "homo_sapiens_variation",
        ])
        .unwrap();
        assert_eq!(cli.host.as_deref(), Some("db-host"));
        assert_eq!(cli.port, Some(3307));
        assert_eq!(cli.password.as_deref(), Some("pw"));
        assert_eq!(cli.db.as_deref(), Some("homo_sapiens_variation"));
        assert!(!cli.dry_run);
    }

    #[test]
    fn test_missing_flags_fail_before_connecting() {
        let cli = Cli::try_parse_from(["phenotype-dedup", "--host", "db-host", "--db", "v"]).unwrap();
        let err = cli.resolve_url(&Config::default()).unwrap_err();
        assert!(matches!(err, crate::DedupError::Config(_)));
        assert!(err.to_string().contains("--user"));
    }

    #[test]
    fn test_url_flag_skips_individual_flags() {
        let cli = Cli::try_parse_from(["phenotype-dedup", "--url", "sqlite::memory:"]).unwrap();
        assert_eq!(cli.resolve_url(&Config::default()).unwrap(), "sqlite::memory:");
    }

    #[test]
    fn test_help_flag_is_long_only() {
        let err = Cli::try_parse_from(["phenotype-dedup", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
