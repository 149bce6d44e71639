use clap::Parser;
use phenotype_dedup::cli::{output, Cli};
use phenotype_dedup::DedupError;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    // PHENODEDUP_LOG wins over -v
    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let log_level = std::env::var("PHENODEDUP_LOG").unwrap_or_else(|_| default_level.to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = phenotype_dedup::cli::run(cli) {
        output::error(&format!("Error: {}", e));

        let exit_code = match e.downcast_ref::<DedupError>() {
            Some(DedupError::Config(_)) => 2,
            Some(DedupError::Connection(_)) => 3,
            Some(DedupError::Io(_)) => 4,
            Some(DedupError::Database(_)) | Some(DedupError::Schema(_)) => 5,
            _ => 1,
        };
        process::exit(exit_code);
    }
}
