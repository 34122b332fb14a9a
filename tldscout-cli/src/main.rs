mod display;

use std::io::IsTerminal;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tldscout_core::{parse_domains_from_file, EngineConfig, ProgressTracker};
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use display::{BatchProgress, HumanFormatter, ProgressWriterFactory};

#[derive(Parser)]
#[command(name = "tldscout")]
#[command(about = "Registry enrichment for domain lists - owner, nameservers, status via RDAP")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Human, global = true)]
    format: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Human,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Enrich every domain in a file
    Enrich {
        /// File containing domains: one per line, # for comments, or CSV (uses first column)
        file: String,
        /// Domains of one TLD looked up at the same time
        #[arg(long)]
        concurrency: Option<usize>,
        /// Pause between batches of the same TLD, in milliseconds
        #[arg(long)]
        batch_delay_ms: Option<u64>,
        /// Attempts per registry service for each domain
        #[arg(long)]
        retries: Option<usize>,
        /// Hide the progress bar
        #[arg(short, long)]
        quiet: bool,
    },
    /// List the configured registry services
    Registries,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(ProgressWriterFactory)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Enrich {
            file,
            concurrency,
            batch_delay_ms,
            retries,
            quiet,
        } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read domain file {}", file))?;
            let domains = parse_domains_from_file(&content);

            if domains.is_empty() {
                eprintln!(
                    "{} No valid domains found in file. Expected format: one domain per line, # for comments, or CSV (first column)",
                    "Error:".bright_red()
                );
                std::process::exit(1);
            }

            let mut enricher = config.build_enricher()?;
            if let Some(concurrency) = concurrency {
                enricher = enricher.with_concurrency(concurrency);
            }
            if let Some(ms) = batch_delay_ms {
                enricher = enricher.with_batch_delay(Duration::from_millis(ms));
            }
            if let Some(retries) = retries {
                enricher = enricher.with_retries(retries);
            }

            let cancel = CancellationToken::new();
            {
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        warn!("Interrupted, finishing in-flight lookups");
                        cancel.cancel();
                    }
                });
            }

            let progress = ProgressTracker::new();
            let bar = (!quiet).then(|| BatchProgress::start(domains.len()));
            let callback = bar.as_ref().map(BatchProgress::callback);

            let results = enricher
                .enrich_with(&domains, &progress, &cancel, callback.as_ref())
                .await?;

            if let Some(bar) = bar {
                bar.finish();
            }

            let mut results: Vec<_> = results.into_values().collect();
            results.sort_by(|a, b| a.domain.cmp(&b.domain));
            let snapshot = progress.snapshot();
            let services = enricher.status_report();

            match cli.format {
                OutputFormat::Json => {
                    let output = serde_json::json!({
                        "results": results,
                        "progress": snapshot,
                        "services": services,
                    });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Human => {
                    let formatter = human_formatter();
                    for result in &results {
                        println!("{}", formatter.format_result(result));
                    }
                    println!("{}", formatter.format_summary(&snapshot));
                    if !services.is_empty() {
                        println!("{}", formatter.format_status(&services));
                    }
                }
            }
        }
        Commands::Registries => {
            let directory = config.directory()?;
            match cli.format {
                OutputFormat::Json => {
                    let output = serde_json::json!({
                        "primaries": directory.primaries(),
                        "default": directory.default_primary(),
                        "fallbacks": directory.fallbacks(),
                    });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Human => {
                    println!("{}", human_formatter().format_directory(&directory));
                }
            }
        }
    }

    Ok(())
}

fn human_formatter() -> HumanFormatter {
    if std::io::stdout().is_terminal() {
        HumanFormatter::new()
    } else {
        HumanFormatter::new().without_colors()
    }
}
