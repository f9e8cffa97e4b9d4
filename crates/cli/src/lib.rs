use amplify_metrics::{catalog, compute_report};
use anyhow::{Context as AnyhowContext, Result};
use chrono::Utc;
use clap::Parser;
use std::io;

pub mod config;
pub mod fetch;
pub mod publish;
pub mod summary;

use config::Config;
use fetch::{fetch_all, StreakClient};
use publish::PublishOutcome;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "amplify-update")]
#[command(about = "Regenerate the Amplify partner dashboard from the CRM pipeline", long_about = None)]
#[command(version)]
struct Cli {
    /// Write data.js and index.html but do not commit or push
    #[arg(long)]
    no_git: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(short, long)]
    quiet: bool,

    /// Print the JSON schema of the generated data and exit
    #[arg(long)]
    print_schema: bool,
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    // reqwest/hyper connection chatter is only useful when debugging
    if !cli.verbose {
        builder.filter_module("hyper", log::LevelFilter::Warn);
        builder.filter_module("reqwest", log::LevelFilter::Warn);
    }
    builder.target(env_logger::Target::Stderr).init();

    if cli.print_schema {
        let schema = amplify_protocol::report_schema().context("Failed to build report schema")?;
        return print_stdout(&format!("{}\n", serde_json::to_string_pretty(&schema)?));
    }

    catalog::validate().context("Invalid lookup tables")?;
    let config = Config::from_env(!cli.no_git)?;
    log::debug!("{config:?}");
    run(&config).await
}

pub async fn run(config: &Config) -> Result<()> {
    let client = StreakClient::new(config)?;
    let (records, labels) = tokio::join!(
        fetch_all(&client, config.page_size),
        client.fetch_label_map()
    );
    let records = records.context("Failed to fetch pipeline boxes")?;

    let now = Utc::now();
    let report = compute_report(&records, &labels, now);
    print_stdout(&summary::render_summary(&report))?;

    let path = publish::write_data_file(&config.site_dir, &report)?;
    let size_kb = std::fs::metadata(&path).map(|m| m.len() / 1024).unwrap_or(0);
    log::info!("Wrote {} ({size_kb}KB)", path.display());

    if publish::bust_cache(&config.site_dir, &now.timestamp().to_string())? {
        log::info!("Updated cache-bust token in {}", publish::INDEX_FILE);
    }

    if !config.publish {
        log::info!("Skipping git (--no-git)");
        return Ok(());
    }

    match publish::publish(&config.site_dir, &report.last_updated)? {
        PublishOutcome::Pushed => log::info!("Pushed dashboard update"),
        PublishOutcome::NothingToCommit => {
            log::info!("No changes to push, data is already up to date")
        }
    }
    Ok(())
}
