use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use first_everything::{FirstEverythingFetcher, render_summary};

const OUTPUT_DELIMITER: &str = "FIRST_EVERYTHING_EOF";

#[derive(Parser, Debug)]
#[command(name = "first-everything")]
#[command(version)]
#[command(about = "Find the first of everything a GitHub user did", long_about = None)]
struct Args {
    /// Account to inspect.
    #[arg(short, long, env = "INPUT_USERNAME")]
    username: String,

    /// API token; falls back to INPUT_TOKEN, then GITHUB_TOKEN.
    #[arg(short, long, env = "INPUT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Write the JSON results here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Minimum spacing between API calls, in milliseconds.
    #[arg(long, default_value_t = 150)]
    interval_ms: u64,

    /// API base URL, e.g. for GitHub Enterprise.
    #[arg(long, env = "GITHUB_API_URL", default_value = "https://api.github.com")]
    api_url: String,

    /// Markdown summary file to append to.
    #[arg(long, env = "GITHUB_STEP_SUMMARY", hide = true)]
    step_summary: Option<PathBuf>,

    /// Key/value output file.
    #[arg(long, env = "GITHUB_OUTPUT", hide = true)]
    github_output: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

fn setup_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .init();
}

fn append(path: &Path, text: &str) -> anyhow::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open {}", path.display()))?;
    file.write_all(text.as_bytes())
        .with_context(|| format!("cannot write {}", path.display()))
}

fn multiline_output(name: &str, value: &str) -> String {
    format!("{name}<<{OUTPUT_DELIMITER}\n{value}\n{OUTPUT_DELIMITER}\n")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose);

    let token = args
        .token
        .or_else(|| std::env::var("GITHUB_TOKEN").ok())
        .unwrap_or_default();

    let fetcher = FirstEverythingFetcher::builder()
        .with_token(token)
        .with_api_url(args.api_url)
        .with_min_interval(Duration::from_millis(args.interval_ms))
        .build()
        .context("cannot set up the API client")?;

    let username = args.username.trim();
    log::info!("Fetching first everything for @{username}");
    let report = fetcher.fetch_first_everything(username).await?;

    let summary = render_summary(&report);
    let results = report.to_json_pretty()?;
    log::info!("\n{summary}");

    match &args.output {
        Some(path) => fs::write(path, &results)
            .with_context(|| format!("cannot write {}", path.display()))?,
        None => println!("{results}"),
    }

    if let Some(path) = &args.step_summary {
        append(path, &format!("\n{summary}\n"))?;
    }
    if let Some(path) = &args.github_output {
        append(
            path,
            &(multiline_output("results", &results) + &multiline_output("summary", &summary)),
        )?;
    }

    if let Some(snapshot) = fetcher.metrics_snapshot() {
        log::debug!(
            "{} probes: {} found, {} empty, {} failed ({} timed out)",
            snapshot.global.total_probes,
            snapshot.global.found,
            snapshot.global.empty,
            snapshot.global.failures,
            snapshot.global.timeouts
        );
    }
    Ok(())
}
