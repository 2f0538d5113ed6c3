// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up console logging (tracing)
// 3. Crawl the site and validate every link
// 4. Print the broken links as a table or JSON
// 5. Exit with proper code (0 = no broken links, 1 = broken links, 2 = error)
// =============================================================================

mod checker; // src/checker/ - HTTP client, link extraction, URL filtering
mod cli; // src/cli.rs - command-line parsing
mod config; // src/config.rs - settings for one run
mod crawl; // src/crawl/ - the crawl engine
mod error; // src/error.rs - setup errors
mod report; // src/report/ - statuses, the response log, the final report

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use crawl::CrawlEngine;
use report::{Report, Status};
use tracing::{debug, info};

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // Setup failed before (or while) crawling
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// The main application logic
// Returns:
//   Ok(0) = no broken links
//   Ok(1) = broken links found
//   Err   = the run couldn't be started
async fn run() -> Result<i32> {
    let cli = Cli::parse();

    init_tracing(cli.log_level());
    debug!(url = %cli.url, css = cli.css, local = cli.local, "CLI arguments parsed");

    let config = cli.to_config()?;
    if let Some(path) = &config.logfile {
        info!("Logging responses to {}", path.display());
    }

    let engine = CrawlEngine::from_config(config)?;
    let report = engine.validate().await;

    print_report(&report, cli.json)?;

    Ok(if report.has_errors() { 1 } else { 0 })
}

// Console logging goes to stderr so `--json` output on stdout stays clean.
// Priority: RUST_LOG env var > -q > -v > info
fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_report(report: &Report, json: bool) -> Result<()> {
    if json {
        let json_output = serde_json::to_string_pretty(report)?;
        println!("{}", json_output);
    } else {
        print_table(report);
    }
    Ok(())
}

// Prints the broken links as a human-readable table, followed by a summary
fn print_table(report: &Report) {
    if report.has_errors() {
        println!("{:<70} {:<20}", "URL", "STATUS");
        println!("{}", "=".repeat(90));

        for (url, status) in report.errors.iter() {
            let url_display = if url.chars().count() > 67 {
                format!("{}...", url.chars().take(67).collect::<String>())
            } else {
                url.to_string()
            };

            println!("{:<70} {:<20}", url_display, format_status(status));
        }

        println!();
    }

    let total = report.responses.len();
    let broken = report.errors.len();

    println!("📊 Summary:");
    println!("   ✅ OK: {}", total - broken);
    println!("   ❌ Broken: {}", broken);
    println!("   📋 Total: {}", total);
}

fn format_status(status: Status) -> String {
    match status {
        Status::Code(code) if code >= 500 => format!("💥 {}", code),
        Status::Code(code) if code >= 400 => format!("❌ {}", code),
        Status::Code(code) => format!("⚠️  {}", code),
        Status::ConnectionRefused => "🚫 REFUSED".to_string(),
        Status::ConnectionProblems => "🌐 CONNECTION".to_string(),
    }
}
