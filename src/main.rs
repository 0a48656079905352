mod cli_args;

use std::path::Path;

use ai_llm_service::LlmServiceProfiles;
use ai_llm_service::config::default_config::profiles_from_env;
use ai_llm_service::telemetry;
use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use doc_reviewer::{
    DocumentTree, Finding, LocateOutcome, ReviewConfig, Severity, generate_findings,
    locate_finding, summarize_document,
};
use tracing::{Level, debug};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use cli_args::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; variables may come from the shell.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::registry()
        .with(telemetry::env_filter_with_level("warn", level))
        .with(telemetry::layer())
        .init();

    match cli.command {
        Commands::Review { file, json, name } => {
            let text = read_document(&file)?;
            let (service, cfg) = service_and_config()?;
            let findings = generate_findings(&service, &text, &cfg).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&findings)?);
            } else {
                print_report(&display_name(&file, name), &findings);
            }
        }
        Commands::Summarize { file, name } => {
            let text = read_document(&file)?;
            let (service, cfg) = service_and_config()?;
            let summary = summarize_document(&service, &text, &display_name(&file, name), &cfg).await?;
            println!("{summary}");
        }
        Commands::Locate { file, findings } => {
            let html = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let raw = std::fs::read_to_string(&findings)
                .with_context(|| format!("reading {}", findings.display()))?;
            let findings: Vec<Finding> =
                serde_json::from_str(&raw).context("parsing findings JSON")?;

            let doc = DocumentTree::from_html(&html);
            let outcomes: Vec<(&Finding, LocateOutcome)> =
                findings.iter().map(|f| (f, locate_finding(f, &doc))).collect();
            let anchored = outcomes.iter().filter(|(_, o)| o.anchor().is_some()).count();
            debug!("locate: {}/{} finding(s) anchored", anchored, outcomes.len());

            let report: Vec<_> = outcomes
                .iter()
                .map(|(f, o)| serde_json::json!({ "id": f.id, "outcome": o }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn service_and_config() -> anyhow::Result<(LlmServiceProfiles, ReviewConfig)> {
    let profiles = profiles_from_env().context("loading LLM profiles")?;
    let cfg = ReviewConfig::from_env().context("loading review config")?;
    Ok((LlmServiceProfiles::new(profiles.review, Some(profiles.summary)), cfg))
}

/// Reads a document; `.html` files become block-separated review text.
fn read_document(path: &Path) -> anyhow::Result<String> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let is_html = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"));
    if is_html {
        Ok(DocumentTree::from_html(&raw).review_text())
    } else {
        Ok(raw)
    }
}

fn display_name(path: &Path, name: Option<String>) -> String {
    name.unwrap_or_else(|| {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string())
    })
}

fn print_report(name: &str, findings: &[Finding]) {
    println!("{} {} ({} finding(s))", "Review:".bold(), name, findings.len());
    for (i, f) in findings.iter().enumerate() {
        let sev = match f.severity {
            Severity::Critical => f.severity.as_str().red().bold(),
            Severity::High => f.severity.as_str().red(),
            Severity::Medium => f.severity.as_str().yellow(),
            Severity::Low => f.severity.as_str().green(),
        };
        println!("\n{}. [{}] {}", i + 1, sev, f.category.label().bold());
        println!("   {}", f.message);
        if let Some(q) = &f.quoted_excerpt {
            println!("   {} \"{}\"", "quote:".dimmed(), q);
        }
        if let Some(r) = &f.regulation_ref {
            println!("   {} {}", "regulation:".dimmed(), r);
        }
        if let Some(r) = &f.recommendation {
            println!("   {} {}", "recommendation:".dimmed(), r);
        }
    }
}
