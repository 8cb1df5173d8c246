//! Run command - export every institution with a token

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tracing::warn;

use finexport_core::{Dataset, ExportContext, ExportRequest, ExportSummary, StoreTarget};

use super::{load_config, load_registry};
use crate::output;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Invocation payload ({"public_tokens": ..., "transaction_lookback_days": ...}); `-` reads stdin
    #[arg(long)]
    pub event: Option<String>,

    /// Override the payload's transaction lookback
    #[arg(long)]
    pub lookback_days: Option<u32>,

    /// Public token for an institution, as alias=token (repeatable)
    #[arg(long = "token", value_parser = parse_token)]
    pub tokens: Vec<(String, String)>,

    /// Load the registry from a JSON file instead of the built-in one
    #[arg(long)]
    pub institutions: Option<PathBuf>,

    /// Write objects under this directory instead of S3
    #[arg(long, conflicts_with = "dry_run")]
    pub local_dir: Option<PathBuf>,

    /// Fetch and serialize but keep objects in memory
    #[arg(long)]
    pub dry_run: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: RunArgs) -> Result<()> {
    let request = build_request(&args)?;
    let config = load_config()?;
    let registry = load_registry(args.institutions.as_deref())?;

    let target = if args.dry_run {
        StoreTarget::Memory
    } else if let Some(dir) = &args.local_dir {
        StoreTarget::Local(dir.clone())
    } else {
        StoreTarget::S3
    };

    let ctx = ExportContext::new(config, registry, target).context("Failed to set up export")?;
    let summary = ctx.export_service.run(&request).context("Export failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    print_summary(&summary);
    if args.dry_run {
        for object in ctx.captured_objects() {
            output::info(&format!(
                "dry run: {} bytes for {}/{}",
                object.body.len(),
                object.bucket,
                object.key
            ));
        }
    }
    Ok(())
}

fn build_request(args: &RunArgs) -> Result<ExportRequest> {
    let mut request = match args.event.as_deref() {
        None => ExportRequest::default(),
        Some("-") => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read payload from stdin")?;
            ExportRequest::from_json(&text).context("Invalid payload")?
        }
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read payload file: {}", path))?;
            ExportRequest::from_json(&text).context("Invalid payload")?
        }
    };

    for (alias, token) in &args.tokens {
        match request.tokens.iter_mut().find(|(a, _)| a == alias) {
            Some(entry) => entry.1 = token.clone(),
            None => request.tokens.push((alias.clone(), token.clone())),
        }
    }
    if let Some(days) = args.lookback_days {
        request.lookback_days = days;
    }

    if request.tokens.is_empty() {
        warn!("No public tokens given; nothing will be exported");
    }
    Ok(request)
}

fn parse_token(value: &str) -> std::result::Result<(String, String), String> {
    match value.split_once('=') {
        Some((alias, token)) if !alias.trim().is_empty() => {
            Ok((alias.trim().to_string(), token.trim().to_string()))
        }
        _ => Err(format!("expected alias=token, got '{}'", value)),
    }
}

fn print_summary(summary: &ExportSummary) {
    println!("{}", "Export Summary".bold());
    println!();

    if summary.uploads.institutions.is_empty() {
        output::warning("No institutions were exported");
    } else {
        let mut table = output::create_table();
        table.set_header(vec!["Institution", "Name", "Accounts", "Transactions"]);
        for (alias, entry) in &summary.uploads.institutions {
            let name = entry
                .institution
                .get("name")
                .and_then(|n| n.as_str())
                .unwrap_or("-");
            table.add_row(vec![
                alias.clone(),
                name.to_string(),
                entry.account_count.to_string(),
                entry.transaction_count.to_string(),
            ]);
        }
        println!("{}", table);
        println!();
    }

    for dataset in [Dataset::Accounts, Dataset::Transactions] {
        if let Some(upload) = summary.uploads.dataset(dataset) {
            output::success(&format!(
                "{}: {} rows -> {}/{}",
                dataset, upload.record_count, upload.bucket, upload.key
            ));
        }
    }
}
