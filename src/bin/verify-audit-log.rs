use anyhow::{anyhow, Result};
use clap::{Arg, ArgAction, Command};
use std::collections::HashMap;
use std::path::Path;
use tracing::{error, info};

use budget_baseline::audit::entry::IntegrityAuditEntry;
use budget_baseline::audit::store::load_entries;
use budget_baseline::audit::verify_entries;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("verify-audit-log")
        .version("0.1.0")
        .about("Verify a JSONL integrity audit log")
        .arg(
            Arg::new("log-path")
                .short('l')
                .long("log-path")
                .value_name("PATH")
                .help("Path to audit log file")
                .required(true),
        )
        .arg(
            Arg::new("budget")
                .short('b')
                .long("budget")
                .value_name("UUID")
                .help("Only report entries for this budget"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Enable verbose output"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .help("Suppress output except errors"),
        )
        .get_matches();

    let log_path = matches
        .get_one::<String>("log-path")
        .ok_or_else(|| anyhow!("--log-path is required"))?;
    let budget = matches
        .get_one::<String>("budget")
        .map(|b| Uuid::parse_str(b))
        .transpose()?;
    let verbose = matches.get_flag("verbose");
    let quiet = matches.get_flag("quiet");

    let level = if quiet {
        tracing::Level::ERROR
    } else if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    if let Err(e) = verify_log_file(log_path, budget, verbose) {
        error!("Audit log verification failed: {}", e);
        std::process::exit(1);
    }

    if !quiet {
        println!("✓ Audit log verification completed successfully");
    }
    Ok(())
}

fn verify_log_file(log_path: &str, budget: Option<Uuid>, verbose: bool) -> Result<()> {
    info!("Verifying audit log: {}", log_path);

    let path = Path::new(log_path);
    if !path.exists() {
        return Err(anyhow!("Audit log file not found: {}", log_path));
    }

    let entries = load_entries(path)?;
    if entries.is_empty() {
        return Err(anyhow!("Audit log is empty"));
    }

    // Ordering and uniqueness are checked over the whole file.
    let result = verify_entries(&entries);
    if verbose {
        println!("{}", result.detailed_status());
    }
    if !result.is_valid() {
        return Err(anyhow!(result.summary()));
    }

    if let Some(budget_id) = budget {
        let scoped: Vec<&IntegrityAuditEntry> =
            entries.iter().filter(|e| e.budget_id == budget_id).collect();
        print_budget_history(budget_id, &scoped);
    } else if verbose {
        print_budget_counts(&entries);
    }

    Ok(())
}

fn print_budget_history(budget_id: Uuid, entries: &[&IntegrityAuditEntry]) {
    println!("\nBudget {} ({} entries):", budget_id, entries.len());
    for entry in entries {
        println!(
            "  {} {} {} by {}{}",
            entry.timestamp.to_rfc3339(),
            entry.event_type,
            entry.outcome.as_str(),
            entry.actor,
            entry
                .detail
                .as_deref()
                .map(|d| format!(" ({})", d))
                .unwrap_or_default()
        );
    }
}

fn print_budget_counts(entries: &[IntegrityAuditEntry]) {
    let mut per_budget: HashMap<Uuid, usize> = HashMap::new();
    for entry in entries {
        *per_budget.entry(entry.budget_id).or_insert(0) += 1;
    }

    println!("\nEntries per budget:");
    let mut rows: Vec<_> = per_budget.into_iter().collect();
    rows.sort();
    for (budget_id, count) in rows {
        println!("  {}: {}", budget_id, count);
    }
}
