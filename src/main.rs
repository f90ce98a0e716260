use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use budget_baseline::audit::{IntegrityAuditLog, JsonlAuditStore};
use budget_baseline::clock::{Clock, SystemClock};
use budget_baseline::config::{AppConfig, AuditDispatch, AuditSinkKind};
use budget_baseline::database::Database;
use budget_baseline::integrity::IntegrityMetrics;
use budget_baseline::repository::{AuditStore, BudgetRepository};
use budget_baseline::BaselineOrchestrator;

#[derive(Parser)]
#[command(name = "budget-baseline")]
#[command(about = "Seal budgets and freeze project schedules as one baseline")]
struct Cli {
    /// Configuration file (defaults to ./baseline.toml when present)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the database schema
    Migrate,
    /// Approve a budget and freeze its project schedule
    Approve {
        #[arg(long)]
        budget: Uuid,
        #[arg(long)]
        approver: Uuid,
    },
    /// Check a sealed budget against its approval hash
    Verify {
        #[arg(long)]
        budget: Uuid,
        #[arg(long)]
        validator: Uuid,
    },
    /// Recompute and store the execution hash of a sealed budget
    RefreshExecution {
        #[arg(long)]
        budget: Uuid,
        #[arg(long)]
        actor: Uuid,
    },
    /// Print the approval hash of a budget as currently stored
    ApprovalHash {
        #[arg(long)]
        budget: Uuid,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Commands::Config = cli.command {
        println!("{}", config.to_toml()?);
        return Ok(());
    }

    let database = Arc::new(Database::new(&config.database_url).await?);
    database.run_migrations().await?;
    info!("Database ready");

    if let Commands::Migrate = cli.command {
        println!("Migrations applied");
        return Ok(());
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let metrics = Arc::new(IntegrityMetrics::new());
    let (audit, dispatcher) = build_audit_log(&config, &database, clock.clone(), metrics.clone())?;
    let orchestrator =
        BaselineOrchestrator::with_database(database.clone(), Arc::new(audit), clock, metrics);

    let outcome = run(&orchestrator, &database, cli.command).await;

    // Flush the outbox before exiting.
    drop(orchestrator);
    if let Some(handle) = dispatcher {
        if let Err(e) = handle.await {
            error!("Audit dispatcher ended abnormally: {}", e);
        }
    }

    outcome
}

fn build_audit_log(
    config: &AppConfig,
    database: &Arc<Database>,
    clock: Arc<dyn Clock>,
    metrics: Arc<IntegrityMetrics>,
) -> Result<(IntegrityAuditLog, Option<JoinHandle<()>>)> {
    if !config.audit.enabled {
        info!("Integrity audit log disabled");
        return Ok((IntegrityAuditLog::disabled(clock, metrics), None));
    }

    let store: Arc<dyn AuditStore> = match config.audit.sink {
        AuditSinkKind::Database => database.clone(),
        AuditSinkKind::Jsonl => Arc::new(JsonlAuditStore::open(&config.audit.log_path)?),
    };

    Ok(match config.audit.dispatch {
        AuditDispatch::Inline => (
            IntegrityAuditLog::inline(store, clock, metrics)
                .with_append_timeout(Duration::from_millis(config.audit.append_timeout_ms)),
            None,
        ),
        AuditDispatch::Outbox => {
            let (log, handle) = IntegrityAuditLog::with_outbox(store, clock, metrics);
            (log, Some(handle))
        }
    })
}

async fn run(
    orchestrator: &BaselineOrchestrator,
    database: &Database,
    command: Commands,
) -> Result<()> {
    match command {
        Commands::Approve { budget, approver } => {
            let snapshot = orchestrator.approve_budget(budget, approver).await?;
            println!("Budget {} approved", budget);
            println!("Schedule snapshot: {}", snapshot.id);
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Commands::Verify { budget, validator } => {
            orchestrator.verify_budget(budget, validator).await?;
            println!("Budget {} matches its seal", budget);
        }
        Commands::RefreshExecution { budget, actor } => {
            let hash = orchestrator.refresh_execution_hash(budget, actor).await?;
            println!("Execution hash: {}", hash);
        }
        Commands::ApprovalHash { budget } => {
            let loaded = database
                .find_budget(budget)
                .await?
                .ok_or_else(|| anyhow!("Budget {} not found", budget))?;
            let hash = orchestrator.integrity().compute_approval_hash(&loaded).await?;
            println!("{}", hash);
        }
        Commands::Migrate | Commands::Config => {}
    }
    Ok(())
}
