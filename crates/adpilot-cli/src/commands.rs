use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use adpilot_adapters::{AdapterRegistry, FxTable};
use adpilot_analyst::{Analyst, AnthropicAnalyst, MockAnalyst};
use adpilot_config::{ConfigLoader, PilotConfig};
use adpilot_core::Result;
use adpilot_engine::{DecisionEngine, TickScheduler};
use adpilot_ledger::Ledger;

#[derive(Parser)]
#[command(name = "adpilot", version, about = "Autonomous ad budget optimization core")]
pub struct Cli {
    /// Path to adpilot.toml (default: ~/.adpilot/adpilot.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the decision engine loop at the configured cadence
    Start,
    /// Run exactly one tick and print the summary
    Tick,
    /// Inspect or resolve queued approvals
    Approvals {
        #[command(subcommand)]
        action: ApprovalsAction,
    },
    /// Show recent ledger actions
    Actions {
        /// Look-back window in hours
        #[arg(long, default_value_t = 24)]
        hours: i64,
    },
    /// Validate the config and probe every adapter
    Check,
}

#[derive(Subcommand)]
enum ApprovalsAction {
    /// List proposals awaiting approval
    List,
    /// Approve a queued proposal (re-checks guardrails, then executes)
    Approve { id: Uuid },
    /// Reject a queued proposal
    Reject {
        id: Uuid,
        /// Reason recorded in the ledger
        #[arg(long, default_value = "rejected via cli")]
        reason: String,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config_loader = ConfigLoader::load(self.config.as_deref())?;
        let config = config_loader.get();

        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            config.logging.level.as_str()
        };

        if config.logging.format == "json" {
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
                )
                .json()
                .with_target(true)
                .init();
        } else {
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
                )
                .with_target(false)
                .init();
        }

        match self.command {
            Commands::Start => cmd_start(config, config_loader).await,
            Commands::Tick => cmd_tick(config).await,
            Commands::Approvals { action } => cmd_approvals(config, action).await,
            Commands::Actions { hours } => cmd_actions(config, hours).await,
            Commands::Check => cmd_check(config).await,
        }
    }
}

/// Wire the engine from config: adapters (mock where credentials are
/// missing), the analyst (mock when no API key), and the ledger.
fn build_engine(config: &PilotConfig) -> Result<Arc<DecisionEngine>> {
    let fx = Arc::new(FxTable::default());
    let registry = Arc::new(AdapterRegistry::from_config(config, Arc::clone(&fx)));
    let ledger = Arc::new(Ledger::open(&config.ledger.db_path)?);

    let analyst: Arc<dyn Analyst> = if config.analyst.api_key.is_some() {
        Arc::new(AnthropicAnalyst::new(config.analyst.clone())?)
    } else {
        tracing::warn!("no analyst API key configured, using the mock analyst");
        Arc::new(MockAnalyst::new())
    };

    Ok(Arc::new(DecisionEngine::new(
        Arc::new(parking_lot::RwLock::new(config.clone())),
        registry,
        analyst,
        ledger,
        fx,
    )?))
}

async fn cmd_start(config: PilotConfig, config_loader: ConfigLoader) -> Result<()> {
    println!("adpilot v{}", env!("CARGO_PKG_VERSION"));
    println!("   Cadence: every {}s", config.engine.tick_interval_secs);
    println!("   Automation: {}", config.guardrails.automation_level);
    println!("   Ledger: {}", config.ledger.db_path.display());
    println!();

    // Config hot-reload watcher (kept alive for the duration of the run)
    let _watcher = match config_loader.watch() {
        Ok(w) => Some(w),
        Err(e) => {
            tracing::warn!(error = %e, "config hot-reload disabled");
            None
        }
    };

    let engine = build_engine(&config)?;
    let scheduler = TickScheduler::new(Arc::clone(&engine));
    let shutdown = scheduler.shutdown_handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\nshutting down after the current tick");
            let _ = shutdown.send(());
        }
    });

    scheduler.run().await;
    Ok(())
}

async fn cmd_tick(config: PilotConfig) -> Result<()> {
    let engine = build_engine(&config)?;
    let summary = engine.run_tick(chrono::Utc::now()).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn cmd_approvals(config: PilotConfig, action: ApprovalsAction) -> Result<()> {
    let engine = build_engine(&config)?;
    let now = chrono::Utc::now();
    match action {
        ApprovalsAction::List => {
            let pending = engine.list_pending_approvals(now);
            if pending.is_empty() {
                println!("no proposals awaiting approval");
            }
            for entry in pending {
                println!(
                    "{}  {}  {}  expires {}",
                    entry.proposal.id,
                    entry.proposal.campaign,
                    entry.proposal.kind,
                    entry.expires_at.format("%H:%M:%S")
                );
            }
        }
        ApprovalsAction::Approve { id } => {
            let record = engine.approve(id, now).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        ApprovalsAction::Reject { id, reason } => {
            let record = engine.reject(id, &reason, now)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
    }
    Ok(())
}

async fn cmd_actions(config: PilotConfig, hours: i64) -> Result<()> {
    let engine = build_engine(&config)?;
    let since = chrono::Utc::now() - chrono::Duration::hours(hours);
    let actions = engine.get_recent_actions(since)?;
    if actions.is_empty() {
        println!("no actions in the last {hours}h");
        return Ok(());
    }
    for record in actions {
        println!(
            "{}  {}  {}  {:?}  {}",
            record.recorded_at.format("%Y-%m-%d %H:%M"),
            record.campaign,
            record.kind,
            record.decision.verdict,
            record
                .outcome
                .map(|o| o.to_string())
                .unwrap_or_else(|| "OPEN".into()),
        );
    }
    Ok(())
}

async fn cmd_check(config: PilotConfig) -> Result<()> {
    match config.validate() {
        Ok(warnings) if warnings.is_empty() => println!("config: ok"),
        Ok(warnings) => {
            println!("config: ok with {} warning(s)", warnings.len());
            for w in warnings {
                println!("  - {w}");
            }
        }
        Err(e) => {
            println!("config: invalid\n{e}");
            return Ok(());
        }
    }

    let fx = Arc::new(FxTable::default());
    let registry = AdapterRegistry::from_config(&config, fx);
    for (platform, health) in registry.health_all().await {
        let mode = registry
            .get(platform)
            .map(|a| if a.is_mock() { " (mock)" } else { "" })
            .unwrap_or("");
        match health {
            adpilot_adapters::HealthStatus::Ok => println!("{platform}{mode}: ok"),
            adpilot_adapters::HealthStatus::Failing { reason } => {
                println!("{platform}{mode}: failing: {reason}")
            }
        }
    }
    Ok(())
}
