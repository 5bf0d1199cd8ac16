mod config;
mod panel;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::*;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use config::DashboardConfig;
use farmdash_core::summary::format_amount;
use farmdash_core::{
    ActionSink, ChannelSink, FarmSnapshot, FarmStore, FarmerAction, RewardAttributor,
    RewardTotals, RewardTracker, Sha256Hasher,
};
use panel::{print_connections, Panel, PanelView};

#[derive(Parser, Debug)]
#[command(
    name = "farmdash",
    version,
    about = "Farmdash - farming status, rewards and farmer actions in the terminal",
    long_about = None
)]
struct Cli {
    /// Config file path (default: ~/.farmdash/dashboard.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Farm snapshot JSON file
    #[arg(short, long)]
    snapshot: Option<PathBuf>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Quiet mode (warnings and errors only)
    #[arg(short, long)]
    quiet: bool,

    /// Debug logging
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the panel once
    Status,
    /// Re-render whenever the snapshot or reward totals change, until Ctrl+C
    Watch {
        /// Snapshot re-read interval in seconds
        #[arg(short, long)]
        interval: Option<u64>,
    },
    /// Print reward totals as JSON
    Rewards,
    /// Print the outbound request JSON for a farmer/harvester action
    Action {
        #[command(subcommand)]
        action: ActionCommand,
    },
    /// Write a default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ActionCommand {
    RefreshPlots,
    DeletePlot {
        filename: String,
    },
    OpenConnection {
        host: String,
        #[arg(default_value_t = 8444)]
        port: u16,
    },
    CloseConnection {
        node_id: String,
    },
    PlotDirectories,
}

impl From<ActionCommand> for FarmerAction {
    fn from(cmd: ActionCommand) -> Self {
        match cmd {
            ActionCommand::RefreshPlots => FarmerAction::RefreshPlots,
            ActionCommand::DeletePlot { filename } => FarmerAction::DeletePlot { filename },
            ActionCommand::OpenConnection { host, port } => {
                FarmerAction::OpenConnection { host, port }
            }
            ActionCommand::CloseConnection { node_id } => {
                FarmerAction::CloseConnection { node_id }
            }
            ActionCommand::PlotDirectories => FarmerAction::GetPlotDirectories,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Command::InitConfig { force } = cli.command {
        let path = match &cli.config {
            Some(path) => path.clone(),
            None => DashboardConfig::default_path()?,
        };
        return init_config(&path, force);
    }

    let config = load_config(&cli)?;
    init_logging(&config);

    if config.logging.no_color {
        colored::control::set_override(false);
    }

    debug!("snapshot source: {}", config.snapshot.path.display());

    match cli.command {
        Command::Status => run_status(&config).await,
        Command::Watch { .. } => run_watch(&config).await,
        Command::Rewards => run_rewards(&config).await,
        Command::Action { action } => run_action(action.into()),
        Command::InitConfig { .. } => Ok(()),
    }
}

/// Defaults, then file, then `FARMDASH_*` variables, then flags.
fn load_config(cli: &Cli) -> anyhow::Result<DashboardConfig> {
    let mut config = match &cli.config {
        Some(path) => DashboardConfig::from_file(path)?,
        None => DashboardConfig::load_default()?,
    };
    config.apply_env(|key| std::env::var(key).ok())?;

    if let Some(path) = &cli.snapshot {
        config.snapshot.path = path.clone();
    }
    if let Command::Watch { interval: Some(secs) } = cli.command {
        config.snapshot.poll_interval_secs = secs;
    }
    if cli.no_color {
        config.logging.no_color = true;
    }
    if cli.quiet {
        config.logging.quiet = true;
    }
    if cli.debug {
        config.logging.level = "debug".to_string();
    }

    config.validate()?;
    Ok(config)
}

fn init_logging(config: &DashboardConfig) {
    let level = if config.logging.quiet && config.log_filter() > log::LevelFilter::Warn {
        log::LevelFilter::Warn
    } else {
        config.log_filter()
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}

fn init_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    DashboardConfig::default().save(path)?;
    println!(
        "{} {} {}",
        " * ".bright_green().bold(),
        "wrote".white(),
        path.display().to_string().bright_cyan()
    );
    Ok(())
}

fn read_snapshot(config: &DashboardConfig) -> anyhow::Result<FarmSnapshot> {
    FarmSnapshot::from_file(&config.snapshot.path)
        .with_context(|| format!("Failed to load snapshot {}", config.snapshot.path.display()))
}

async fn evaluate(snapshot: &FarmSnapshot) -> anyhow::Result<RewardTotals> {
    let totals = RewardAttributor::new(Sha256Hasher)
        .evaluate(&snapshot.wallets, &CancellationToken::new())
        .await?;
    Ok(totals)
}

// ═══════════════════════════════════════════════════════════════════════
// ONE-SHOT COMMANDS
// ═══════════════════════════════════════════════════════════════════════

async fn run_status(config: &DashboardConfig) -> anyhow::Result<()> {
    let snapshot = read_snapshot(config)?;
    let totals = evaluate(&snapshot).await?;

    if !config.logging.quiet {
        print_banner();
    }
    let view = PanelView::build(&snapshot, Some(&totals), &config.display);
    Panel::new(false).print(&view);
    println!();
    print_connections(&snapshot.connections);
    Ok(())
}

async fn run_rewards(config: &DashboardConfig) -> anyhow::Result<()> {
    let snapshot = read_snapshot(config)?;
    let totals = evaluate(&snapshot).await?;

    let report = serde_json::json!({
        "total_amount": totals.total_amount.to_string(),
        "total_coins": format_amount(&totals.total_amount, config.display.units_per_coin),
        "currency": &config.display.currency,
        "biggest_height": totals.biggest_height,
        "last_farmed_height": totals.last_farmed_height(),
        "reward_count": totals.reward_count,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_action(action: FarmerAction) -> anyhow::Result<()> {
    let (sink, mut rx) = ChannelSink::new();
    sink.dispatch(action)?;
    let message = rx
        .try_recv()
        .context("Action was not queued")?;
    println!("{}", serde_json::to_string_pretty(&message.to_json()?)?);
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
// WATCH MODE
// ═══════════════════════════════════════════════════════════════════════

/// Re-read the snapshot file every `interval` and push it into the store.
/// Unreadable files are logged and skipped; the last good snapshot stays.
fn spawn_poller(
    store: Arc<FarmStore>,
    path: PathBuf,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => match FarmSnapshot::from_file(&path) {
                    Ok(snapshot) => {
                        if store.replace(snapshot) {
                            debug!("snapshot changed");
                        }
                    }
                    Err(e) => warn!("skipping snapshot reload from {}: {}", path.display(), e),
                },
            }
        }
    })
}

async fn run_watch(config: &DashboardConfig) -> anyhow::Result<()> {
    let store = Arc::new(FarmStore::new(read_snapshot(config)?));
    let tracker = Arc::new(RewardTracker::new(Sha256Hasher));
    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            signal::ctrl_c().await.ok();
            cancel.cancel();
        });
    }

    let poller = spawn_poller(
        store.clone(),
        config.snapshot.path.clone(),
        config.poll_interval(),
        cancel.clone(),
    );
    let mut tracker_task = {
        let tracker = tracker.clone();
        let updates = store.subscribe();
        let cancel = cancel.clone();
        tokio::spawn(async move { tracker.run(updates, cancel).await })
    };

    if !config.logging.quiet {
        print_banner();
    }
    info!(
        "watching {} every {}s",
        config.snapshot.path.display(),
        config.snapshot.poll_interval_secs
    );

    let mut panel = Panel::new(true);
    let mut snapshots = store.subscribe();
    let mut totals = tracker.subscribe();

    let outcome = loop {
        let view = {
            let snapshot = snapshots.borrow_and_update().clone();
            let current = totals.borrow_and_update().clone();
            PanelView::build(&snapshot, current.as_ref(), &config.display)
        };
        panel.print(&view);

        tokio::select! {
            _ = cancel.cancelled() => break None,
            res = &mut tracker_task => break Some(res),
            res = snapshots.changed() => {
                if res.is_err() {
                    break None;
                }
                panel.set_event("snapshot updated".to_string());
            }
            res = totals.changed() => {
                if res.is_err() {
                    break None;
                }
                if let Some(t) = totals.borrow().as_ref() {
                    panel.set_event(format!(
                        "rewards {} {} at height {}",
                        format_amount(&t.total_amount, config.display.units_per_coin),
                        config.display.currency,
                        t.biggest_height,
                    ));
                }
            }
        }
    };

    println!(
        "\n{} {} {}\n",
        format!("[{}]", chrono::Local::now().format("%H:%M:%S")).bright_black(),
        "signal".bright_yellow(),
        "shutting down...".bright_yellow().bold(),
    );
    cancel.cancel();
    poller.await?;
    let tracked = match outcome {
        Some(res) => res,
        None => tracker_task.await,
    };
    tracked?.context("Reward tracker failed")?;
    Ok(())
}

fn print_banner() {
    println!();
    println!("{}", " ╔══════════════════════════════════════════════════════════════════╗".bright_cyan());
    println!("{}{}{}", " ║ ".bright_cyan(), "       FARMDASH  ·  farming status and rewards                  ".bright_white().bold(), " ║".bright_cyan());
    println!("{}", " ╚══════════════════════════════════════════════════════════════════╝".bright_cyan());
    println!();
}
