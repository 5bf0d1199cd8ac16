use chrono::{DateTime, Local, TimeZone, Utc};
use colored::*;
use farmdash_core::summary::{
    expected_time_to_win, format_amount, format_big_bytes, format_bytes, format_duration,
};
use farmdash_core::{
    Connection, ConnectionSummary, FarmSnapshot, FarmingStatus, NodeType, PlotSummary,
    RewardTotals,
};
use std::io::Write;

use crate::config::DisplayConfig;

// ═══════════════════════════════════════════════════════════════════════
// PANEL VIEW: plain values, computed once per render
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct PanelView {
    pub status: FarmingStatus,
    /// `None` until reward totals have been evaluated
    pub farmed: Option<String>,
    pub last_height: Option<u64>,
    pub reward_count: usize,
    pub plots: PlotSummary,
    pub network_space: String,
    pub time_to_win: Option<String>,
    pub peers: ConnectionSummary,
}

impl PanelView {
    pub fn build(
        snapshot: &FarmSnapshot,
        totals: Option<&RewardTotals>,
        display: &DisplayConfig,
    ) -> Self {
        let plots = PlotSummary::from_plots(&snapshot.plots);
        let time_to_win = expected_time_to_win(
            plots.total_bytes,
            &snapshot.blockchain_space,
            display.block_time_minutes,
        )
        .map(format_duration);

        Self {
            status: FarmingStatus::of(snapshot),
            farmed: totals.map(|t| {
                format!(
                    "{} {}",
                    format_amount(&t.total_amount, display.units_per_coin),
                    display.currency
                )
            }),
            last_height: totals.and_then(RewardTotals::last_farmed_height),
            reward_count: totals.map_or(0, |t| t.reward_count),
            network_space: format_big_bytes(&snapshot.blockchain_space),
            time_to_win,
            peers: ConnectionSummary::from_connections(&snapshot.connections),
            plots,
        }
    }

    fn k_sizes(&self) -> String {
        if self.plots.by_k.is_empty() {
            return "—".to_string();
        }
        self.plots
            .by_k
            .iter()
            .map(|(k, n)| format!("k{}×{}", k, n))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn status_colored(status: FarmingStatus) -> ColoredString {
    let label = status.label();
    match status {
        FarmingStatus::Farming => label.bright_green().bold(),
        FarmingStatus::Connecting => label.bright_yellow(),
        FarmingStatus::NoFullNode | FarmingStatus::NoPlots => label.yellow(),
        FarmingStatus::NotConnected => label.bright_red().bold(),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// STATIC ANSI PANEL: in-place overwrite in watch mode
// ═══════════════════════════════════════════════════════════════════════

pub struct Panel {
    print_count: u64,
    last_event: Option<String>,
    in_place: bool,
}

impl Panel {
    /// How many terminal lines the panel occupies
    const PANEL_LINES: usize = 10;

    /// `in_place` redraws over the previous panel instead of scrolling.
    pub fn new(in_place: bool) -> Self {
        Self {
            print_count: 0,
            last_event: None,
            in_place,
        }
    }

    pub fn set_event(&mut self, msg: String) {
        self.last_event = Some(format!("[{}] {}", Local::now().format("%H:%M:%S"), msg));
    }

    /// Render the panel.
    /// \x1B[{N}A moves the cursor up N lines, \x1B[2K erases the line.
    pub fn print(&mut self, view: &PanelView) {
        self.print_count += 1;

        let mut out = std::io::stdout().lock();
        if self.in_place && self.print_count > 1 {
            let _ = write!(out, "\x1B[{}A", Self::PANEL_LINES);
        }

        let bar = "─".repeat(64);
        let edge = "│".bright_black();
        let farmed = view.farmed.as_deref().unwrap_or("evaluating…");
        let last = view
            .last_height
            .map_or_else(|| "never".to_string(), |h| h.to_string());
        let win = view.time_to_win.as_deref().unwrap_or("—");
        let event = self.last_event.as_deref().unwrap_or("—");

        let _ = writeln!(out, "\x1B[2K\r{}", format!("┌{}┐", bar).bright_black());
        let _ = writeln!(
            out,
            "\x1B[2K\r{}  {}  {}",
            edge,
            "STATUS".bright_white().bold(),
            status_colored(view.status),
        );
        let _ = writeln!(
            out,
            "\x1B[2K\r{}  {}  {}  rewards: {}",
            edge,
            "FARMED".bright_white().bold(),
            farmed.bright_cyan().bold(),
            view.reward_count.to_string().bright_white(),
        );
        let _ = writeln!(
            out,
            "\x1B[2K\r{}  {}    height: {}",
            edge,
            "LAST".bright_white().bold(),
            last.bright_white(),
        );
        let _ = writeln!(
            out,
            "\x1B[2K\r{}  {}   {}  size: {}  {}",
            edge,
            "PLOTS".bright_white().bold(),
            view.plots.count.to_string().bright_magenta().bold(),
            format_bytes(view.plots.total_bytes as f64).bright_white(),
            view.k_sizes().bright_black(),
        );
        let _ = writeln!(
            out,
            "\x1B[2K\r{}  {}   network: {}",
            edge,
            "SPACE".bright_white().bold(),
            view.network_space.bright_white(),
        );
        let _ = writeln!(
            out,
            "\x1B[2K\r{}  {}     expected: {}",
            edge,
            "WIN".bright_white().bold(),
            win.bright_yellow(),
        );
        let _ = writeln!(
            out,
            "\x1B[2K\r{}  {}   {}  nodes: {}  ↓ {}  ↑ {}",
            edge,
            "PEERS".bright_white().bold(),
            view.peers.total.to_string().bright_white(),
            view.peers.count(NodeType::FullNode).to_string().bright_cyan(),
            format_bytes(view.peers.bytes_read as f64).bright_black(),
            format_bytes(view.peers.bytes_written as f64).bright_black(),
        );
        let _ = writeln!(
            out,
            "\x1B[2K\r{}  {}   {}",
            edge,
            "EVENT".bright_white().bold(),
            event.bright_green(),
        );
        let _ = writeln!(out, "\x1B[2K\r{}", format!("└{}┘", bar).bright_black());

        let _ = out.flush();
    }
}

// ═══════════════════════════════════════════════════════════════════════
// CONNECTION LISTING
// ═══════════════════════════════════════════════════════════════════════

fn fmt_last_message(ts: f64) -> String {
    if !ts.is_finite() || ts <= 0.0 {
        return "—".to_string();
    }
    match Utc.timestamp_opt(ts as i64, 0).single() {
        Some(t) => DateTime::<Local>::from(t).format("%H:%M:%S").to_string(),
        None => "—".to_string(),
    }
}

fn short_id(node_id: &str) -> &str {
    let id = node_id.strip_prefix("0x").unwrap_or(node_id);
    id.get(..10).unwrap_or(id)
}

pub fn connection_rows(connections: &[Connection]) -> Vec<String> {
    let mut sorted: Vec<&Connection> = connections.iter().collect();
    sorted.sort_by(|a, b| a.node_type.cmp(&b.node_type).then(a.peer_host.cmp(&b.peer_host)));
    sorted
        .into_iter()
        .map(|c| {
            format!(
                "{:<11} {:<10} {:>21}  ↓ {:>12}  ↑ {:>12}  last {}",
                c.node_type.name(),
                short_id(&c.node_id),
                format!("{}:{}", c.peer_host, c.peer_port),
                format_bytes(c.bytes_read as f64),
                format_bytes(c.bytes_written as f64),
                fmt_last_message(c.last_message_time),
            )
        })
        .collect()
}

pub fn print_connections(connections: &[Connection]) {
    println!("{} {}", " * ".bright_green().bold(), "CONNECTIONS".bright_white().bold());
    let rows = connection_rows(connections);
    if rows.is_empty() {
        println!("{}  {}", "   ".bright_black(), "no peers".bright_black());
    }
    for row in rows {
        println!("{}  {}", "   ".bright_black(), row.white());
    }
}
