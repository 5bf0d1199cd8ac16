/// Farm summaries: plot inventory, peers, expected time to win, formatting

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::types::{Connection, ConnectionStatus, FarmSnapshot, NodeType, Plot};

/// Smallest currency units per coin (12 decimal places)
pub const UNITS_PER_COIN: u64 = 1_000_000_000_000;

/// Average minutes between blocks the farm competes for
pub const BLOCK_TIME_MINUTES: f64 = 5.0;

// ---------------------------------------------------------------------------
// Plots
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlotSummary {
    pub count: usize,
    pub total_bytes: u64,
    /// Plot count per k-size
    pub by_k: BTreeMap<u8, usize>,
}

impl PlotSummary {
    pub fn from_plots(plots: &[Plot]) -> Self {
        let mut summary = Self::default();
        for plot in plots {
            summary.count += 1;
            summary.total_bytes = summary.total_bytes.saturating_add(plot.file_size);
            *summary.by_k.entry(plot.size).or_insert(0) += 1;
        }
        summary
    }
}

// ---------------------------------------------------------------------------
// Connections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionSummary {
    pub total: usize,
    pub by_type: BTreeMap<NodeType, usize>,
    pub bytes_read: u64,
    pub bytes_written: u64,
}

impl ConnectionSummary {
    pub fn from_connections(connections: &[Connection]) -> Self {
        let mut summary = Self::default();
        for conn in connections {
            summary.total += 1;
            *summary.by_type.entry(conn.node_type).or_insert(0) += 1;
            summary.bytes_read = summary.bytes_read.saturating_add(conn.bytes_read);
            summary.bytes_written = summary.bytes_written.saturating_add(conn.bytes_written);
        }
        summary
    }

    pub fn count(&self, node_type: NodeType) -> usize {
        self.by_type.get(&node_type).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FarmingStatus {
    NotConnected,
    Connecting,
    /// Connected to the farmer but it has no full node peer
    NoFullNode,
    NoPlots,
    Farming,
}

impl FarmingStatus {
    pub fn of(snapshot: &FarmSnapshot) -> Self {
        match snapshot.connection_status {
            ConnectionStatus::Disconnected => Self::NotConnected,
            ConnectionStatus::Connecting => Self::Connecting,
            ConnectionStatus::Connected => {
                let has_full_node = snapshot
                    .connections
                    .iter()
                    .any(|c| c.node_type == NodeType::FullNode);
                if !has_full_node {
                    Self::NoFullNode
                } else if snapshot.plots.is_empty() {
                    Self::NoPlots
                } else {
                    Self::Farming
                }
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::NotConnected => "not connected",
            Self::Connecting => "connecting",
            Self::NoFullNode => "no full node peer",
            Self::NoPlots => "no plots",
            Self::Farming => "farming",
        }
    }
}

// ---------------------------------------------------------------------------
// Expected time to win
// ---------------------------------------------------------------------------

/// Average wait until one of our plots wins a block.
///
/// The farm wins a share of blocks equal to its share of network space, so
/// the expected wait is `block_minutes / (plot_bytes / network_space)`.
/// Returns `None` if there is nothing to estimate.
pub fn expected_time_to_win(
    plot_bytes: u64,
    network_space: &BigUint,
    block_minutes: f64,
) -> Option<Duration> {
    if plot_bytes == 0 || network_space.is_zero() || block_minutes <= 0.0 {
        return None;
    }
    let space = network_space.to_f64()?;
    let proportion = plot_bytes as f64 / space;
    let minutes = block_minutes / proportion;
    Duration::try_from_secs_f64(minutes * 60.0).ok()
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// Fraction digits shown when a coin is not a power of ten of units
const MAX_FRACTION_DIGITS: usize = 12;

/// `Some(n)` when `units_per_coin == 10^n`.
pub fn decimal_places(units_per_coin: u64) -> Option<usize> {
    let mut rest = units_per_coin;
    let mut places = 0;
    while rest >= 10 && rest % 10 == 0 {
        rest /= 10;
        places += 1;
    }
    (rest == 1).then_some(places)
}

/// Decimal rendering of `amount` in whole coins, trailing zeros trimmed.
///
/// Exact when `units_per_coin` is a power of ten; otherwise the fraction is
/// truncated to 12 digits.
pub fn format_amount(amount: &BigUint, units_per_coin: u64) -> String {
    if units_per_coin <= 1 {
        return amount.to_string();
    }
    let units = BigUint::from(units_per_coin);
    let whole = amount / &units;
    let places = decimal_places(units_per_coin).unwrap_or(MAX_FRACTION_DIGITS);
    let frac = (amount % &units) * BigUint::from(10u32).pow(places as u32) / &units;
    if frac.is_zero() {
        return whole.to_string();
    }
    let frac = format!("{:0>width$}", frac.to_string(), width = places);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

pub fn format_bytes(bytes: f64) -> String {
    const UNITS: [&str; 8] = ["KiB", "MiB", "GiB", "TiB", "PiB", "EiB", "ZiB", "YiB"];
    if bytes < 1024.0 {
        return format!("{:.0} B", bytes);
    }
    let mut value = bytes / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.3} {}", value, UNITS[unit])
}

pub fn format_big_bytes(bytes: &BigUint) -> String {
    format_bytes(bytes.to_f64().unwrap_or(f64::INFINITY))
}

pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;
    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plot(k: u8, bytes: u64) -> Plot {
        Plot {
            filename: format!("plot-k{}.plot", k),
            size: k,
            file_size: bytes,
            ..Plot::default()
        }
    }

    fn conn(t: NodeType, read: u64) -> Connection {
        Connection {
            node_type: t,
            bytes_read: read,
            bytes_written: 1,
            ..Connection::default()
        }
    }

    #[test]
    fn test_plot_summary() {
        let s = PlotSummary::from_plots(&[plot(32, 100), plot(32, 100), plot(33, 250)]);
        assert_eq!(s.count, 3);
        assert_eq!(s.total_bytes, 450);
        assert_eq!(s.by_k.get(&32), Some(&2));
        assert_eq!(s.by_k.get(&33), Some(&1));
    }

    #[test]
    fn test_connection_summary() {
        let s = ConnectionSummary::from_connections(&[
            conn(NodeType::FullNode, 10),
            conn(NodeType::Harvester, 5),
            conn(NodeType::FullNode, 1),
        ]);
        assert_eq!(s.total, 3);
        assert_eq!(s.count(NodeType::FullNode), 2);
        assert_eq!(s.count(NodeType::Wallet), 0);
        assert_eq!(s.bytes_read, 16);
        assert_eq!(s.bytes_written, 3);
    }

    #[test]
    fn test_farming_status() {
        let mut snap = FarmSnapshot::default();
        assert_eq!(FarmingStatus::of(&snap), FarmingStatus::NotConnected);

        snap.connection_status = ConnectionStatus::Connected;
        assert_eq!(FarmingStatus::of(&snap), FarmingStatus::NoFullNode);

        snap.connections.push(conn(NodeType::FullNode, 0));
        assert_eq!(FarmingStatus::of(&snap), FarmingStatus::NoPlots);

        snap.plots.push(plot(32, 1));
        assert_eq!(FarmingStatus::of(&snap), FarmingStatus::Farming);
    }

    #[test]
    fn test_expected_time_to_win() {
        // 1/128 of the network at 5 min/block -> 640 minutes
        let d = expected_time_to_win(1 << 10, &BigUint::from(1u32 << 17), 5.0).unwrap();
        assert_eq!(d.as_secs(), 640 * 60);

        assert!(expected_time_to_win(0, &BigUint::from(1u32), 5.0).is_none());
        assert!(expected_time_to_win(1, &BigUint::from(0u32), 5.0).is_none());
        assert!(expected_time_to_win(1, &BigUint::from(1u32), 0.0).is_none());
    }

    #[test]
    fn test_format_amount() {
        let units = UNITS_PER_COIN;
        assert_eq!(format_amount(&BigUint::from(0u32), units), "0");
        assert_eq!(format_amount(&BigUint::from(2_000_000_000_000u64), units), "2");
        assert_eq!(format_amount(&BigUint::from(1_750_000_000_000u64), units), "1.75");
        assert_eq!(format_amount(&BigUint::from(1u32), units), "0.000000000001");
        assert_eq!(format_amount(&BigUint::from(1234u32), 1), "1234");

        // beyond u64
        let big = BigUint::from(u64::MAX) * BigUint::from(1_000u32);
        assert_eq!(format_amount(&big, units), "18446744073.709551615");
    }

    #[test]
    fn test_format_amount_other_units() {
        assert_eq!(format_amount(&BigUint::from(7u32), 4), "1.75");
        assert_eq!(format_amount(&BigUint::from(1501u32), 1500), "1.000666666666");
        assert_eq!(format_amount(&BigUint::from(3u32), 3), "1");
        assert_eq!(format_amount(&BigUint::from(105u32), 100), "1.05");
    }

    #[test]
    fn test_decimal_places() {
        assert_eq!(decimal_places(1), Some(0));
        assert_eq!(decimal_places(10), Some(1));
        assert_eq!(decimal_places(UNITS_PER_COIN), Some(12));
        assert_eq!(decimal_places(10_000_000_000_000_000_000), Some(19));
        assert_eq!(decimal_places(0), None);
        assert_eq!(decimal_places(4), None);
        assert_eq!(decimal_places(1500), None);
        assert_eq!(decimal_places(20), None);
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512.0), "512 B");
        assert_eq!(format_bytes(1024.0), "1.000 KiB");
        assert_eq!(format_bytes(108.0 * 1024f64.powi(3)), "108.000 GiB");
        assert_eq!(format_big_bytes(&BigUint::from(1u64 << 50)), "1.000 PiB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(59 * 60)), "59m");
        assert_eq!(format_duration(Duration::from_secs(2 * 3600 + 300)), "2h 5m");
        assert_eq!(format_duration(Duration::from_secs(3 * 86_400 + 7200)), "3d 2h");
    }
}
