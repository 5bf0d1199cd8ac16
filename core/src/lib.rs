//! # Farmdash Core
//!
//! Farm state and farming-reward accounting for the farmdash dashboard.
//!
//! ```text
//! snapshot source → [FarmStore] → [RewardTracker] → RewardTotals subscribers
//!                        ↓
//!                   [summary] plots · peers · expected time to win
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use farmdash_core::{FarmSnapshot, RewardAttributor, Sha256Hasher};
//! use tokio_util::sync::CancellationToken;
//!
//! let snapshot = FarmSnapshot::from_file("farm.json")?;
//! let totals = RewardAttributor::new(Sha256Hasher)
//!     .evaluate(&snapshot.wallets, &CancellationToken::new())
//!     .await?;
//! println!("farmed {} up to height {}", totals.total_amount, totals.biggest_height);
//! ```

pub mod actions;
pub mod crypto;
pub mod rewards;
pub mod store;
pub mod summary;
pub mod types;

pub use actions::{ActionMessage, ActionSink, ChannelSink, FarmerAction, Service};
pub use crypto::{HashError, HashPrimitive, Sha256Hasher};
pub use rewards::{RewardAttributor, RewardError, RewardTotals, RewardTracker};
pub use store::{FarmStore, StoreError};
pub use summary::{ConnectionSummary, FarmingStatus, PlotSummary};
pub use types::{
    Coin, Connection, ConnectionStatus, FarmSnapshot, NodeType, Plot, Transaction, Wallet,
};
