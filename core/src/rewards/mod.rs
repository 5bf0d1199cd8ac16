//! Farming Reward Attribution
//!
//! A farmed block pays its reward through coins whose parent id encodes the
//! block height. Depending on protocol version that parent id is either
//!
//!   1. the height as a 32-byte big-endian integer, or
//!   2. `sha256(sha256(height as 4-byte big-endian))`.
//!
//! A wallet transaction is a farming reward iff the parent id of its first
//! addition equals one of the two encodings for the transaction's confirmed
//! height, with or without a `0x` prefix. Matching amounts are summed with
//! arbitrary precision and the highest matching height is kept.

pub mod tracker;

use log::debug;
use num_bigint::BigUint;
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::crypto::{encode_big_endian, is_bytes32_hex, to_hex, HashError, HashPrimitive};
use crate::types::{Transaction, Wallet};

pub use tracker::RewardTracker;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Width of the direct height encoding (a full coin id)
pub const HEIGHT_WIDTH: usize = 32;

/// Width of the height preimage hashed into the commitment encoding
pub const COMMITMENT_WIDTH: usize = 4;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Aggregate of all farming rewards found in a wallet snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RewardTotals {
    /// Sum of matching amounts, smallest currency unit
    #[serde(with = "crate::types::bigint_serde")]
    pub total_amount: BigUint,
    /// Highest matching height, 0 when nothing matched
    pub biggest_height: u64,
    /// Number of matching transactions
    pub reward_count: usize,
}

impl RewardTotals {
    /// Highest farmed height, distinguishing a reward at height 0 from none.
    pub fn last_farmed_height(&self) -> Option<u64> {
        (self.reward_count > 0).then_some(self.biggest_height)
    }

    fn record(&mut self, tx: &Transaction) {
        self.total_amount += &tx.amount;
        self.biggest_height = self.biggest_height.max(tx.confirmed_at_index);
        self.reward_count += 1;
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RewardError {
    #[error("hash primitive failed: {0}")]
    Hash(#[from] HashError),
    #[error("reward evaluation cancelled")]
    Cancelled,
}

/// The parent ids a reward coin at one height may carry, as bare hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeightCandidates {
    pub height_hex: Option<String>,
    pub height_double_hash_hex: Option<String>,
}

impl HeightCandidates {
    /// Compare a parent id against both encodings, `0x` optional.
    pub fn matches(&self, parent_coin_info: &str) -> bool {
        let bare = parent_coin_info.strip_prefix("0x").unwrap_or(parent_coin_info);
        [&self.height_hex, &self.height_double_hash_hex]
            .into_iter()
            .flatten()
            .any(|candidate| candidate.as_str() == bare)
    }
}

// ---------------------------------------------------------------------------
// Attribution
// ---------------------------------------------------------------------------

fn ensure_live(cancel: &CancellationToken) -> Result<(), RewardError> {
    if cancel.is_cancelled() {
        Err(RewardError::Cancelled)
    } else {
        Ok(())
    }
}

pub struct RewardAttributor<H> {
    hasher: H,
}

impl<H: HashPrimitive> RewardAttributor<H> {
    pub fn new(hasher: H) -> Self {
        Self { hasher }
    }

    /// Compute both parent-id encodings for `height`.
    ///
    /// The two hashes run one after the other; the token is checked around
    /// each of them.
    pub async fn candidates(
        &self,
        height: u64,
        cancel: &CancellationToken,
    ) -> Result<HeightCandidates, RewardError> {
        let height_big = BigUint::from(height);
        let height_hex = encode_big_endian(&height_big, HEIGHT_WIDTH).map(|b| to_hex(&b));

        let height_double_hash_hex = match encode_big_endian(&height_big, COMMITMENT_WIDTH) {
            Some(preimage) => {
                ensure_live(cancel)?;
                let first = self.hasher.sha256(&preimage).await?;
                ensure_live(cancel)?;
                let second = self.hasher.sha256(&first).await?;
                ensure_live(cancel)?;
                Some(to_hex(&second))
            }
            // Heights past u32 have no commitment encoding
            None => None,
        };

        Ok(HeightCandidates {
            height_hex,
            height_double_hash_hex,
        })
    }

    /// Is `tx` a farming reward?
    ///
    /// Transactions without additions are rejected before any hashing.
    pub async fn is_reward(
        &self,
        tx: &Transaction,
        cancel: &CancellationToken,
    ) -> Result<bool, RewardError> {
        let Some(first) = tx.additions.first() else {
            return Ok(false);
        };
        let candidates = self.candidates(tx.confirmed_at_index, cancel).await?;
        if candidates.matches(&first.parent_coin_info) {
            return Ok(true);
        }
        if !is_bytes32_hex(&first.parent_coin_info) {
            debug!(
                "malformed parent id at height {}: {:?}",
                tx.confirmed_at_index, first.parent_coin_info
            );
        }
        Ok(false)
    }

    /// Classify every transaction of every wallet and aggregate the rewards.
    ///
    /// Wallets are processed in order, transactions in order, one at a time.
    /// A hash failure or cancellation aborts the whole evaluation; no partial
    /// totals are returned.
    pub async fn evaluate(
        &self,
        wallets: &[Option<Wallet>],
        cancel: &CancellationToken,
    ) -> Result<RewardTotals, RewardError> {
        let mut totals = RewardTotals::default();

        for wallet in wallets.iter().flatten() {
            for tx in &wallet.transactions {
                if self.is_reward(tx, cancel).await? {
                    debug!(
                        "farming reward: wallet={} height={} amount={}",
                        wallet.id, tx.confirmed_at_index, tx.amount
                    );
                    totals.record(tx);
                }
            }
        }

        ensure_live(cancel)?;
        Ok(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Sha256Hasher;
    use crate::types::Coin;

    fn tx(height: u64, amount: u64, parent: &str) -> Transaction {
        Transaction {
            confirmed_at_index: height,
            amount: BigUint::from(amount),
            additions: vec![Coin {
                parent_coin_info: parent.to_string(),
                ..Coin::default()
            }],
        }
    }

    fn direct_hex(height: u64) -> String {
        format!("{:064x}", height)
    }

    #[tokio::test]
    async fn test_candidates_direct_encoding() {
        let attributor = RewardAttributor::new(Sha256Hasher);
        let c = attributor.candidates(5, &CancellationToken::new()).await.unwrap();
        assert_eq!(
            c.height_hex.as_deref(),
            Some("0000000000000000000000000000000000000000000000000000000000000005")
        );
        assert_eq!(c.height_double_hash_hex.as_ref().map(|h| h.len()), Some(64));
    }

    #[tokio::test]
    async fn test_candidates_large_height_has_no_commitment() {
        let attributor = RewardAttributor::new(Sha256Hasher);
        let height = u32::MAX as u64 + 1;
        let c = attributor.candidates(height, &CancellationToken::new()).await.unwrap();
        assert_eq!(c.height_hex, Some(direct_hex(height)));
        assert!(c.height_double_hash_hex.is_none());
    }

    #[test]
    fn test_matches_prefix_variants() {
        let c = HeightCandidates {
            height_hex: Some("aa".repeat(32)),
            height_double_hash_hex: Some("bb".repeat(32)),
        };
        assert!(c.matches(&"aa".repeat(32)));
        assert!(c.matches(&format!("0x{}", "aa".repeat(32))));
        assert!(c.matches(&"bb".repeat(32)));
        assert!(c.matches(&format!("0x{}", "bb".repeat(32))));
        assert!(!c.matches(&"cc".repeat(32)));
        assert!(!c.matches("0x"));
        assert!(!c.matches(""));
    }

    #[tokio::test]
    async fn test_single_reward() {
        let attributor = RewardAttributor::new(Sha256Hasher);
        let wallets = vec![Some(Wallet {
            id: 1,
            transactions: vec![tx(5, 1000, &direct_hex(5))],
        })];
        let totals = attributor
            .evaluate(&wallets, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(totals.total_amount, BigUint::from(1000u32));
        assert_eq!(totals.biggest_height, 5);
        assert_eq!(totals.last_farmed_height(), Some(5));
    }

    #[tokio::test]
    async fn test_reward_at_height_zero_is_distinguishable() {
        let attributor = RewardAttributor::new(Sha256Hasher);
        let wallets = vec![Some(Wallet {
            id: 1,
            transactions: vec![tx(0, 7, &direct_hex(0))],
        })];
        let totals = attributor
            .evaluate(&wallets, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(totals.biggest_height, 0);
        assert_eq!(totals.last_farmed_height(), Some(0));
        assert_eq!(RewardTotals::default().last_farmed_height(), None);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let attributor = RewardAttributor::new(Sha256Hasher);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let wallets = vec![Some(Wallet {
            id: 1,
            transactions: vec![tx(5, 1000, &direct_hex(5))],
        })];
        let res = attributor.evaluate(&wallets, &cancel).await;
        assert_eq!(res, Err(RewardError::Cancelled));
    }
}
