use log::{debug, error, info};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::{RewardAttributor, RewardError, RewardTotals};
use crate::crypto::HashPrimitive;
use crate::types::FarmSnapshot;

/// Keeps the last published reward totals and republishes only on change.
///
/// Subscribers see `None` until the first evaluation completes.
pub struct RewardTracker<H> {
    attributor: RewardAttributor<H>,
    published: watch::Sender<Option<RewardTotals>>,
}

impl<H: HashPrimitive> RewardTracker<H> {
    pub fn new(hasher: H) -> Self {
        let (published, _) = watch::channel(None);
        Self {
            attributor: RewardAttributor::new(hasher),
            published,
        }
    }

    /// Last published totals.
    pub fn current(&self) -> Option<RewardTotals> {
        self.published.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<RewardTotals>> {
        self.published.subscribe()
    }

    /// Evaluate `snapshot` and publish the result if it differs from the
    /// cached one. Returns whether subscribers were notified.
    ///
    /// Nothing is published when the evaluation fails or is cancelled.
    pub async fn refresh(
        &self,
        snapshot: &FarmSnapshot,
        cancel: &CancellationToken,
    ) -> Result<bool, RewardError> {
        let totals = self.attributor.evaluate(&snapshot.wallets, cancel).await?;
        if cancel.is_cancelled() {
            return Err(RewardError::Cancelled);
        }

        let changed = self.published.send_if_modified(|current| {
            if current.as_ref() == Some(&totals) {
                false
            } else {
                *current = Some(totals.clone());
                true
            }
        });

        if changed {
            info!(
                "reward totals updated: amount={} biggest_height={} rewards={}",
                totals.total_amount, totals.biggest_height, totals.reward_count
            );
        } else {
            debug!("reward totals unchanged");
        }
        Ok(changed)
    }

    /// Re-evaluate on every store update until `cancel` fires or the store
    /// goes away. Hash failures end the loop and are returned.
    pub async fn run(
        &self,
        mut updates: watch::Receiver<Arc<FarmSnapshot>>,
        cancel: CancellationToken,
    ) -> Result<(), RewardError> {
        loop {
            let snapshot = updates.borrow_and_update().clone();
            match self.refresh(&snapshot, &cancel).await {
                Ok(_) => {}
                Err(RewardError::Cancelled) => {
                    debug!("reward tracker cancelled mid-evaluation");
                    return Ok(());
                }
                Err(e) => {
                    error!("reward tracker stopped: {}", e);
                    return Err(e);
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                changed = updates.changed() => {
                    if changed.is_err() {
                        debug!("farm store dropped, reward tracker exiting");
                        return Ok(());
                    }
                }
            }
        }
    }
}
