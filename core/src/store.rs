/// Farm State Store
///
/// Holds the current `FarmSnapshot` and notifies subscribers when it
/// changes. Writers that leave the snapshot untouched do not wake anyone.

use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

use crate::types::{Connection, ConnectionStatus, FarmSnapshot, Plot, Wallet};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse snapshot: {0}")]
    Parse(#[from] serde_json::Error),
}

impl FarmSnapshot {
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }
}

pub struct FarmStore {
    tx: watch::Sender<Arc<FarmSnapshot>>,
}

impl FarmStore {
    pub fn new(initial: FarmSnapshot) -> Self {
        let (tx, _) = watch::channel(Arc::new(initial));
        Self { tx }
    }

    pub fn snapshot(&self) -> Arc<FarmSnapshot> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<FarmSnapshot>> {
        self.tx.subscribe()
    }

    /// Apply `f` to the snapshot. Subscribers are notified only when `f`
    /// returns true.
    ///
    /// The snapshot is copied first if a reader still holds it, so prefer
    /// the setters below for plain field writes.
    pub fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut FarmSnapshot) -> bool,
    {
        self.tx.send_if_modified(|current| f(Arc::make_mut(current)))
    }

    /// Write `value` into the field selected by `get`/`get_mut`. The
    /// snapshot is only copied when the value actually differs.
    fn set_field<T, G, M>(&self, value: T, get: G, get_mut: M) -> bool
    where
        T: PartialEq,
        G: Fn(&FarmSnapshot) -> &T,
        M: Fn(&mut FarmSnapshot) -> &mut T,
    {
        self.tx.send_if_modified(|current| {
            if *get(&**current) == value {
                return false;
            }
            *get_mut(Arc::make_mut(current)) = value;
            true
        })
    }

    /// Swap in a whole new snapshot, e.g. after re-reading it from disk.
    pub fn replace(&self, snapshot: FarmSnapshot) -> bool {
        self.tx.send_if_modified(|current| {
            if **current == snapshot {
                return false;
            }
            *current = Arc::new(snapshot);
            true
        })
    }

    pub fn set_wallets(&self, wallets: Vec<Option<Wallet>>) -> bool {
        self.set_field(wallets, |s| &s.wallets, |s| &mut s.wallets)
    }

    pub fn set_plots(&self, plots: Vec<Plot>) -> bool {
        self.set_field(plots, |s| &s.plots, |s| &mut s.plots)
    }

    pub fn set_connections(&self, connections: Vec<Connection>) -> bool {
        self.set_field(connections, |s| &s.connections, |s| &mut s.connections)
    }

    pub fn set_connection_status(&self, status: ConnectionStatus) -> bool {
        self.set_field(status, |s| &s.connection_status, |s| &mut s.connection_status)
    }
}

impl Default for FarmStore {
    fn default() -> Self {
        Self::new(FarmSnapshot::default())
    }
}
