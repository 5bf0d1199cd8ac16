/// Farm state types: wallets, plots and peer connections
///
/// These mirror the JSON the farmer, harvester and wallet services report.
/// Missing fields take their defaults. Null or wrong-typed coin ids, coin
/// lists and transaction lists are read as empty, so one broken transaction
/// does not stop the rest of the snapshot from loading; attribution then
/// skips it.

use num_bigint::BigUint;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// Read a `T`, falling back to `T::default()` when the value is null or of
/// the wrong shape.
pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match T::deserialize(value) {
        Ok(v) => Ok(v),
        Err(e) => {
            log::debug!("malformed field read as default: {}", e);
            Ok(T::default())
        }
    }
}

// ---------------------------------------------------------------------------
// Wallet data
// ---------------------------------------------------------------------------

/// A coin created by a transaction. Only the first addition of a
/// transaction is inspected by reward attribution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    /// Parent coin id, hex, optionally `0x`-prefixed
    #[serde(
        default,
        alias = "parent-coin-info",
        alias = "parentCoinInfo",
        deserialize_with = "or_default"
    )]
    pub parent_coin_info: String,
    #[serde(
        default,
        alias = "puzzle-hash",
        alias = "puzzleHash",
        deserialize_with = "or_default"
    )]
    pub puzzle_hash: String,
    #[serde(default, with = "bigint_serde")]
    pub amount: BigUint,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Block height the transaction was confirmed at
    #[serde(default, alias = "confirmedAtIndex")]
    pub confirmed_at_index: u64,
    /// Amount in the smallest currency unit
    #[serde(default, with = "bigint_serde")]
    pub amount: BigUint,
    #[serde(default, deserialize_with = "or_default")]
    pub additions: Vec<Coin>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    #[serde(default)]
    pub id: u32,
    #[serde(default, deserialize_with = "or_default")]
    pub transactions: Vec<Transaction>,
}

// ---------------------------------------------------------------------------
// Harvester / farmer data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plot {
    #[serde(default)]
    pub filename: String,
    /// k-size
    #[serde(default)]
    pub size: u8,
    /// Size on disk in bytes
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub plot_seed: String,
    #[serde(default)]
    pub plot_public_key: String,
    #[serde(default)]
    pub pool_public_key: String,
}

/// Peer role, encoded as the integer the services use on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum NodeType {
    FullNode,
    Harvester,
    Farmer,
    Timelord,
    Introducer,
    Wallet,
    Unknown(u8),
}

impl From<u8> for NodeType {
    fn from(v: u8) -> Self {
        match v {
            1 => Self::FullNode,
            2 => Self::Harvester,
            3 => Self::Farmer,
            4 => Self::Timelord,
            5 => Self::Introducer,
            6 => Self::Wallet,
            other => Self::Unknown(other),
        }
    }
}

impl From<NodeType> for u8 {
    fn from(t: NodeType) -> u8 {
        match t {
            NodeType::FullNode => 1,
            NodeType::Harvester => 2,
            NodeType::Farmer => 3,
            NodeType::Timelord => 4,
            NodeType::Introducer => 5,
            NodeType::Wallet => 6,
            NodeType::Unknown(other) => other,
        }
    }
}

impl Default for NodeType {
    fn default() -> Self {
        Self::Unknown(0)
    }
}

impl NodeType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::FullNode => "full node",
            Self::Harvester => "harvester",
            Self::Farmer => "farmer",
            Self::Timelord => "timelord",
            Self::Introducer => "introducer",
            Self::Wallet => "wallet",
            Self::Unknown(_) => "unknown",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    #[serde(default)]
    pub node_id: String,
    #[serde(default, rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub peer_host: String,
    #[serde(default)]
    pub peer_port: u16,
    #[serde(default)]
    pub peer_server_port: u16,
    #[serde(default)]
    pub bytes_read: u64,
    #[serde(default)]
    pub bytes_written: u64,
    /// Unix seconds
    #[serde(default)]
    pub creation_time: f64,
    /// Unix seconds
    #[serde(default)]
    pub last_message_time: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected,
    Connecting,
    #[default]
    Disconnected,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Everything the dashboard reads, as published by the farm store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FarmSnapshot {
    /// Null entries are wallets the backend has not loaded yet
    #[serde(default)]
    pub wallets: Vec<Option<Wallet>>,
    #[serde(default)]
    pub plots: Vec<Plot>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub connection_status: ConnectionStatus,
    /// Estimated total network space in bytes
    #[serde(default, with = "bigint_serde")]
    pub blockchain_space: BigUint,
}

/// Serde adapter for arbitrary-precision unsigned integers.
///
/// Reads JSON integers, integral floats and decimal strings; writes decimal
/// strings so values beyond 2^64 survive a round trip.
pub mod bigint_serde {
    use num_bigint::BigUint;
    use num_traits::{FromPrimitive, Num};
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_str_radix(10))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        deserializer.deserialize_any(BigUintVisitor)
    }

    struct BigUintVisitor;

    impl<'de> Visitor<'de> for BigUintVisitor {
        type Value = BigUint;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a non-negative integer or decimal string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<BigUint, E> {
            Ok(BigUint::from(v))
        }

        fn visit_u128<E: de::Error>(self, v: u128) -> Result<BigUint, E> {
            Ok(BigUint::from(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<BigUint, E> {
            u64::try_from(v)
                .map(BigUint::from)
                .map_err(|_| E::custom(format!("negative integer {}", v)))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<BigUint, E> {
            if v.is_finite() && v >= 0.0 && v.fract() == 0.0 {
                BigUint::from_f64(v).ok_or_else(|| E::custom(format!("unrepresentable {}", v)))
            } else {
                Err(E::custom(format!("not a non-negative integer: {}", v)))
            }
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<BigUint, E> {
            BigUint::from_str_radix(v.trim(), 10).map_err(E::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_accepts_rpc_spellings() {
        let json = r#"{
            "confirmedAtIndex": 12,
            "amount": "36893488147419103232",
            "additions": [{ "parent-coin-info": "0xabcd", "amount": 1 }]
        }"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.confirmed_at_index, 12);
        assert_eq!(tx.amount, BigUint::from(2u128.pow(65)));
        assert_eq!(tx.additions[0].parent_coin_info, "0xabcd");
    }

    #[test]
    fn test_missing_fields_default() {
        let tx: Transaction = serde_json::from_str("{}").unwrap();
        assert_eq!(tx, Transaction::default());
        assert!(tx.additions.is_empty());
    }

    #[test]
    fn test_null_and_wrong_typed_fields_read_as_empty() {
        let json = r#"{"wallets": [{"id": 1, "transactions": [
            {"confirmed_at_index": 5, "amount": 1, "additions": [{"parent_coin_info": "0x05"}]},
            {"confirmed_at_index": 6, "amount": 2, "additions": [{"parent_coin_info": null}]},
            {"confirmed_at_index": 7, "amount": 3, "additions": null},
            {"confirmed_at_index": 8, "amount": 4, "additions": "nope"},
            {"confirmed_at_index": 9, "amount": 5, "additions": [{"parent_coin_info": 42, "puzzle_hash": []}]}
        ]}, {"id": 2, "transactions": null}]}"#;
        let snap: FarmSnapshot = serde_json::from_str(json).unwrap();
        let txs = &snap.wallets[0].as_ref().unwrap().transactions;
        assert_eq!(txs.len(), 5);
        assert_eq!(txs[0].additions[0].parent_coin_info, "0x05");
        assert_eq!(txs[1].additions[0].parent_coin_info, "");
        assert!(txs[2].additions.is_empty());
        assert!(txs[3].additions.is_empty());
        assert_eq!(txs[4].additions[0].parent_coin_info, "");
        assert_eq!(txs[4].additions[0].puzzle_hash, "");
        assert!(snap.wallets[1].as_ref().unwrap().transactions.is_empty());
    }

    #[test]
    fn test_negative_amount_rejected() {
        let res: Result<Transaction, _> = serde_json::from_str(r#"{"amount": -5}"#);
        assert!(res.is_err());
    }

    #[test]
    fn test_snapshot_with_null_wallets() {
        let json = r#"{
            "wallets": [null, {"id": 1, "transactions": []}],
            "connection_status": "connected",
            "blockchain_space": 40000000000000000000,
            "connections": [{"node_id": "aa", "type": 1, "peer_host": "10.0.0.2"}]
        }"#;
        let snap: FarmSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snap.wallets.len(), 2);
        assert!(snap.wallets[0].is_none());
        assert_eq!(snap.connection_status, ConnectionStatus::Connected);
        assert_eq!(snap.connections[0].node_type, NodeType::FullNode);
        assert_eq!(snap.blockchain_space.to_string(), "40000000000000000000");
    }

    #[test]
    fn test_node_type_wire_values() {
        assert_eq!(NodeType::from(2), NodeType::Harvester);
        assert_eq!(u8::from(NodeType::Wallet), 6);
        assert_eq!(NodeType::from(42), NodeType::Unknown(42));
        assert_eq!(serde_json::to_string(&NodeType::Farmer).unwrap(), "3");
    }
}
