/// Outbound farmer/harvester requests
///
/// The dashboard never talks to the services itself. It hands typed
/// requests to an `ActionSink`; whatever owns the transport delivers them.
/// Delivery is fire-and-forget.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "data", rename_all = "snake_case")]
pub enum FarmerAction {
    RefreshPlots,
    DeletePlot { filename: String },
    OpenConnection { host: String, port: u16 },
    CloseConnection { node_id: String },
    GetPlotDirectories,
}

/// Service a request is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Service {
    Farmer,
    Harvester,
}

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("invalid action: {0}")]
    Invalid(String),
    #[error("action channel closed")]
    Closed,
    #[error("failed to encode action: {0}")]
    Encode(#[from] serde_json::Error),
}

impl FarmerAction {
    pub fn destination(&self) -> Service {
        match self {
            Self::RefreshPlots | Self::DeletePlot { .. } | Self::GetPlotDirectories => {
                Service::Harvester
            }
            Self::OpenConnection { .. } | Self::CloseConnection { .. } => Service::Farmer,
        }
    }

    pub fn validate(&self) -> Result<(), ActionError> {
        match self {
            Self::DeletePlot { filename } if filename.trim().is_empty() => {
                Err(ActionError::Invalid("plot filename is empty".to_string()))
            }
            Self::OpenConnection { host, .. } if host.trim().is_empty() => {
                Err(ActionError::Invalid("peer host is empty".to_string()))
            }
            Self::OpenConnection { port: 0, .. } => {
                Err(ActionError::Invalid("peer port must be non-zero".to_string()))
            }
            Self::CloseConnection { node_id } if node_id.trim().is_empty() => {
                Err(ActionError::Invalid("node id is empty".to_string()))
            }
            _ => Ok(()),
        }
    }
}

/// A request ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionMessage {
    pub destination: Service,
    pub action: FarmerAction,
}

impl ActionMessage {
    pub fn new(action: FarmerAction) -> Result<Self, ActionError> {
        action.validate()?;
        Ok(Self {
            destination: action.destination(),
            action,
        })
    }

    /// `{"destination": ..., "command": ..., "data": ...}`
    pub fn to_json(&self) -> Result<serde_json::Value, ActionError> {
        let mut value = serde_json::to_value(&self.action)?;
        if let serde_json::Value::Object(map) = &mut value {
            map.insert(
                "destination".to_string(),
                serde_json::to_value(self.destination)?,
            );
        }
        Ok(value)
    }
}

pub trait ActionSink {
    fn dispatch(&self, action: FarmerAction) -> Result<(), ActionError>;
}

/// Sink that queues messages on an unbounded channel.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ActionMessage>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ActionMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ActionSink for ChannelSink {
    fn dispatch(&self, action: FarmerAction) -> Result<(), ActionError> {
        let message = ActionMessage::new(action)?;
        log::debug!("dispatching {:?} to {:?}", message.action, message.destination);
        self.tx.send(message).map_err(|_| ActionError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape() {
        let msg = ActionMessage::new(FarmerAction::DeletePlot {
            filename: "/plots/plot-k32-1.plot".to_string(),
        })
        .unwrap();
        assert_eq!(
            msg.to_json().unwrap(),
            json!({
                "destination": "harvester",
                "command": "delete_plot",
                "data": {"filename": "/plots/plot-k32-1.plot"}
            })
        );

        let msg = ActionMessage::new(FarmerAction::RefreshPlots).unwrap();
        assert_eq!(
            msg.to_json().unwrap(),
            json!({"destination": "harvester", "command": "refresh_plots"})
        );
    }

    #[test]
    fn test_destinations() {
        assert_eq!(FarmerAction::GetPlotDirectories.destination(), Service::Harvester);
        assert_eq!(
            FarmerAction::CloseConnection { node_id: "ab".to_string() }.destination(),
            Service::Farmer
        );
    }

    #[test]
    fn test_validation() {
        assert!(FarmerAction::DeletePlot { filename: " ".to_string() }.validate().is_err());
        assert!(FarmerAction::OpenConnection { host: "node".to_string(), port: 0 }
            .validate()
            .is_err());
        assert!(FarmerAction::OpenConnection { host: "node".to_string(), port: 8444 }
            .validate()
            .is_ok());
    }

    #[tokio::test]
    async fn test_channel_sink() {
        let (sink, mut rx) = ChannelSink::new();
        sink.dispatch(FarmerAction::OpenConnection {
            host: "10.0.0.7".to_string(),
            port: 8444,
        })
        .unwrap();
        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.destination, Service::Farmer);

        drop(rx);
        assert!(matches!(
            sink.dispatch(FarmerAction::RefreshPlots),
            Err(ActionError::Closed)
        ));
    }
}
