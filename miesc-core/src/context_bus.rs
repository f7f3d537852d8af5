//! The context bus: a telemetry-only broadcast channel carrying structured
//! messages between subsystems (orchestrator, aggregator, RAG, LLM). Never
//! load-bearing for correctness — if nobody is listening, a run still
//! completes identically.
//!
//! Built on [`tokio::sync::broadcast`]: each subscriber gets its own lagging
//! receiver, so delivery is FIFO per-subscriber but there is no global total
//! order across subscribers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::warn;

/// The wire contract for a message on the context bus: `{protocol: "mcp/1",
/// agent, context_type, contract, timestamp, data, metadata}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextMessage {
    pub protocol: String,
    pub agent: String,
    pub context_type: ContextType,
    pub contract: String,
    pub timestamp: DateTime<Utc>,
    pub data: serde_json::Value,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ContextMessage {
    pub const PROTOCOL: &'static str = "mcp/1";

    #[must_use]
    pub fn new(agent: impl Into<String>, contract: impl Into<String>, context_type: ContextType, data: serde_json::Value) -> Self {
        Self {
            protocol: Self::PROTOCOL.to_string(),
            agent: agent.into(),
            context_type,
            contract: contract.into(),
            timestamp: Utc::now(),
            data,
            metadata: serde_json::Map::new(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// What kind of context a [`ContextMessage`] is carrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextType {
    LayerStarted,
    LayerCompleted,
    AdapterStarted,
    AdapterCompleted,
    FindingEmitted,
    Diagnostic,
    Error,
}

#[derive(Debug, Error)]
pub enum ContextBusError {
    #[error("context bus closed")]
    Closed,
}

/// A broadcast-backed bus. Cloning a [`ContextBus`] shares the same
/// underlying channel; publishing from any clone reaches every subscriber.
#[derive(Clone)]
pub struct ContextBus {
    sender: Arc<broadcast::Sender<ContextMessage>>,
}

impl ContextBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Publishes a message. If there are no subscribers, this is a no-op
    /// rather than an error — the bus is telemetry, not a required handoff.
    pub fn publish(&self, message: ContextMessage) {
        if self.sender.send(message).is_err() {
            // No active subscribers; nothing to deliver to.
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> ContextStream {
        ContextStream {
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for ContextBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// A single subscriber's view of the bus.
pub struct ContextStream {
    receiver: broadcast::Receiver<ContextMessage>,
}

impl ContextStream {
    /// Receives the next message, logging (and skipping past) a lag event
    /// rather than surfacing it as an error — a slow subscriber missing
    /// some telemetry is expected behavior, not a failure.
    pub async fn recv(&mut self) -> Result<ContextMessage, ContextBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(message) => return Ok(message),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "context bus subscriber lagged, dropping messages");
                }
                Err(broadcast::error::RecvError::Closed) => return Err(ContextBusError::Closed),
            }
        }
    }
}
