//! Event types flowing between the broker, the orchestrator and observers.

use broker_core::{BrokerStatus, ResolvedPlugin};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope wrapping all events with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event ID
    pub id: Uuid,
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
    /// The actual event
    pub event: Event,
}

impl EventEnvelope {
    /// Create a new event envelope with auto-generated ID and timestamp
    pub fn new(event: Event) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
        }
    }
}

/// All events carried by the bus
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The broker reported progress or a terminal result for a workspace
    #[serde(rename = "broker.status")]
    BrokerStatus {
        workspace_id: Uuid,
        status: BrokerStatus,
        /// Broker-supplied failure message, present when status is `Failed`
        error: Option<String>,
        /// Resolved plugin list, present when status is `Done`
        plugins: Option<Vec<ResolvedPlugin>>,
    },

    /// A container log line forwarded for an external observer
    #[serde(rename = "broker.log")]
    BrokerLog {
        workspace_id: Uuid,
        pod_name: String,
        text: String,
    },

    /// The platform reported the broker pod can never succeed
    #[serde(rename = "pod.unrecoverable")]
    PodUnrecoverable {
        workspace_id: Uuid,
        pod_name: String,
        reason: String,
        message: String,
    },
}

impl Event {
    /// Get the workspace this event is scoped to
    pub fn workspace_id(&self) -> Uuid {
        match self {
            Event::BrokerStatus { workspace_id, .. } => *workspace_id,
            Event::BrokerLog { workspace_id, .. } => *workspace_id,
            Event::PodUnrecoverable { workspace_id, .. } => *workspace_id,
        }
    }

    /// Shorthand for a terminal `Done` status event
    pub fn broker_done(workspace_id: Uuid, plugins: Vec<ResolvedPlugin>) -> Self {
        Event::BrokerStatus {
            workspace_id,
            status: BrokerStatus::Done,
            error: None,
            plugins: Some(plugins),
        }
    }

    /// Shorthand for a terminal `Failed` status event
    pub fn broker_failed(workspace_id: Uuid, error: impl Into<String>) -> Self {
        Event::BrokerStatus {
            workspace_id,
            status: BrokerStatus::Failed,
            error: Some(error.into()),
            plugins: None,
        }
    }
}
