//! Third phase: bridge broker status events to the result future.

use async_trait::async_trait;
use uuid::Uuid;

use broker_core::ResolvedPlugin;
use events::EventBus;

use crate::error::Result;
use crate::future::BrokerResultFuture;
use crate::listeners::BrokerStatusListener;
use crate::phases::BrokerPhase;

/// Subscribes the status listener before anything is deployed so no broker
/// report can be missed, and unsubscribes it once the delegate finished —
/// the one mandatory cleanup action of this phase, taken on success and
/// failure alike.
pub struct ListenBrokerEvents {
    bus: EventBus,
    workspace_id: Uuid,
    future: BrokerResultFuture,
    validate: bool,
    next: Box<dyn BrokerPhase>,
}

impl ListenBrokerEvents {
    pub fn new(
        bus: EventBus,
        workspace_id: Uuid,
        future: BrokerResultFuture,
        validate: bool,
        next: Box<dyn BrokerPhase>,
    ) -> Self {
        Self {
            bus,
            workspace_id,
            future,
            validate,
            next,
        }
    }
}

#[async_trait]
impl BrokerPhase for ListenBrokerEvents {
    fn name(&self) -> &'static str {
        "listen-broker-events"
    }

    async fn execute(self: Box<Self>) -> Result<Vec<ResolvedPlugin>> {
        let ListenBrokerEvents {
            bus,
            workspace_id,
            future,
            validate,
            next,
        } = *self;

        let mut guard = BrokerStatusListener::spawn(&bus, workspace_id, future, validate);

        let result = next.execute().await;

        guard.unsubscribe();

        result
    }
}
