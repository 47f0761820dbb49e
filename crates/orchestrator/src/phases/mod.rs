//! Ordered provisioning pipeline with matched teardown.
//!
//! Each phase owns setup and guaranteed teardown of one resource category
//! and holds the next phase of the chain. Execution order is construction
//! order (prepare storage, deliver metadata, listen for events, deploy the
//! broker, wait for its result); cleanup is strictly the reverse, each phase
//! undoing only what it created, after its delegate returned or failed.

mod deliver_metadata;
mod deploy_broker;
mod listen_events;
mod prepare_storage;
mod wait_result;

pub use deliver_metadata::DeliverMetadata;
pub use deploy_broker::{DeployBroker, DeployOptions};
pub use listen_events::ListenBrokerEvents;
pub use prepare_storage::PrepareStorage;
pub use wait_result::WaitBrokerResult;

use async_trait::async_trait;

use broker_core::ResolvedPlugin;

use crate::error::Result;

/// One step of the broker provisioning chain.
///
/// A chain is built bottom-up once per invocation and consumed by
/// execution; the terminal phase has no successor and produces the result.
#[async_trait]
pub trait BrokerPhase: Send {
    fn name(&self) -> &'static str;

    async fn execute(self: Box<Self>) -> Result<Vec<ResolvedPlugin>>;
}
