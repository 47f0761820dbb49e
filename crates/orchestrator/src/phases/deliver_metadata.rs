//! Second phase: put the serialized plugin metadata where the broker can
//! read it, and remove it again afterwards.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use broker_core::{ConfigObject, ResolvedPlugin};

use crate::error::{BrokerError, Result};
use crate::phases::BrokerPhase;
use crate::platform::PlatformClient;

/// Creates the metadata config object, delegates, then deletes the object
/// unconditionally. A deletion failure is logged, never raised: it must not
/// mask whatever the rest of the chain decided.
pub struct DeliverMetadata {
    platform: Arc<dyn PlatformClient>,
    metadata: ConfigObject,
    next: Box<dyn BrokerPhase>,
}

impl DeliverMetadata {
    pub fn new(
        platform: Arc<dyn PlatformClient>,
        metadata: ConfigObject,
        next: Box<dyn BrokerPhase>,
    ) -> Self {
        Self {
            platform,
            metadata,
            next,
        }
    }
}

#[async_trait]
impl BrokerPhase for DeliverMetadata {
    fn name(&self) -> &'static str {
        "deliver-metadata"
    }

    async fn execute(self: Box<Self>) -> Result<Vec<ResolvedPlugin>> {
        let DeliverMetadata {
            platform,
            metadata,
            next,
        } = *self;

        platform
            .create_config_object(&metadata)
            .await
            .map_err(|e| BrokerError::platform("config object creation", e))?;
        debug!(object = %metadata.name, "Plugin metadata delivered");

        let result = next.execute().await;

        if let Err(error) = platform.delete_config_object(&metadata.name).await {
            warn!(
                object = %metadata.name,
                error = %error,
                "Failed to delete metadata config object"
            );
        }

        result
    }
}
