use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of the workspace a broker run belongs to.
///
/// Passed through every phase for correlation (naming, tracing, event
/// filtering) and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuntimeIdentity {
    pub workspace_id: Uuid,
    pub env_name: String,
    pub owner_id: String,
}

impl RuntimeIdentity {
    pub fn new(workspace_id: Uuid, env_name: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            workspace_id,
            env_name: env_name.into(),
            owner_id: owner_id.into(),
        }
    }

    /// The `workspace:environment:owner` triplet used on broker command lines.
    pub fn runtime_id(&self) -> String {
        format!("{}:{}:{}", self.workspace_id, self.env_name, self.owner_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_id_triplet() {
        let workspace_id = Uuid::new_v4();
        let identity = RuntimeIdentity::new(workspace_id, "default", "che");
        assert_eq!(
            identity.runtime_id(),
            format!("{workspace_id}:default:che")
        );
    }
}
