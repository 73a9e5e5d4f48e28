use async_trait::async_trait;
use edgealarm_common::status::Status;

/// Answer of a group membership lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupMembers {
    Found(Vec<String>),
    /// Node manager does not know the group.
    NotFound,
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("{method} timed out after {timeout_ms}ms")]
    Timeout {
        method: &'static str,
        timeout_ms: u64,
    },

    #[error("{method} answered {status}: {msg}")]
    Status {
        method: &'static str,
        status: Status,
        msg: String,
    },

    #[error("failed to decode {method} response: {reason}")]
    Decode {
        method: &'static str,
        reason: String,
    },

    #[error("bus error: {0}")]
    Bus(String),
}

/// Node-manager lookups the alarm manager depends on.
///
/// The server implements this over synchronous bus RPCs; tests substitute
/// an in-memory table.
#[async_trait]
pub trait NodeDirectory: Send + Sync {
    /// Serials belonging to a node group.
    async fn sns_by_group(&self, group_id: u32) -> Result<GroupMembers, DirectoryError>;

    /// Current IPv4 address of a node.
    async fn ip_by_sn(&self, serial: &str) -> Result<String, DirectoryError>;
}
