//! Alarm-manager core: validation, per-node ingestion and scoped queries.
//!
//! [`ingest::IngestEngine`] applies the clear / add-alarm / event protocols
//! with per-node quotas, and [`query::QueryEngine`] answers the five list
//! scopes plus detail lookups. Group membership and node addresses come from
//! node manager through the [`directory::NodeDirectory`] seam.

pub mod directory;
pub mod error;
pub mod ingest;
pub mod query;
pub mod validate;


pub use directory::{DirectoryError, GroupMembers, NodeDirectory};
pub use error::AlarmError;
pub use ingest::{IngestEngine, IngestSummary};
pub use query::QueryEngine;
