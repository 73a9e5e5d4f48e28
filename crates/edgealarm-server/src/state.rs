use crate::bus::ModuleBus;
use crate::config::ServerConfig;
use edgealarm_engine::{IngestEngine, NodeDirectory, QueryEngine};
use edgealarm_storage::AlarmStore;
use std::sync::Arc;

/// Handle passed to every handler and background task.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<AlarmStore>,
    pub ingest: Arc<IngestEngine>,
    pub query: Arc<QueryEngine>,
    pub nodes: Arc<dyn NodeDirectory>,
    pub bus: Arc<ModuleBus>,
    /// Guards re-reading the certificate bundle.
    pub reload_lock: Arc<tokio::sync::Mutex<()>>,
    pub config: Arc<ServerConfig>,
}
