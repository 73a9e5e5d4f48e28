use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use edgealarm_engine::{IngestEngine, NodeDirectory, QueryEngine};
use edgealarm_storage::AlarmStore;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::bus::ModuleBus;
use crate::config::ServerConfig;
use crate::janitor::Janitor;
use crate::monitor::cert_overdue::CertOverdueMonitor;
use crate::monitor::MonitorScheduler;
use crate::node_client::BusNodeDirectory;
use crate::peer::{transport_channel, PeerAdapter, TransportHandle};
use crate::router::Router;
use crate::runtime_seed;
use crate::state::AppState;

/// Connects the store, resets the alarm table and assembles the handle
/// shared by every task.
pub async fn build_state(config: ServerConfig) -> Result<AppState> {
    if config.database.url.is_none() {
        std::fs::create_dir_all(&config.database.data_dir)?;
    }
    let store = Arc::new(AlarmStore::new(&config.database.connection_url()).await?);

    // Alarms only describe live sessions; nothing survives a restart.
    let dropped = store.truncate_all().await?;
    if dropped > 0 {
        tracing::info!(dropped, "Dropped alarm records left from the previous run");
    }

    if let Err(e) = runtime_seed::init_default_runtime_settings(&store, &config.cert_monitor).await {
        tracing::error!(error = %e, "Failed to initialize default runtime settings");
    }

    let bus = Arc::new(ModuleBus::new());
    let nodes: Arc<dyn NodeDirectory> = Arc::new(BusNodeDirectory::new(bus.clone(), &config.rpc));

    Ok(AppState {
        ingest: Arc::new(IngestEngine::new(store.clone())),
        query: Arc::new(QueryEngine::new(store.clone(), nodes.clone())),
        store,
        nodes,
        bus,
        reload_lock: Arc::new(tokio::sync::Mutex::new(())),
        config: Arc::new(config),
    })
}

/// Running background tasks plus the transport entry point.
pub struct App {
    pub state: AppState,
    pub transport: TransportHandle,
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl App {
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Stops accepting messages and waits for in-flight work.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Background task failed during shutdown");
            }
        }
        tracing::info!("edgealarm-server stopped");
    }
}

/// Spawns the peer adapter, the janitor and the monitor scheduler.
pub async fn start(state: AppState) -> Result<App> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (transport, inbox) = transport_channel();
    let mut handles = Vec::new();

    let router = Arc::new(Router::alarm_manager());
    let adapter = PeerAdapter::new(state.clone(), router, inbox).await?;
    let adapter_shutdown = shutdown_rx.clone();
    handles.push(tokio::spawn(async move { adapter.run(adapter_shutdown).await }));

    let janitor_cfg = &state.config.janitor;
    if janitor_cfg.enabled {
        let janitor = Janitor::new(
            state.store.clone(),
            Duration::from_secs(janitor_cfg.interval_secs.max(1)),
            janitor_cfg.threshold,
        );
        let janitor_shutdown = shutdown_rx.clone();
        handles.push(tokio::spawn(async move { janitor.run(janitor_shutdown).await }));
    } else {
        tracing::info!("Alarm janitor disabled");
    }

    let cert_cfg = &state.config.cert_monitor;
    if cert_cfg.enabled {
        let mut scheduler = MonitorScheduler::new(
            state.bus.clone(),
            state.config.host_ip.clone(),
            cert_cfg.register_retries,
            Duration::from_secs(cert_cfg.retry_backoff_secs),
        );
        let monitor = Arc::new(CertOverdueMonitor::new(
            state.store.clone(),
            state.reload_lock.clone(),
            cert_cfg,
        ));
        let mut monitor_shutdown = shutdown_rx.clone();
        handles.push(tokio::spawn(async move {
            // Registration may back off for a while; do not hold up shutdown.
            tokio::select! {
                _ = scheduler.register(monitor) => {}
                _ = monitor_shutdown.changed() => return,
            }
            scheduler.run(monitor_shutdown).await;
        }));
    } else {
        tracing::info!("Cert-overdue monitor disabled");
    }

    Ok(App {
        state,
        transport,
        shutdown_tx,
        handles,
    })
}
