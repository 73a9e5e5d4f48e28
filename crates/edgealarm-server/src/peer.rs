//! Bridge between the edge transport and the alarm-manager router.
//!
//! A single receive loop reads the `AlarmManager` mailbox and the transport
//! inbox. Report and node-clear messages go to one of a fixed set of
//! sequential lanes picked by the serial they concern, which keeps each
//! node's writes in arrival order. Queries run on their own tasks.

use std::collections::hash_map::DefaultHasher;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use edgealarm_common::routes::{module, Method, CLEAR_NODE_ALARM, REPORT_ALARM};
use edgealarm_common::types::{AlarmsReq, ClearNodeReq};
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};

use crate::bus::{BusError, Message, Peer};
use crate::router::Router;
use crate::state::AppState;

/// Something the transport hands to the adapter.
#[derive(Debug)]
pub enum TransportEvent {
    /// An inbound message, already tagged with the attested peer.
    Deliver(Message),
    /// The peer's session is gone.
    Disconnect(Peer),
}

/// Sending side held by the transport.
#[derive(Clone)]
pub struct TransportHandle {
    tx: mpsc::UnboundedSender<TransportEvent>,
}

impl TransportHandle {
    pub fn deliver(&self, msg: Message) -> bool {
        self.tx.send(TransportEvent::Deliver(msg)).is_ok()
    }

    pub fn disconnect(&self, peer: Peer) -> bool {
        self.tx.send(TransportEvent::Disconnect(peer)).is_ok()
    }
}

pub struct TransportInbox {
    rx: mpsc::UnboundedReceiver<TransportEvent>,
}

pub fn transport_channel() -> (TransportHandle, TransportInbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (TransportHandle { tx }, TransportInbox { rx })
}

/// Report and node-clear are the write path and go through lanes.
pub fn is_ingest_route(msg: &Message) -> bool {
    matches!(
        (msg.route.method, msg.route.resource.as_str()),
        (Method::Post, REPORT_ALARM) | (Method::Delete, CLEAR_NODE_ALARM)
    )
}

/// Serial whose lane must carry `msg`. The attested peer wins over the body.
pub fn lane_key(msg: &Message) -> String {
    if let Some(peer) = &msg.peer {
        return peer.serial.clone();
    }
    match msg.route.resource.as_str() {
        REPORT_ALARM => msg
            .parse_content::<AlarmsReq>()
            .map(|req| req.sn)
            .unwrap_or_default(),
        CLEAR_NODE_ALARM => msg
            .parse_content::<ClearNodeReq>()
            .map(|req| req.sn)
            .unwrap_or_default(),
        _ => String::new(),
    }
}

pub fn lane_index(serial: &str, lanes: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    serial.hash(&mut hasher);
    (hasher.finish() % lanes.max(1) as u64) as usize
}

/// Rewrites the body identity of ingest messages from the attested peer.
/// A node-clear may only target the sending node. A report gets the peer's
/// serial and ip; a peer without an ip is resolved through node manager.
/// `None` drops the message.
async fn attest(state: &AppState, mut msg: Message) -> Option<Message> {
    let Some(peer) = msg.peer.clone() else {
        return Some(msg);
    };
    let content = match msg.route.resource.as_str() {
        REPORT_ALARM => {
            // Undecodable bodies pass through so the handler reports them.
            let Ok(mut req) = msg.parse_content::<AlarmsReq>() else {
                return Some(msg);
            };
            req.ip = if peer.ip.is_empty() {
                match state.nodes.ip_by_sn(&peer.serial).await {
                    Ok(ip) => ip,
                    Err(e) => {
                        tracing::error!(serial = %peer.serial, error = %e, "Failed to resolve node ip, dropping report");
                        return None;
                    }
                }
            } else {
                peer.ip
            };
            req.sn = peer.serial;
            serde_json::to_vec(&req)
        }
        CLEAR_NODE_ALARM => {
            let Ok(mut req) = msg.parse_content::<ClearNodeReq>() else {
                return Some(msg);
            };
            if req.sn != peer.serial {
                tracing::warn!(
                    serial = %peer.serial,
                    requested = %req.sn,
                    "Node-clear names another node, clearing the sender only"
                );
            }
            req.sn = peer.serial;
            serde_json::to_vec(&req)
        }
        _ => return Some(msg),
    };

    match content {
        Ok(content) => {
            msg.content = content;
            Some(msg)
        }
        Err(e) => {
            tracing::error!(resource = %msg.route.resource, error = %e, "Failed to re-encode attested message");
            None
        }
    }
}

/// Feeds one lane's messages to `process` in order until shutdown. Messages
/// still queued at shutdown are dropped; the count is returned.
async fn run_lane<F, Fut>(
    lane: usize,
    mut rx: mpsc::UnboundedReceiver<Message>,
    mut shutdown: watch::Receiver<bool>,
    mut process: F,
) -> usize
where
    F: FnMut(Message) -> Fut,
    Fut: Future<Output = ()>,
{
    loop {
        if *shutdown.borrow_and_update() {
            break;
        }
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            msg = rx.recv() => match msg {
                Some(msg) => process(msg).await,
                None => {
                    tracing::debug!(lane, "Ingestion lane stopped");
                    return 0;
                }
            },
        }
    }

    rx.close();
    let mut dropped = 0;
    while rx.try_recv().is_ok() {
        dropped += 1;
    }
    if dropped > 0 {
        tracing::warn!(lane, dropped, "Dropped queued ingestion messages on shutdown");
    }
    tracing::debug!(lane, "Ingestion lane stopped");
    dropped
}

/// Node-clear synthesized for a disconnected peer. Nobody waits on it.
fn node_clear_for(peer: Peer) -> Result<Message, BusError> {
    let body = ClearNodeReq {
        sn: peer.serial.clone(),
    };
    Ok(Message::new(
        module::PEER_ADAPTER,
        module::ALARM_MANAGER,
        Method::Delete,
        CLEAR_NODE_ALARM,
    )
    .with_content(&body)?
    .with_peer(peer))
}

pub struct PeerAdapter {
    state: AppState,
    router: Arc<Router>,
    mailbox: mpsc::Receiver<Message>,
    inbox: TransportInbox,
    lanes: Vec<mpsc::UnboundedSender<Message>>,
    lane_workers: Vec<JoinHandle<usize>>,
    tasks: JoinSet<()>,
}

impl PeerAdapter {
    /// Registers the `AlarmManager` mailbox. Lane workers start with `run`.
    pub async fn new(
        state: AppState,
        router: Arc<Router>,
        inbox: TransportInbox,
    ) -> Result<Self, BusError> {
        let mailbox = state.bus.register(module::ALARM_MANAGER).await?;
        Ok(Self {
            state,
            router,
            mailbox,
            inbox,
            lanes: Vec::new(),
            lane_workers: Vec::new(),
            tasks: JoinSet::new(),
        })
    }

    fn start_lanes(&mut self, shutdown: &watch::Receiver<bool>) {
        let lane_count = self.state.config.lane_count();
        for lane in 0..lane_count {
            let (tx, rx) = mpsc::unbounded_channel::<Message>();
            let state = self.state.clone();
            let router = self.router.clone();
            let process = move |msg: Message| {
                let state = state.clone();
                let router = router.clone();
                async move {
                    if let Some(msg) = attest(&state, msg).await {
                        router.handle(&state, &msg).await;
                    }
                }
            };
            self.lane_workers
                .push(tokio::spawn(run_lane(lane, rx, shutdown.clone(), process)));
            self.lanes.push(tx);
        }
    }

    fn dispatch(&mut self, msg: Message) {
        if msg.header.parent_id.is_some() {
            tracing::debug!(resource = %msg.route.resource, "Dropping late response");
            return;
        }

        if is_ingest_route(&msg) {
            let idx = lane_index(&lane_key(&msg), self.lanes.len());
            if self.lanes[idx].send(msg).is_err() {
                tracing::error!(lane = idx, "Ingestion lane is closed");
            }
            return;
        }

        let state = self.state.clone();
        let router = self.router.clone();
        self.tasks.spawn(async move {
            router.handle(&state, &msg).await;
        });
    }

    fn on_disconnect(&mut self, peer: Peer) {
        if peer.serial.is_empty() {
            return;
        }
        tracing::info!(serial = %peer.serial, ip = %peer.ip, "Peer disconnected, clearing its alarms");
        match node_clear_for(peer) {
            Ok(msg) => self.dispatch(msg),
            Err(e) => tracing::error!(error = %e, "Failed to build node-clear message"),
        }
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        self.start_lanes(&shutdown);
        tracing::info!(lanes = self.lanes.len(), "Peer adapter started");

        if !*shutdown.borrow() {
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    Some(msg) = self.mailbox.recv() => self.dispatch(msg),
                    Some(event) = self.inbox.rx.recv() => match event {
                        TransportEvent::Deliver(msg) => self.dispatch(msg),
                        TransportEvent::Disconnect(peer) => self.on_disconnect(peer),
                    },
                    Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                        if let Err(e) = joined {
                            tracing::error!(error = %e, "Query task failed");
                        }
                    }
                    else => break,
                }
            }
        }

        self.state.bus.unregister(module::ALARM_MANAGER).await;
        self.lanes.clear();
        let mut dropped = 0;
        for worker in self.lane_workers.drain(..) {
            match worker.await {
                Ok(n) => dropped += n,
                Err(e) => tracing::error!(error = %e, "Ingestion lane failed"),
            }
        }
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Query task failed");
            }
        }
        tracing::info!(dropped, "Peer adapter stopped");
    }
}
