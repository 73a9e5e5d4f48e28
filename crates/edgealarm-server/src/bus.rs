//! In-process module bus.
//!
//! Every module owns a bounded mailbox keyed by its name. A message carrying
//! a parent id that matches an outstanding synchronous request is handed to
//! the waiting caller instead of a mailbox, which is how `send_sync` RPCs
//! get their answers.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use edgealarm_common::routes::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, RwLock};

/// Mailbox capacity per module.
pub const CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("module {0} is not registered")]
    UnknownModule(String),

    #[error("module {0} is already registered")]
    AlreadyRegistered(String),

    #[error("mailbox of module {0} is closed")]
    Closed(String),

    #[error("sync request {resource} timed out after {timeout_ms}ms")]
    Timeout { resource: String, timeout_ms: u64 },

    #[error("sync request {0} was dropped before an answer arrived")]
    Canceled(String),

    #[error("failed to encode message content: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub id: String,
    pub parent_id: Option<String>,
    pub is_sync: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub source: String,
    pub destination: String,
    pub method: Method,
    pub resource: String,
}

/// Identity of the remote node a message came from, attested by the
/// transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    pub serial: String,
    pub ip: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub header: Header,
    pub route: Route,
    pub peer: Option<Peer>,
    pub content: Vec<u8>,
}

impl Message {
    pub fn new(source: &str, destination: &str, method: Method, resource: &str) -> Self {
        Self {
            header: Header {
                id: edgealarm_common::id::next_id(),
                parent_id: None,
                is_sync: false,
                timestamp: Utc::now(),
            },
            route: Route {
                source: source.to_string(),
                destination: destination.to_string(),
                method,
                resource: resource.to_string(),
            },
            peer: None,
            content: Vec::new(),
        }
    }

    /// Serializes `body` as the JSON content.
    pub fn with_content<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, BusError> {
        self.content = serde_json::to_vec(body)?;
        Ok(self)
    }

    pub fn with_peer(mut self, peer: Peer) -> Self {
        self.peer = Some(peer);
        self
    }

    /// Builds the answer to this message: route reversed, parent id set.
    pub fn new_response(&self) -> Message {
        Message {
            header: Header {
                id: edgealarm_common::id::next_id(),
                parent_id: Some(self.header.id.clone()),
                is_sync: false,
                timestamp: Utc::now(),
            },
            route: Route {
                source: self.route.destination.clone(),
                destination: self.route.source.clone(),
                method: self.route.method,
                resource: self.route.resource.clone(),
            },
            peer: None,
            content: Vec::new(),
        }
    }

    pub fn parse_content<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.content)
    }
}

/// Named mailboxes plus the table of outstanding sync requests.
pub struct ModuleBus {
    modules: RwLock<HashMap<String, mpsc::Sender<Message>>>,
    pending: Mutex<HashMap<String, oneshot::Sender<Message>>>,
}

impl Default for ModuleBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleBus {
    pub fn new() -> Self {
        Self {
            modules: RwLock::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Creates the mailbox of `name` and returns its receiving end.
    pub async fn register(&self, name: &str) -> Result<mpsc::Receiver<Message>, BusError> {
        let mut modules = self.modules.write().await;
        if modules.contains_key(name) {
            return Err(BusError::AlreadyRegistered(name.to_string()));
        }
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        modules.insert(name.to_string(), tx);
        tracing::debug!(module = name, "Module registered on bus");
        Ok(rx)
    }

    pub async fn unregister(&self, name: &str) {
        self.modules.write().await.remove(name);
    }

    pub async fn is_registered(&self, name: &str) -> bool {
        self.modules.read().await.contains_key(name)
    }

    fn take_waiter(&self, id: &str) -> Option<oneshot::Sender<Message>> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(id)
    }

    /// Routes `msg` to the caller waiting on its parent, or else to the
    /// destination mailbox.
    pub async fn send(&self, msg: Message) -> Result<(), BusError> {
        if let Some(parent_id) = &msg.header.parent_id {
            if let Some(waiter) = self.take_waiter(parent_id) {
                // The caller may have given up already; nothing to do then.
                let _ = waiter.send(msg);
                return Ok(());
            }
        }

        let destination = msg.route.destination.clone();
        let tx = self
            .modules
            .read()
            .await
            .get(&destination)
            .cloned()
            .ok_or_else(|| BusError::UnknownModule(destination.clone()))?;
        tx.send(msg).await.map_err(|_| BusError::Closed(destination))
    }

    /// Sends `msg` and waits up to `timeout` for the message answering it.
    pub async fn send_sync(&self, mut msg: Message, timeout: Duration) -> Result<Message, BusError> {
        msg.header.is_sync = true;
        let id = msg.header.id.clone();
        let resource = msg.route.resource.clone();
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id.clone(), tx);

        if let Err(e) = self.send(msg).await {
            self.take_waiter(&id);
            return Err(e);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(resp)) => Ok(resp),
            Ok(Err(_)) => Err(BusError::Canceled(resource)),
            Err(_) => {
                self.take_waiter(&id);
                Err(BusError::Timeout {
                    resource,
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }
    }
}
