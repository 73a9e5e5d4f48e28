//! `(method, resource)` dispatch for messages addressed to the alarm manager.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use edgealarm_common::routes::{
    Method, ALARM_DETAIL, CLEAR_NODE_ALARM, EVENT_DETAIL, LIST_ALARMS, LIST_EVENTS, REPORT_ALARM,
};
use edgealarm_common::status::RespMsg;
use edgealarm_common::types::AlarmKind;

use crate::bus::Message;
use crate::handlers::{ClearNodeHandler, DetailHandler, ListHandler, ReportHandler};
use crate::state::AppState;

/// What a handler wants sent back.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Respond(RespMsg),
    NoReply,
}

#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, state: &AppState, msg: &Message) -> Reply;
}

/// Handler table, built once at start and read-only afterwards.
#[derive(Default)]
pub struct Router {
    routes: HashMap<(Method, String), Arc<dyn MessageHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, method: Method, resource: &str, handler: Arc<dyn MessageHandler>) -> Self {
        self.routes.insert((method, resource.to_string()), handler);
        self
    }

    /// The six routes served by the alarm manager.
    pub fn alarm_manager() -> Self {
        Self::new()
            .register(Method::Get, LIST_ALARMS, Arc::new(ListHandler { kind: AlarmKind::Alarm }))
            .register(Method::Get, LIST_EVENTS, Arc::new(ListHandler { kind: AlarmKind::Event }))
            .register(Method::Get, ALARM_DETAIL, Arc::new(DetailHandler { kind: AlarmKind::Alarm }))
            .register(Method::Get, EVENT_DETAIL, Arc::new(DetailHandler { kind: AlarmKind::Event }))
            .register(Method::Post, REPORT_ALARM, Arc::new(ReportHandler))
            .register(Method::Delete, CLEAR_NODE_ALARM, Arc::new(ClearNodeHandler))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Runs the matching handler and builds its response, if any.
    pub async fn dispatch(&self, state: &AppState, msg: &Message) -> Option<Message> {
        let key = (msg.route.method, msg.route.resource.clone());
        let Some(handler) = self.routes.get(&key) else {
            tracing::error!(
                method = %msg.route.method,
                resource = %msg.route.resource,
                source = %msg.route.source,
                "No handler registered for route"
            );
            return None;
        };

        match handler.handle(state, msg).await {
            Reply::NoReply => None,
            Reply::Respond(body) => match msg.new_response().with_content(&body) {
                Ok(resp) => Some(resp),
                Err(e) => {
                    tracing::error!(resource = %msg.route.resource, error = %e, "Failed to encode response");
                    None
                }
            },
        }
    }

    /// Dispatches `msg` and sends the response back over the bus.
    pub async fn handle(&self, state: &AppState, msg: &Message) {
        if let Some(resp) = self.dispatch(state, msg).await {
            if let Err(e) = state.bus.send(resp).await {
                tracing::error!(
                    resource = %msg.route.resource,
                    destination = %msg.route.source,
                    error = %e,
                    "Failed to send response"
                );
            }
        }
    }
}
