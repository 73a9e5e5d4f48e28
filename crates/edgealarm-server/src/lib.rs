//! Alarm manager service: module bus, message routing, the peer adapter
//! that feeds the ingestion pipeline, and the center's background tasks.

pub mod app;
pub mod bus;
pub mod config;
pub mod handlers;
pub mod janitor;
pub mod monitor;
pub mod node_client;
pub mod peer;
pub mod router;
pub mod runtime_seed;
pub mod state;
