//! Shared types for the edge-alarm pipeline: wire bodies exchanged over the
//! module bus, the response envelope, route names and pipeline limits.

pub mod id;
pub mod routes;
pub mod status;
pub mod types;
