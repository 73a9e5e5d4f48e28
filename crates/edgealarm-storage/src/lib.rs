//! Relational store for alarm and event records.
//!
//! [`AlarmStore`] owns a single SeaORM connection (SQLite in every shipped
//! configuration) and exposes the primitive operations the ingestion and
//! query engines are built from: insert, open-alarm lookup, the count forms,
//! paged listing, oldest-first eviction candidates and the bulk deletes.
//! The same database also holds the small key/value table monitors read
//! their runtime settings from.

pub mod entities;
pub mod error;
pub mod store;


pub use error::{Result, StorageError};
pub use store::{AlarmConfigRow, AlarmFilter, AlarmRecord, AlarmStore, NewAlarm, SerialScope};
