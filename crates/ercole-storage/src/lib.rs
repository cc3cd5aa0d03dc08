//! SQLite persistence for hostdata snapshots.
//!
//! [`HostDataStore`] implements the engine's [`HostStore`](ercole_engine::ports::HostStore)
//! port on top of SeaORM. Each snapshot is one row: the columns the queries
//! filter on (`hostname`, `archived`, `is_dr`, `created_at`, `dismissed_at`)
//! plus the full document as JSON in `payload`.

pub mod entities;
pub mod error;
pub mod store;


pub use store::HostDataStore;
