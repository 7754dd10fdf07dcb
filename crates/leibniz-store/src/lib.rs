//! Storage backends for the Leibniz story engine.
//!
//! `MemStorage` keeps everything in process memory and is the default.
//! `PgStorage` persists to PostgreSQL.

mod memory;
pub mod pg_storage;

pub use memory::MemStorage;
pub use pg_storage::{PgStorage, run_migrations};
