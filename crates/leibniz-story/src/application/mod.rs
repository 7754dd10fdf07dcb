//! Application layer: handlers that combine domain logic with storage.

pub mod command_handlers;
pub mod locks;
pub mod query_handlers;
