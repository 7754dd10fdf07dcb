//! Domain layer: pure story logic with no storage access.

pub mod availability;
pub mod commands;
pub mod graph;
pub mod resolver;
