//! Leibniz Story — the narrative state machine.
//!
//! Owns the story graph, node availability, choice resolution, and the
//! progress operations built on them.

pub mod application;
pub mod content;
pub mod domain;
