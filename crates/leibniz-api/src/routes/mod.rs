//! Route modules.

pub mod health;
pub mod progress;
pub mod story;
