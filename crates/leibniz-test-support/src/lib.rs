//! Shared test fakes and fixtures for the Leibniz story engine.

mod clock;
mod fixtures;
mod storage;

pub use clock::{FixedClock, fixed_now};
pub use fixtures::{choice, flavor_choice, story_node};
pub use storage::{FailingStorage, YieldingStorage};
