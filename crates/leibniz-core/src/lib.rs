//! Leibniz Core — shared domain model and abstractions.
//!
//! This crate defines the story and progress records, the storage boundary,
//! and the clock and error types that every other crate depends on. It
//! contains no infrastructure code.

pub mod clock;
pub mod command;
pub mod error;
pub mod model;
pub mod storage;
