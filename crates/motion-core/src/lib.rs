//! Core workflow engine for motions.
//!
//! This crate owns the status state machine and the workflow operations that
//! move a motion from submission through permission to a final decision,
//! persisting every change and publishing events about it.

pub mod builder;
pub mod event_bus;
pub mod index;
pub mod service;
pub mod state;

pub use builder::{BuilderError, MotionServiceBuilder};
pub use event_bus::EventBus;
pub use service::{MotionError, MotionService};
pub use state::MotionStateMachine;
