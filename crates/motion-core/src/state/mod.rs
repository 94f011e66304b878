//! Status state machine for motions.
//!
//! This module decides which actions a user may take on a motion and whether
//! a status change is permitted. It holds no storage; the workflow service
//! applies its decisions.

pub mod motion;

pub use motion::{MotionStateMachine, StateError};
