//! Background Tasks Module
//!
//! Maintenance work that runs alongside normal cache traffic.

mod sweeper;

pub use sweeper::{spawn_sweeper, SweeperHandle};
