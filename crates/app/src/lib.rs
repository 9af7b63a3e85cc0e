//! # occupancy-app
//!
//! Application layer: the scheduling engine and its **port definitions**.
//!
//! ## Responsibilities
//! - Define the `DeviceRegistry` port that host adapters implement
//! - `ControlledLight`: randomized on/off decisions for one device
//! - `Randomizer`: a switchable group of lights with an aggregated next update
//! - `SchedulerService`: owns the active randomizers, dispatches actions and
//!   runs the cancellable periodic sweep
//!
//! ## Dependency rule
//! Depends on `occupancy-domain` only (plus `tokio` for the loop and `rand`).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod controlled_light;
pub mod ports;
pub mod randomizer;
pub mod scheduler;

#[cfg(test)]
mod testing;
