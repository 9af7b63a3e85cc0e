//! # occupancy-domain
//!
//! Pure domain model for the occupancy simulator.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **light slots** (a controlled device plus delay/duration bounds)
//! - Define **randomizer configuration** and its validation
//! - Define **actions** a randomizer accepts (`turn_on`, `freeze`, …)
//! - Define the **device snapshot** read back from the host
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod action;
pub mod device;
pub mod randomizer;
pub mod slot;
