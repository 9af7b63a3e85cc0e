//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the scheduling core and the outside world.
//! They are defined here (in `app`) so that both the engine and the adapter
//! layer can depend on them without creating circular dependencies.

pub mod device_registry;

pub use device_registry::DeviceRegistry;
