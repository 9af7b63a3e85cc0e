//! Virtual device implementations.
//!
//! Only on/off lights are simulated; each keeps the timer tasks of its
//! pending delayed commands so they can be cancelled.

mod light;

pub use light::VirtualLight;
