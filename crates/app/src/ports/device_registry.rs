//! Device registry port: the automation host as seen by the scheduler.
//!
//! The host owns the controlled devices. The scheduler only reads their
//! live state and asks the host to switch them, possibly after a delay and
//! with an automatic revert. Commands are fire-and-forget: implementations
//! return once the command is accepted, not once it has run.

use std::future::Future;

use occupancy_domain::device::DeviceSnapshot;
use occupancy_domain::error::OccupancyError;
use occupancy_domain::id::{DeviceId, RandomizerId};
use occupancy_domain::time::Timestamp;

/// Access to the host's devices and to the randomizers' published state.
pub trait DeviceRegistry: Send + Sync {
    /// Read the current name and on/off state of a device.
    ///
    /// Fails with [`OccupancyError::NotFound`] when the id is unknown or the
    /// device was removed.
    fn get_device(
        &self,
        id: DeviceId,
    ) -> impl Future<Output = Result<DeviceSnapshot, OccupancyError>> + Send;

    /// Switch a device on after `delay_secs`, then back off after a further
    /// `duration_secs`. Zero delay means now; zero duration means no revert.
    fn turn_on(
        &self,
        id: DeviceId,
        delay_secs: u32,
        duration_secs: u32,
    ) -> impl Future<Output = Result<(), OccupancyError>> + Send;

    /// Switch a device off after `delay_secs`.
    fn turn_off(
        &self,
        id: DeviceId,
        delay_secs: u32,
    ) -> impl Future<Output = Result<(), OccupancyError>> + Send;

    /// Drop every pending delayed command for a device. Idempotent.
    fn cancel_pending(&self, id: DeviceId)
    -> impl Future<Output = Result<(), OccupancyError>> + Send;

    /// Publish a randomizer's own on/off state.
    fn set_state(
        &self,
        id: RandomizerId,
        on: bool,
    ) -> impl Future<Output = Result<(), OccupancyError>> + Send;

    /// Publish when a randomizer next needs attention.
    ///
    /// The default implementation discards the value (runtime state is not
    /// required to survive a restart).
    fn set_next_update(
        &self,
        _id: RandomizerId,
        _next_update: Option<Timestamp>,
    ) -> impl Future<Output = Result<(), OccupancyError>> + Send {
        async { Ok(()) }
    }
}
