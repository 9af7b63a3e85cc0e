//! Controlled light: randomized on/off scheduling for a single device.
//!
//! Each light decides on its own when to flip its device and for how long.
//! It only acts once its previous decision has expired, so repeated calls
//! never stack overlapping commands on the device.

use std::sync::Arc;

use rand::Rng;

use occupancy_domain::error::OccupancyError;
use occupancy_domain::id::DeviceId;
use occupancy_domain::slot::LightSlotConfig;
use occupancy_domain::time::{NEVER, Timestamp, after_secs, format_hms};

use crate::ports::DeviceRegistry;

/// The command issued by a due [`ControlledLight::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The device was on: it goes off after `duration_secs`.
    KeepOn { duration_secs: u32 },
    /// The device was off: it goes on after `delay_secs` for `duration_secs`.
    TurnOn { delay_secs: u32, duration_secs: u32 },
}

/// One controlled device and its randomization state.
pub struct ControlledLight<D> {
    registry: Arc<D>,
    config: LightSlotConfig,
    expire: Timestamp,
    on_state: bool,
}

impl<D: DeviceRegistry> ControlledLight<D> {
    /// Create a light that is immediately due.
    pub fn new(config: LightSlotConfig, registry: Arc<D>) -> Self {
        Self {
            registry,
            config,
            expire: NEVER,
            on_state: false,
        }
    }

    #[must_use]
    pub fn device_id(&self) -> DeviceId {
        self.config.device_id
    }

    #[must_use]
    pub fn config(&self) -> &LightSlotConfig {
        &self.config
    }

    /// When the current decision goes stale.
    #[must_use]
    pub fn expire(&self) -> Timestamp {
        self.expire
    }

    /// Last on/off state read from the host.
    #[must_use]
    pub fn on_state(&self) -> bool {
        self.on_state
    }

    /// Whether the light should be re-randomized at `now`.
    #[must_use]
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.expire < now
    }

    /// Draw and issue a new random command if the light is due.
    ///
    /// Returns `Ok(None)` without touching the device when not due. The
    /// expiry only moves forward once the host has accepted the command, so a
    /// rejected command leaves the light due for the next pass.
    ///
    /// # Errors
    ///
    /// Returns [`OccupancyError::NotFound`] when the device is gone and
    /// [`OccupancyError::Command`] when the host rejects the command.
    pub async fn update<R>(
        &mut self,
        rng: &mut R,
        now: Timestamp,
    ) -> Result<Option<Decision>, OccupancyError>
    where
        R: Rng + Send,
    {
        if !self.is_due(now) {
            return Ok(None);
        }

        let device = self.registry.get_device(self.config.device_id).await?;
        self.on_state = device.on;

        let (min, max) = self.config.duration_secs();
        let duration_secs = draw_secs(rng, min, max);

        let decision = if self.on_state {
            self.registry
                .turn_off(self.config.device_id, duration_secs)
                .await?;
            tracing::info!(
                device = %device.name,
                duration_secs,
                "\"{}\" random (already on, duration {})",
                device.name,
                format_hms(duration_secs)
            );
            self.expire = after_secs(now, duration_secs);
            Decision::KeepOn { duration_secs }
        } else {
            let (min, max) = self.config.delay_secs();
            let delay_secs = draw_secs(rng, min, max);
            self.registry
                .turn_on(self.config.device_id, delay_secs, duration_secs)
                .await?;
            tracing::info!(
                device = %device.name,
                delay_secs,
                duration_secs,
                "\"{}\" random (delay {}, duration {})",
                device.name,
                format_hms(delay_secs),
                format_hms(duration_secs)
            );
            self.expire = after_secs(now, delay_secs + duration_secs);
            Decision::TurnOn {
                delay_secs,
                duration_secs,
            }
        };

        Ok(Some(decision))
    }

    /// Drop pending commands and make the light due again.
    ///
    /// The light is due again even when the host fails. With `turn_off`, a
    /// device that is currently on is switched off now.
    ///
    /// # Errors
    ///
    /// Returns [`OccupancyError::NotFound`] when the device is gone and
    /// [`OccupancyError::Command`] when the host rejects the cancellation or
    /// the turn-off.
    pub async fn cancel(&mut self, turn_off: bool) -> Result<(), OccupancyError> {
        let id = self.config.device_id;
        let cancelled = self.registry.cancel_pending(id).await;
        self.expire = NEVER;

        let device = self.registry.get_device(id).await?;
        self.on_state = device.on;

        if turn_off && self.on_state {
            self.registry.turn_off(id, 0).await?;
            self.on_state = false;
            tracing::info!(device = %device.name, "\"{}\" forced off", device.name);
        }
        cancelled
    }
}

/// Uniform draw from `[min, max)` seconds.
///
/// A degenerate interval (`min >= max`, i.e. equal bounds) yields `min`.
fn draw_secs<R: Rng + ?Sized>(rng: &mut R, min: u32, max: u32) -> u32 {
    if min >= max {
        min
    } else {
        rng.gen_range(min..max)
    }
}
