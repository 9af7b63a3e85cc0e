//! # occupancy-adapter-virtual
//!
//! Virtual device host that simulates on/off lights for testing and
//! demonstration purposes.
//!
//! Delayed and auto-revert commands run as real tokio timer tasks, so the
//! scheduler sees devices change state exactly as it would on a real host.
//! Manual switching ([`VirtualDeviceRegistry::switch`]) and unavailable
//! devices ([`VirtualDeviceRegistry::set_available`]) can be simulated too.
//!
//! ## Dependency rule
//!
//! Depends on `occupancy-app` (port traits) and `occupancy-domain` only.

mod devices;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use occupancy_app::ports::DeviceRegistry;
use occupancy_domain::device::DeviceSnapshot;
use occupancy_domain::error::{CommandIssueError, CommandKind, NotFoundError, OccupancyError};
use occupancy_domain::id::{DeviceId, RandomizerId};
use occupancy_domain::time::Timestamp;

use devices::VirtualLight;

/// State published by a randomizer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RandomizerState {
    pub on: bool,
    pub next_update: Option<Timestamp>,
}

#[derive(Default)]
struct Inner {
    devices: HashMap<DeviceId, VirtualLight>,
    randomizers: HashMap<RandomizerId, RandomizerState>,
}

/// In-memory device host. Cloning shares the same devices.
#[derive(Clone, Default)]
pub struct VirtualDeviceRegistry {
    inner: Arc<Mutex<Inner>>,
}

impl VirtualDeviceRegistry {
    /// Add (or replace) a device.
    pub fn add_device(&self, id: DeviceId, name: impl Into<String>, on: bool) {
        self.lock()
            .devices
            .insert(id, VirtualLight::new(id, name, on));
    }

    /// Remove a device, dropping its pending commands.
    pub fn remove_device(&self, id: DeviceId) -> bool {
        self.lock().devices.remove(&id).is_some()
    }

    /// Flip a device by hand, bypassing any pending command.
    pub fn switch(&self, id: DeviceId, on: bool) -> bool {
        self.with_device(id, |light| light.set_on(on)).is_ok()
    }

    /// Make a device accept or reject commands.
    pub fn set_available(&self, id: DeviceId, available: bool) -> bool {
        self.with_device(id, |light| light.set_available(available))
            .is_ok()
    }

    /// Current on/off state, `None` when the device is unknown.
    #[must_use]
    pub fn is_on(&self, id: DeviceId) -> Option<bool> {
        self.lock().devices.get(&id).map(VirtualLight::is_on)
    }

    /// Number of delayed commands still waiting for a device.
    #[must_use]
    pub fn pending_commands(&self, id: DeviceId) -> usize {
        self.lock()
            .devices
            .get(&id)
            .map_or(0, VirtualLight::pending_count)
    }

    /// Last state a randomizer published.
    #[must_use]
    pub fn randomizer_state(&self, id: RandomizerId) -> Option<RandomizerState> {
        self.lock().randomizers.get(&id).copied()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_device<T>(
        &self,
        id: DeviceId,
        f: impl FnOnce(&mut VirtualLight) -> T,
    ) -> Result<T, OccupancyError> {
        let mut inner = self.lock();
        let light = inner
            .devices
            .get_mut(&id)
            .ok_or_else(|| NotFoundError::device(id))?;
        Ok(f(light))
    }

    /// Apply `now` immediately (if any), then each `(wait, on)` step in
    /// order on a timer task owned by the device.
    fn command(
        &self,
        id: DeviceId,
        kind: CommandKind,
        now: Option<bool>,
        steps: Vec<(u32, bool)>,
    ) -> Result<(), OccupancyError> {
        let shared = Arc::clone(&self.inner);
        self.with_device(id, |light| -> Result<(), OccupancyError> {
            if !light.is_available() {
                return Err(CommandIssueError {
                    command: kind,
                    target: id.to_string(),
                    reason: "device unavailable".to_string(),
                }
                .into());
            }
            if let Some(on) = now {
                light.set_on(on);
            }
            if !steps.is_empty() {
                light.track(tokio::spawn(run_steps(shared, id, steps)));
            }
            Ok(())
        })?
    }
}

async fn run_steps(inner: Arc<Mutex<Inner>>, id: DeviceId, steps: Vec<(u32, bool)>) {
    for (wait, on) in steps {
        tokio::time::sleep(Duration::from_secs(u64::from(wait))).await;
        let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
        match inner.devices.get_mut(&id) {
            Some(light) => {
                light.set_on(on);
                tracing::debug!(device_id = %id, on, "virtual device switched");
            }
            None => return,
        }
    }
}

impl DeviceRegistry for VirtualDeviceRegistry {
    async fn get_device(&self, id: DeviceId) -> Result<DeviceSnapshot, OccupancyError> {
        self.with_device(id, |light| light.snapshot())
    }

    async fn turn_on(
        &self,
        id: DeviceId,
        delay_secs: u32,
        duration_secs: u32,
    ) -> Result<(), OccupancyError> {
        let (now, mut steps) = if delay_secs == 0 {
            (Some(true), Vec::new())
        } else {
            (None, vec![(delay_secs, true)])
        };
        if duration_secs > 0 {
            steps.push((duration_secs, false));
        }
        self.command(id, CommandKind::TurnOn, now, steps)
    }

    async fn turn_off(&self, id: DeviceId, delay_secs: u32) -> Result<(), OccupancyError> {
        if delay_secs == 0 {
            self.command(id, CommandKind::TurnOff, Some(false), Vec::new())
        } else {
            self.command(id, CommandKind::TurnOff, None, vec![(delay_secs, false)])
        }
    }

    async fn cancel_pending(&self, id: DeviceId) -> Result<(), OccupancyError> {
        let cancelled = self.with_device(id, VirtualLight::cancel_pending)?;
        if cancelled > 0 {
            tracing::debug!(device_id = %id, cancelled, "pending commands cancelled");
        }
        Ok(())
    }

    async fn set_state(&self, id: RandomizerId, on: bool) -> Result<(), OccupancyError> {
        self.lock().randomizers.entry(id).or_default().on = on;
        Ok(())
    }

    async fn set_next_update(
        &self,
        id: RandomizerId,
        next_update: Option<Timestamp>,
    ) -> Result<(), OccupancyError> {
        self.lock().randomizers.entry(id).or_default().next_update = next_update;
        Ok(())
    }
}
