//! In-memory [`DeviceRegistry`] double shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Mutex;

use occupancy_domain::device::DeviceSnapshot;
use occupancy_domain::error::{CommandIssueError, CommandKind, NotFoundError, OccupancyError};
use occupancy_domain::id::{DeviceId, RandomizerId};
use occupancy_domain::time::Timestamp;

use crate::ports::DeviceRegistry;

/// A command the registry received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    TurnOn {
        device: DeviceId,
        delay_secs: u32,
        duration_secs: u32,
    },
    TurnOff {
        device: DeviceId,
        delay_secs: u32,
    },
    CancelPending(DeviceId),
    SetState(RandomizerId, bool),
}

/// Records every command; immediate (zero-delay) commands flip the stored state.
#[derive(Default)]
pub struct RecordingRegistry {
    devices: Mutex<HashMap<DeviceId, DeviceSnapshot>>,
    commands: Mutex<Vec<Recorded>>,
    rejecting: Mutex<HashSet<DeviceId>>,
    rejecting_state: Mutex<bool>,
    next_updates: Mutex<HashMap<RandomizerId, Option<Timestamp>>>,
}

impl RecordingRegistry {
    pub fn with_devices(devices: &[(u64, &str, bool)]) -> Self {
        let registry = Self::default();
        for &(id, name, on) in devices {
            registry.add(id, name, on);
        }
        registry
    }

    pub fn add(&self, id: u64, name: &str, on: bool) {
        let id = DeviceId::new(id);
        self.devices.lock().unwrap().insert(
            id,
            DeviceSnapshot {
                id,
                name: name.to_string(),
                on,
            },
        );
    }

    pub fn remove(&self, id: u64) {
        self.devices.lock().unwrap().remove(&DeviceId::new(id));
    }

    pub fn set_on(&self, id: u64, on: bool) {
        if let Some(dev) = self.devices.lock().unwrap().get_mut(&DeviceId::new(id)) {
            dev.on = on;
        }
    }

    pub fn is_on(&self, id: u64) -> bool {
        self.devices.lock().unwrap()[&DeviceId::new(id)].on
    }

    /// Make on/off commands for `id` fail with a [`CommandIssueError`].
    pub fn reject_commands_for(&self, id: u64) {
        self.rejecting.lock().unwrap().insert(DeviceId::new(id));
    }

    pub fn accept_commands_for(&self, id: u64) {
        self.rejecting.lock().unwrap().remove(&DeviceId::new(id));
    }

    /// Make `set_state` fail with a [`CommandIssueError`].
    pub fn reject_state_updates(&self) {
        *self.rejecting_state.lock().unwrap() = true;
    }

    pub fn commands(&self) -> Vec<Recorded> {
        self.commands.lock().unwrap().clone()
    }

    pub fn clear_commands(&self) {
        self.commands.lock().unwrap().clear();
    }

    pub fn next_update(&self, id: RandomizerId) -> Option<Timestamp> {
        self.next_updates.lock().unwrap().get(&id).copied().flatten()
    }

    fn lookup(&self, id: DeviceId) -> Result<DeviceSnapshot, OccupancyError> {
        self.devices
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| NotFoundError::device(id).into())
    }

    fn check_accepts(&self, id: DeviceId, command: CommandKind) -> Result<(), OccupancyError> {
        self.lookup(id)?;
        if self.rejecting.lock().unwrap().contains(&id) {
            return Err(CommandIssueError {
                command,
                target: id.to_string(),
                reason: "rejected by test".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl DeviceRegistry for RecordingRegistry {
    fn get_device(
        &self,
        id: DeviceId,
    ) -> impl Future<Output = Result<DeviceSnapshot, OccupancyError>> + Send {
        let result = self.lookup(id);
        async { result }
    }

    fn turn_on(
        &self,
        id: DeviceId,
        delay_secs: u32,
        duration_secs: u32,
    ) -> impl Future<Output = Result<(), OccupancyError>> + Send {
        let result = self.check_accepts(id, CommandKind::TurnOn).map(|()| {
            self.commands.lock().unwrap().push(Recorded::TurnOn {
                device: id,
                delay_secs,
                duration_secs,
            });
            if delay_secs == 0 {
                self.set_on(id.get(), true);
            }
        });
        async { result }
    }

    fn turn_off(
        &self,
        id: DeviceId,
        delay_secs: u32,
    ) -> impl Future<Output = Result<(), OccupancyError>> + Send {
        let result = self.check_accepts(id, CommandKind::TurnOff).map(|()| {
            self.commands
                .lock()
                .unwrap()
                .push(Recorded::TurnOff { device: id, delay_secs });
            if delay_secs == 0 {
                self.set_on(id.get(), false);
            }
        });
        async { result }
    }

    fn cancel_pending(
        &self,
        id: DeviceId,
    ) -> impl Future<Output = Result<(), OccupancyError>> + Send {
        let result = self.lookup(id).map(|_| {
            self.commands
                .lock()
                .unwrap()
                .push(Recorded::CancelPending(id));
        });
        async { result }
    }

    fn set_state(
        &self,
        id: RandomizerId,
        on: bool,
    ) -> impl Future<Output = Result<(), OccupancyError>> + Send {
        let result = if *self.rejecting_state.lock().unwrap() {
            Err(CommandIssueError {
                command: CommandKind::SetState,
                target: id.to_string(),
                reason: "rejected by test".to_string(),
            }
            .into())
        } else {
            self.commands
                .lock()
                .unwrap()
                .push(Recorded::SetState(id, on));
            Ok(())
        };
        async { result }
    }

    fn set_next_update(
        &self,
        id: RandomizerId,
        next_update: Option<Timestamp>,
    ) -> impl Future<Output = Result<(), OccupancyError>> + Send {
        self.next_updates.lock().unwrap().insert(id, next_update);
        async { Ok(()) }
    }
}
