//! Virtual light: an on/off device with cancellable pending commands.

use tokio::task::JoinHandle;

use occupancy_domain::device::DeviceSnapshot;
use occupancy_domain::id::DeviceId;

/// A simulated light.
pub struct VirtualLight {
    id: DeviceId,
    name: String,
    on: bool,
    available: bool,
    pending: Vec<JoinHandle<()>>,
}

impl VirtualLight {
    pub fn new(id: DeviceId, name: impl Into<String>, on: bool) -> Self {
        Self {
            id,
            name: name.into(),
            on,
            available: true,
            pending: Vec::new(),
        }
    }

    /// Current state as reported to the scheduler.
    #[must_use]
    pub fn snapshot(&self) -> DeviceSnapshot {
        DeviceSnapshot {
            id: self.id,
            name: self.name.clone(),
            on: self.on,
        }
    }

    #[must_use]
    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn set_on(&mut self, on: bool) {
        self.on = on;
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    /// Keep the timer task of a newly scheduled command.
    pub fn track(&mut self, task: JoinHandle<()>) {
        self.pending.retain(|t| !t.is_finished());
        self.pending.push(task);
    }

    /// Number of commands still waiting to fire.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.iter().filter(|t| !t.is_finished()).count()
    }

    /// Abort every pending command; returns how many were still waiting.
    pub fn cancel_pending(&mut self) -> usize {
        let waiting = self.pending_count();
        for task in self.pending.drain(..) {
            task.abort();
        }
        waiting
    }
}

impl Drop for VirtualLight {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
