//! Device: a live view of a controlled device as reported by the host.

use serde::{Deserialize, Serialize};

use crate::id::DeviceId;

/// Point-in-time state of a controlled device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub id: DeviceId,
    pub name: String,
    pub on: bool,
}
