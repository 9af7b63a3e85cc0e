//! Error types shared across the workspace.
//!
//! Each failure kind is its own typed error; [`OccupancyError`] aggregates
//! them with `#[from]` conversions so ports and services can use `?`.

use std::fmt;

use crate::id::DeviceId;

/// Top-level error for the occupancy system.
#[derive(Debug, thiserror::Error)]
pub enum OccupancyError {
    /// Raw configuration failed validation.
    #[error("invalid configuration")]
    Validation(#[from] ConfigValidationError),

    /// A referenced device or randomizer does not exist.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// The host rejected a device command.
    #[error("command rejected")]
    Command(#[from] CommandIssueError),
}

/// A device or randomizer id could not be resolved.
#[derive(Debug, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    /// Kind of thing that was looked up (`"Device"`, `"Randomizer"`).
    pub entity: &'static str,
    /// The id that failed to resolve.
    pub id: String,
}

impl NotFoundError {
    /// Not-found error for a controlled device.
    #[must_use]
    pub fn device(id: DeviceId) -> Self {
        Self {
            entity: "Device",
            id: id.to_string(),
        }
    }
}

/// The device command a [`CommandIssueError`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    TurnOn,
    TurnOff,
    CancelPending,
    SetState,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TurnOn => f.write_str("turn_on"),
            Self::TurnOff => f.write_str("turn_off"),
            Self::CancelPending => f.write_str("cancel_pending"),
            Self::SetState => f.write_str("set_state"),
        }
    }
}

/// The host refused to schedule a command.
#[derive(Debug, thiserror::Error)]
#[error("{command} rejected for {target}: {reason}")]
pub struct CommandIssueError {
    /// Command that was refused.
    pub command: CommandKind,
    /// Id of the device or randomizer the command addressed.
    pub target: String,
    /// Host-provided reason.
    pub reason: String,
}

/// All field errors found while validating one randomizer's slots.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", summarize(.errors))]
pub struct ConfigValidationError {
    pub errors: Vec<FieldError>,
}

fn summarize(errors: &[FieldError]) -> String {
    let mut out = format!("{} invalid field(s)", errors.len());
    for (idx, err) in errors.iter().enumerate() {
        out.push_str(if idx == 0 { ": " } else { "; " });
        out.push_str(&err.to_string());
    }
    out
}

/// One configuration field of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotField {
    Device,
    MinDelay,
    MaxDelay,
    MinDuration,
    MaxDuration,
}

impl SlotField {
    /// The four numeric bound fields, in configuration order.
    pub const BOUNDS: [Self; 4] = [
        Self::MinDelay,
        Self::MaxDelay,
        Self::MinDuration,
        Self::MaxDuration,
    ];

    /// Snake-case field name as used in configuration files.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Device => "device",
            Self::MinDelay => "min_delay",
            Self::MaxDelay => "max_delay",
            Self::MinDuration => "min_duration",
            Self::MaxDuration => "max_duration",
        }
    }
}

impl fmt::Display for SlotField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a field was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldErrorKind {
    /// The field was left blank.
    Empty,
    /// The field contains something other than decimal digits.
    NotNumeric,
    /// The value lies outside `1..=480`.
    OutOfRange,
    /// A minimum bound is larger than its maximum.
    MinExceedsMax { min: u16, max: u16 },
    /// The device reference is not a valid id.
    InvalidDevice,
    /// The device is already used by an earlier slot.
    DuplicateDevice { first_slot: u8 },
}

impl fmt::Display for FieldErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("must not be empty"),
            Self::NotNumeric => f.write_str("must be a positive integer"),
            Self::OutOfRange => f.write_str("must be between 1 and 480"),
            Self::MinExceedsMax { min, max } => {
                write!(f, "minimum {min} is greater than maximum {max}")
            }
            Self::InvalidDevice => f.write_str("must be a device id"),
            Self::DuplicateDevice { first_slot } => {
                write!(f, "device already used by slot {first_slot:02}")
            }
        }
    }
}

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Slot number, `1..=10`.
    pub slot: u8,
    pub field: SlotField,
    pub kind: FieldErrorKind,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot {:02} {}: {}", self.slot, self.field, self.kind)
    }
}
