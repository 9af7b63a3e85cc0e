//! Light slots: one controlled device plus its delay/duration bounds.
//!
//! Slots arrive as raw text (as typed into a configuration form) and are
//! validated once into [`LightSlotConfig`]. Bounds are minutes in `1..=480`.

use serde::{Deserialize, Serialize};

use crate::error::{FieldError, FieldErrorKind, SlotField};
use crate::id::DeviceId;

/// Smallest accepted bound, in minutes.
pub const MIN_BOUND_MINUTES: u16 = 1;
/// Largest accepted bound, in minutes (eight hours).
pub const MAX_BOUND_MINUTES: u16 = 480;

/// Validated configuration of one controlled light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightSlotConfig {
    pub device_id: DeviceId,
    pub min_delay: u16,
    pub max_delay: u16,
    pub min_duration: u16,
    pub max_duration: u16,
}

impl LightSlotConfig {
    /// Delay bounds in seconds, `(min, max)`.
    #[must_use]
    pub fn delay_secs(&self) -> (u32, u32) {
        (minutes_to_secs(self.min_delay), minutes_to_secs(self.max_delay))
    }

    /// Duration bounds in seconds, `(min, max)`.
    #[must_use]
    pub fn duration_secs(&self) -> (u32, u32) {
        (
            minutes_to_secs(self.min_duration),
            minutes_to_secs(self.max_duration),
        )
    }
}

fn minutes_to_secs(minutes: u16) -> u32 {
    u32::from(minutes) * 60
}

/// Unvalidated slot as entered by the user. Every field is free text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSlotConfig {
    pub device: String,
    pub min_delay: String,
    pub max_delay: String,
    pub min_duration: String,
    pub max_duration: String,
}

impl RawSlotConfig {
    /// Whether the slot references no device (blank or `0`).
    #[must_use]
    pub fn is_unused(&self) -> bool {
        let device = self.device.trim();
        device.is_empty() || device.chars().all(|c| c == '0')
    }

    fn field(&self, field: SlotField) -> &str {
        match field {
            SlotField::Device => &self.device,
            SlotField::MinDelay => &self.min_delay,
            SlotField::MaxDelay => &self.max_delay,
            SlotField::MinDuration => &self.min_duration,
            SlotField::MaxDuration => &self.max_duration,
        }
    }

    /// Validate this slot in isolation.
    ///
    /// Returns `Ok(None)` for an unused slot. Cross-slot checks (duplicate
    /// devices) are done by the randomizer configuration.
    ///
    /// # Errors
    ///
    /// Returns every [`FieldError`] found in the slot.
    pub fn validate(&self, slot: u8) -> Result<Option<LightSlotConfig>, Vec<FieldError>> {
        if self.is_unused() {
            return Ok(None);
        }

        let mut errors = Vec::new();
        let device_id = match self.device.parse::<DeviceId>() {
            Ok(id) => Some(id),
            Err(_) => {
                errors.push(FieldError {
                    slot,
                    field: SlotField::Device,
                    kind: FieldErrorKind::InvalidDevice,
                });
                None
            }
        };

        let mut bounds = [0_u16; 4];
        for (value, field) in bounds.iter_mut().zip(SlotField::BOUNDS) {
            match parse_bound(self.field(field)) {
                Ok(minutes) => *value = minutes,
                Err(kind) => errors.push(FieldError { slot, field, kind }),
            }
        }
        let [min_delay, max_delay, min_duration, max_duration] = bounds;

        for (min, max, field) in [
            (min_delay, max_delay, SlotField::MinDelay),
            (min_duration, max_duration, SlotField::MinDuration),
        ] {
            // zero means the bound itself was already rejected
            if min != 0 && max != 0 && min > max {
                errors.push(FieldError {
                    slot,
                    field,
                    kind: FieldErrorKind::MinExceedsMax { min, max },
                });
            }
        }

        match device_id {
            Some(device_id) if errors.is_empty() => Ok(Some(LightSlotConfig {
                device_id,
                min_delay,
                max_delay,
                min_duration,
                max_duration,
            })),
            _ => Err(errors),
        }
    }
}

fn parse_bound(raw: &str) -> Result<u16, FieldErrorKind> {
    if raw.is_empty() {
        return Err(FieldErrorKind::Empty);
    }
    if !raw.chars().all(|c| c.is_ascii_digit()) {
        return Err(FieldErrorKind::NotNumeric);
    }
    raw.parse::<u16>()
        .ok()
        .filter(|v| (MIN_BOUND_MINUTES..=MAX_BOUND_MINUTES).contains(v))
        .ok_or(FieldErrorKind::OutOfRange)
}
