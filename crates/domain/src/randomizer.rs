//! Randomizer configuration: a named group of up to ten light slots.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigValidationError, FieldError, FieldErrorKind, SlotField};
use crate::id::{DeviceId, RandomizerId};
use crate::slot::{LightSlotConfig, RawSlotConfig};

/// Number of light slots a randomizer exposes.
pub const SLOT_COUNT: usize = 10;

/// Validated randomizer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomizerConfig {
    pub id: RandomizerId,
    pub name: String,
    /// Slot `n` lives at index `n - 1`.
    pub slots: [Option<LightSlotConfig>; SLOT_COUNT],
}

impl RandomizerConfig {
    /// Iterate over the configured lights in slot order.
    pub fn lights(&self) -> impl Iterator<Item = &LightSlotConfig> {
        self.slots.iter().flatten()
    }
}

/// Randomizer configuration as entered by the user, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRandomizerConfig {
    pub id: RandomizerId,
    pub name: String,
    pub slots: [RawSlotConfig; SLOT_COUNT],
}

impl RawRandomizerConfig {
    /// Validate every slot and the cross-slot invariants.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigValidationError`] listing every rejected field when
    /// any slot has an empty, non-numeric or out-of-range bound, a minimum
    /// above its maximum, or a device already referenced by another slot.
    pub fn validate(&self) -> Result<RandomizerConfig, ConfigValidationError> {
        let mut errors = Vec::new();
        let mut slots = [None; SLOT_COUNT];
        let mut seen: HashMap<DeviceId, u8> = HashMap::new();

        for (number, (raw, target)) in (1_u8..).zip(self.slots.iter().zip(slots.iter_mut())) {
            match raw.validate(number) {
                Ok(Some(light)) => {
                    if let Some(&first_slot) = seen.get(&light.device_id) {
                        errors.push(FieldError {
                            slot: number,
                            field: SlotField::Device,
                            kind: FieldErrorKind::DuplicateDevice { first_slot },
                        });
                    } else {
                        seen.insert(light.device_id, number);
                        *target = Some(light);
                    }
                }
                Ok(None) => {}
                Err(mut slot_errors) => errors.append(&mut slot_errors),
            }
        }

        if errors.is_empty() {
            Ok(RandomizerConfig {
                id: self.id,
                name: self.name.clone(),
                slots,
            })
        } else {
            Err(ConfigValidationError { errors })
        }
    }
}
