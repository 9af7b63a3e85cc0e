//! Actions a user (or an automation rule) can send to a randomizer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A request addressed to one randomizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RandomizerAction {
    /// Start randomizing.
    TurnOn,
    /// Stop randomizing; controlled devices keep their pending commands.
    TurnOff,
    /// Flip between [`TurnOn`](Self::TurnOn) and [`TurnOff`](Self::TurnOff).
    Toggle,
    /// Re-run the update pass if the randomizer is on.
    RequestStatus,
    /// Stop randomizing and cancel pending commands, leaving devices as they are.
    Freeze,
    /// Stop randomizing, cancel pending commands and switch every lit device off.
    ForceOff,
}

impl RandomizerAction {
    /// Snake-case action name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TurnOn => "turn_on",
            Self::TurnOff => "turn_off",
            Self::Toggle => "toggle",
            Self::RequestStatus => "request_status",
            Self::Freeze => "freeze",
            Self::ForceOff => "force_off",
        }
    }
}

impl fmt::Display for RandomizerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The action name is not one [`RandomizerAction`] knows.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action {0:?}")]
pub struct UnknownAction(pub String);

impl FromStr for RandomizerAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "turn_on" => Ok(Self::TurnOn),
            "turn_off" => Ok(Self::TurnOff),
            "toggle" => Ok(Self::Toggle),
            "request_status" => Ok(Self::RequestStatus),
            "freeze" => Ok(Self::Freeze),
            "force_off" => Ok(Self::ForceOff),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}
