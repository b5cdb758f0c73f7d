//! Cart controller status.

use serde::{Deserialize, Serialize};

/// Status tag of the cart state machine.
///
/// `Initializing`, `Fetching`, `Creating` and `Updating` mean a gateway call
/// is pending (or, for `Initializing`, about to be issued); no new action is
/// accepted in those states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CartStatus {
    /// No cart id known, nothing loaded, nothing in flight.
    #[default]
    Uninitialized,
    /// A persisted cart id was found; the startup fetch has not been issued yet.
    Initializing,
    /// The startup fetch-by-id is in flight.
    Fetching,
    /// A create-cart mutation is in flight.
    Creating,
    /// A mutation against an existing cart is in flight.
    Updating,
    /// Quiescent after a settle.
    Idle,
}

impl CartStatus {
    /// Whether a gateway call is pending or scheduled in this status.
    #[must_use]
    pub const fn is_busy(self) -> bool {
        matches!(
            self,
            Self::Initializing | Self::Fetching | Self::Creating | Self::Updating
        )
    }

    /// Whether a mutating action may be accepted in this status.
    #[must_use]
    pub const fn accepts_actions(self) -> bool {
        matches!(self, Self::Uninitialized | Self::Idle)
    }
}

impl std::fmt::Display for CartStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Initializing => write!(f, "initializing"),
            Self::Fetching => write!(f, "fetching"),
            Self::Creating => write!(f, "creating"),
            Self::Updating => write!(f, "updating"),
            Self::Idle => write!(f, "idle"),
        }
    }
}

impl std::str::FromStr for CartStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uninitialized" => Ok(Self::Uninitialized),
            "initializing" => Ok(Self::Initializing),
            "fetching" => Ok(Self::Fetching),
            "creating" => Ok(Self::Creating),
            "updating" => Ok(Self::Updating),
            "idle" => Ok(Self::Idle),
            _ => Err(format!("invalid cart status: {s}")),
        }
    }
}
