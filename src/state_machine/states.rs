use serde::{Deserialize, Serialize};
use std::fmt;

/// Patient call-in states
///
/// The lifecycle is linear: `pending -> call -> called -> finished`, with
/// `call -> pending` as the rollback edge taken when paging fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatientStatus {
    /// Waiting for the examination
    Pending,
    /// Pager call requested, dispatch in flight
    Call,
    /// Pager has been paged
    Called,
    /// Patient left the examination queue
    Finished,
}

impl PatientStatus {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished)
    }

    /// Check if the patient's pager is (being) paged in this state
    pub fn is_paging(&self) -> bool {
        matches!(self, Self::Call | Self::Called)
    }

    /// Database / wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Call => "call",
            Self::Called => "called",
            Self::Finished => "finished",
        }
    }
}

impl fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PatientStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "call" => Ok(Self::Call),
            "called" => Ok(Self::Called),
            "finished" => Ok(Self::Finished),
            _ => Err(format!("Invalid patient status: {s}")),
        }
    }
}

/// Default state for new patients
impl Default for PatientStatus {
    fn default() -> Self {
        Self::Pending
    }
}
