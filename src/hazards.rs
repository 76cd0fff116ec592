//! Hazard events

use std::fmt;

use chrono::{DateTime, Utc};

/// A hazard occurrence acting on a receptor
///
/// Receptors match on this enum exhaustively; adding a variant means
/// deciding what every receptor does with it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HazardEvent {
    /// Flood depth at ground level, in the units of the damage functions
    Depth { depth: f64 },
    /// Flood arrival time and how long the water stays, in days
    ArrivalDuration {
        arrival: DateTime<Utc>,
        duration_days: f64,
    },
}

impl HazardEvent {
    pub fn depth(depth: f64) -> Self {
        HazardEvent::Depth { depth }
    }

    pub fn arrival_duration(arrival: DateTime<Utc>, duration_days: f64) -> Self {
        HazardEvent::ArrivalDuration {
            arrival,
            duration_days,
        }
    }

    /// Ground-level depth, when the event carries one
    pub fn depth_value(&self) -> Option<f64> {
        match self {
            HazardEvent::Depth { depth } => Some(*depth),
            HazardEvent::ArrivalDuration { .. } => None,
        }
    }
}

impl fmt::Display for HazardEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HazardEvent::Depth { depth } => write!(f, "depth {:.3}", depth),
            HazardEvent::ArrivalDuration {
                arrival,
                duration_days,
            } => write!(
                f,
                "arrival {} for {:.1} days",
                arrival.format("%Y-%m-%d %H:%M"),
                duration_days
            ),
        }
    }
}
