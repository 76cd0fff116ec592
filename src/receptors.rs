//! Consequence receptors: assets that turn hazard events into damage

use std::sync::Arc;

use crate::hazards::HazardEvent;
use crate::paired_data::PairedData;
use crate::results::ConsequenceResult;

pub const STRUCTURE_DAMAGE: &str = "structure damage";
pub const CONTENT_DAMAGE: &str = "content damage";

/// Damage-percent-vs-depth relationship for one asset category
#[derive(Debug, Clone, PartialEq)]
pub struct Occupancy {
    pub name: String,
    pub damage_function: PairedData,
}

impl Occupancy {
    pub fn new(name: impl Into<String>, damage_function: PairedData) -> Self {
        Self {
            name: name.into(),
            damage_function,
        }
    }
}

/// Anything that can compute consequences for a hazard event
pub trait ConsequenceReceptor {
    fn compute(&self, event: &HazardEvent) -> ConsequenceResult;
}

/// A building with structure and content value
///
/// Curve ordinates are percent damage; a curve with negative ordinates
/// yields negative damage.
#[derive(Debug, Clone)]
pub struct Structure {
    pub identity: String,
    pub occupancy: Arc<Occupancy>,
    pub damage_category: String,
    pub structure_value: f64,
    pub content_value: f64,
    pub foundation_height: f64,
}

impl Structure {
    fn damages(&self, structure: f64, content: f64) -> ConsequenceResult {
        ConsequenceResult::from_pairs([(STRUCTURE_DAMAGE, structure), (CONTENT_DAMAGE, content)])
    }
}

impl ConsequenceReceptor for Structure {
    fn compute(&self, event: &HazardEvent) -> ConsequenceResult {
        match event {
            HazardEvent::Depth { depth } => {
                let depth_above_foundation = depth - self.foundation_height;
                let damage_percent =
                    self.occupancy.damage_function.sample(depth_above_foundation) / 100.0;
                self.damages(
                    damage_percent * self.structure_value,
                    damage_percent * self.content_value,
                )
            }
            // Structures only respond to depth
            HazardEvent::ArrivalDuration { .. } => self.damages(0.0, 0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::ResultValue;
    use approx::assert_abs_diff_eq;
    use chrono::{TimeZone, Utc};

    fn structure(foundation_height: f64) -> Structure {
        let curve =
            PairedData::new(vec![1.0, 2.0, 3.0, 4.0], vec![10.0, 20.0, 30.0, 40.0]).unwrap();
        Structure {
            identity: "s-1".to_string(),
            occupancy: Arc::new(Occupancy::new("RES1-1SNB", curve)),
            damage_category: "residential".to_string(),
            structure_value: 100.0,
            content_value: 10.0,
            foundation_height,
        }
    }

    fn damage(result: &ConsequenceResult, header: &str) -> f64 {
        result.get(header).and_then(ResultValue::as_f64).unwrap()
    }

    #[test]
    fn depth_event_at_grade() {
        let result = structure(0.0).compute(&HazardEvent::depth(3.0));
        assert_eq!(result.headers(), &[STRUCTURE_DAMAGE, CONTENT_DAMAGE]);
        assert_abs_diff_eq!(damage(&result, STRUCTURE_DAMAGE), 30.0, epsilon = 1e-9);
        assert_abs_diff_eq!(damage(&result, CONTENT_DAMAGE), 3.0, epsilon = 1e-9);
    }

    #[test]
    fn foundation_height_reduces_exposure() {
        let result = structure(1.1).compute(&HazardEvent::depth(4.0));
        assert_abs_diff_eq!(damage(&result, STRUCTURE_DAMAGE), 29.0, epsilon = 1e-9);
        assert_abs_diff_eq!(damage(&result, CONTENT_DAMAGE), 2.9, epsilon = 1e-9);
    }

    #[test]
    fn water_below_curve_does_no_damage() {
        let result = structure(2.0).compute(&HazardEvent::depth(2.5));
        assert_eq!(damage(&result, STRUCTURE_DAMAGE), 0.0);
    }

    #[test]
    fn unsupported_event_yields_zero_row() {
        let arrival = Utc.with_ymd_and_hms(2023, 3, 14, 0, 0, 0).unwrap();
        let result = structure(0.0).compute(&HazardEvent::arrival_duration(arrival, 5.0));
        assert_eq!(result.headers(), &[STRUCTURE_DAMAGE, CONTENT_DAMAGE]);
        assert_eq!(
            result.results(),
            &[ResultValue::Float(0.0), ResultValue::Float(0.0)]
        );
    }
}
