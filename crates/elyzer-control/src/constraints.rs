// ─────────────────────────────────────────────────────────────────────
// Elyzer Control Core — Operating Constraints
// © 1998–2026 Miroslav Šotek. All rights reserved.
// ─────────────────────────────────────────────────────────────────────
//! Actuator and thermal constraints checked on every controller result.
//! Violations are flags, not errors.

use elyzer_core::model::PredictionTrajectory;
use elyzer_types::constants::{
    CURRENT_MAX_A, CURRENT_MIN_A, TEMPERATURE_LIMIT_C, VOLTAGE_MAX_V, VOLTAGE_MIN_V,
};
use elyzer_types::state::{ConstraintViolation, ControlAction};
use std::collections::BTreeSet;

/// Closed interval limit for one actuator.
#[derive(Debug, Clone, Copy)]
pub struct PhysicalConstraint {
    pub min_value: f64,
    pub max_value: f64,
}

impl PhysicalConstraint {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min_value: min,
            max_value: max,
        }
    }

    /// NaN is never within limits.
    pub fn contains(&self, value: f64) -> bool {
        (self.min_value..=self.max_value).contains(&value)
    }
}

/// Global operating envelope for the stack.
#[derive(Debug, Clone, Copy)]
pub struct OperatingEnvelope {
    pub current: PhysicalConstraint,
    pub voltage: PhysicalConstraint,
    pub temperature_limit_c: f64,
}

impl OperatingEnvelope {
    pub fn with_temperature_limit(temperature_limit_c: f64) -> Self {
        Self {
            temperature_limit_c,
            ..Self::default()
        }
    }

    /// Flag envelope breaches of `action` and, when a prediction is
    /// available, a post-control temperature above the limit.
    pub fn check(
        &self,
        action: &ControlAction,
        predicted: Option<&PredictionTrajectory>,
    ) -> BTreeSet<ConstraintViolation> {
        let mut violations = BTreeSet::new();
        if !self.current.contains(action.current_a) {
            violations.insert(ConstraintViolation::CurrentOutOfRange);
        }
        if !self.voltage.contains(action.voltage_v) {
            violations.insert(ConstraintViolation::VoltageOutOfRange);
        }
        match predicted {
            Some(trajectory) => {
                if trajectory.max_temperature() > self.temperature_limit_c {
                    violations.insert(ConstraintViolation::TemperatureTooHigh);
                }
            }
            None => {
                violations.insert(ConstraintViolation::PredictionUnavailable);
            }
        }
        violations
    }
}

impl Default for OperatingEnvelope {
    fn default() -> Self {
        Self {
            current: PhysicalConstraint::new(CURRENT_MIN_A, CURRENT_MAX_A),
            voltage: PhysicalConstraint::new(VOLTAGE_MIN_V, VOLTAGE_MAX_V),
            temperature_limit_c: TEMPERATURE_LIMIT_C,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elyzer_core::model::PredictionModel;
    use elyzer_types::state::SystemState;

    #[test]
    fn test_nominal_action_clean() {
        let model = PredictionModel::default();
        let action = ControlAction::default();
        let traj = model
            .predict(&SystemState::default(), &action, 10)
            .expect("finite");
        let v = OperatingEnvelope::default().check(&action, Some(&traj));
        assert!(v.is_empty(), "Unexpected violations: {v:?}");
    }

    #[test]
    fn test_out_of_range_flags() {
        let raw = ControlAction {
            current_a: 250.0,
            voltage_v: 1.5,
        };
        let v = OperatingEnvelope::default().check(&raw, None);
        assert!(v.contains(&ConstraintViolation::CurrentOutOfRange));
        assert!(v.contains(&ConstraintViolation::VoltageOutOfRange));
        assert!(v.contains(&ConstraintViolation::PredictionUnavailable));
    }

    #[test]
    fn test_nan_action_flagged() {
        let raw = ControlAction {
            current_a: f64::NAN,
            voltage_v: 2.0,
        };
        let v = OperatingEnvelope::default().check(&raw, None);
        assert!(v.contains(&ConstraintViolation::CurrentOutOfRange));
    }

    #[test]
    fn test_hot_prediction_flagged() {
        let model = PredictionModel::default();
        let state = SystemState {
            stack_temperature_c: 79.5,
            ..SystemState::default()
        };
        let action = ControlAction::clamped(200.0, 2.4);
        let traj = model.predict(&state, &action, 10).expect("finite");
        let v = OperatingEnvelope::default().check(&action, Some(&traj));
        assert!(
            v.contains(&ConstraintViolation::TemperatureTooHigh),
            "max T = {}",
            traj.max_temperature()
        );
    }

    #[test]
    fn test_custom_temperature_limit() {
        let model = PredictionModel::default();
        let action = ControlAction::default();
        let traj = model
            .predict(&SystemState::default(), &action, 10)
            .expect("finite");
        let strict = OperatingEnvelope::with_temperature_limit(60.0);
        assert!(strict
            .check(&action, Some(&traj))
            .contains(&ConstraintViolation::TemperatureTooHigh));
    }
}
