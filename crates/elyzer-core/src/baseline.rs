//! Static "optimal_setpoint" reference action.

use crate::model::PredictionModel;
use crate::objective::evaluate_fitness;
use elyzer_types::constants::{NOMINAL_CURRENT_A, NOMINAL_VOLTAGE_V};
use elyzer_types::error::ElyzerResult;
use elyzer_types::state::{ControlAction, SystemState};

pub const BASELINE_NAME: &str = "optimal_setpoint";

/// 150 A, 2.1 V.
pub fn optimal_setpoint() -> ControlAction {
    ControlAction::clamped(NOMINAL_CURRENT_A, NOMINAL_VOLTAGE_V)
}

/// Shared fitness of the static setpoint from `state`.
pub fn evaluate(
    model: &PredictionModel,
    state: &SystemState,
    horizon: usize,
    nominal_current_a: f64,
) -> ElyzerResult<f64> {
    evaluate_fitness(model, state, &optimal_setpoint(), horizon, nominal_current_a)
}
