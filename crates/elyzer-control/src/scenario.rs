// ─────────────────────────────────────────────────────────────────────
// Elyzer Control Core — Scenario-Robust Control
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Scenario-based robust controller.
//!
//! A fixed ensemble of perturbed copies of the measured state (nominal
//! plus symmetric efficiency and temperature offsets) is solved with the
//! quadratic-tracking law. Each solution is vetted with the model, and
//! the surviving solutions are combined by probability-weighted
//! expectation.

use crate::controller::Controller;
use crate::quadratic::tracking_action;
use elyzer_core::model::PredictionModel;
use elyzer_core::objective::fitness;
use elyzer_types::config::ScenarioConfig;
use elyzer_types::error::{ElyzerError, ElyzerResult};
use elyzer_types::state::{ControlAction, SystemState};
use std::sync::Arc;
use tracing::debug;

pub const NAME: &str = "scenario_robust";

/// One disturbance hypothesis applied to the measured state.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub name: String,
    pub state: SystemState,
    pub probability: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioSolution {
    pub name: String,
    pub probability: f64,
    pub action: ControlAction,
    /// Shared fitness of the action under the perturbed state.
    pub fitness: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioOutcome {
    pub action: ControlAction,
    pub solutions: Vec<ScenarioSolution>,
    /// Scenarios dropped because their state or prediction was invalid.
    pub excluded: Vec<String>,
    /// Probability-weighted standard deviation of scenario currents [A].
    pub current_spread_a: f64,
}

pub struct ScenarioRobustController {
    model: Arc<PredictionModel>,
    config: ScenarioConfig,
}

impl ScenarioRobustController {
    /// Rejects ensembles whose probabilities do not sum to 1.
    pub fn new(model: Arc<PredictionModel>, config: ScenarioConfig) -> ElyzerResult<Self> {
        config.validate()?;
        Ok(Self { model, config })
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    pub fn scenarios(&self, state: &SystemState) -> Vec<Scenario> {
        self.config
            .scenarios
            .iter()
            .map(|spec| Scenario {
                name: spec.name.clone(),
                state: SystemState {
                    efficiency_pct: state.efficiency_pct + spec.efficiency_offset_pct,
                    stack_temperature_c: state.stack_temperature_c + spec.temperature_offset_c,
                    ..*state
                },
                probability: spec.probability,
            })
            .collect()
    }

    fn solve_scenario(&self, scenario: &Scenario) -> ElyzerResult<ScenarioSolution> {
        if !scenario.state.is_finite() {
            return Err(ElyzerError::computation(
                NAME,
                format!("scenario '{}' has a non-finite state", scenario.name),
            ));
        }
        let action = tracking_action(&scenario.state, &self.config.tracking);
        let trajectory = self
            .model
            .predict(&scenario.state, &action, self.config.horizon)?;
        Ok(ScenarioSolution {
            name: scenario.name.clone(),
            probability: scenario.probability,
            action,
            fitness: fitness(&self.model, &trajectory, self.config.nominal_current_a),
        })
    }

    pub fn solve(&self, state: &SystemState) -> ElyzerResult<ScenarioOutcome> {
        let mut solutions = Vec::new();
        let mut excluded = Vec::new();
        for scenario in self.scenarios(state) {
            match self.solve_scenario(&scenario) {
                Ok(solution) => solutions.push(solution),
                Err(e) => {
                    debug!(
                        controller = NAME,
                        scenario = %scenario.name,
                        error = %e,
                        "scenario excluded"
                    );
                    excluded.push(scenario.name);
                }
            }
        }

        let total: f64 = solutions.iter().map(|s| s.probability).sum();
        if solutions.is_empty() || total <= 0.0 {
            return Err(ElyzerError::computation(NAME, "no admissible scenario"));
        }

        // Expected value, renormalised over the admissible scenarios
        let current = solutions
            .iter()
            .map(|s| s.probability * s.action.current_a)
            .sum::<f64>()
            / total;
        let voltage = solutions
            .iter()
            .map(|s| s.probability * s.action.voltage_v)
            .sum::<f64>()
            / total;
        let variance = solutions
            .iter()
            .map(|s| s.probability * (s.action.current_a - current).powi(2))
            .sum::<f64>()
            / total;

        Ok(ScenarioOutcome {
            action: ControlAction::clamped(current, voltage),
            solutions,
            excluded,
            current_spread_a: variance.sqrt(),
        })
    }
}

impl Controller for ScenarioRobustController {
    fn name(&self) -> &str {
        NAME
    }

    fn compute_control(&self, state: &SystemState) -> ElyzerResult<ControlAction> {
        let outcome = self.solve(state)?;
        debug!(
            controller = NAME,
            current_a = outcome.action.current_a,
            voltage_v = outcome.action.voltage_v,
            spread_a = outcome.current_spread_a,
            excluded = outcome.excluded.len(),
            "robust action"
        );
        Ok(outcome.action)
    }
}
