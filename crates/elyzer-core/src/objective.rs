// ─────────────────────────────────────────────────────────────────────
// Elyzer Control Core — Control Objective
// © 1998–2026 Miroslav Šotek. All rights reserved.
// ─────────────────────────────────────────────────────────────────────
//! Shared multi-objective scoring of predicted trajectories.
//!
//! Every controller and the comparison harness rank actions with these
//! functions, so a score computed in one place is comparable everywhere.

use crate::model::{PredictionModel, PredictionTrajectory};
use elyzer_types::constants::{CURRENT_MAX_A, CURRENT_MIN_A};
use elyzer_types::error::ElyzerResult;
use elyzer_types::state::{ControlAction, SystemState};

/// Linear weights over the objective terms. Effort is subtracted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitnessWeights {
    pub efficiency: f64,
    pub production: f64,
    pub safety: f64,
    pub stability: f64,
    pub effort: f64,
}

/// HE-NMPC fitness: efficiency 35 %, production 25 %, safety 20 %,
/// stability 15 %, control-effort penalty 5 %.
pub const FITNESS_WEIGHTS: FitnessWeights = FitnessWeights {
    efficiency: 0.35,
    production: 0.25,
    safety: 0.20,
    stability: 0.15,
    effort: 0.05,
};

/// Mixed-controller score: 0.5 / 0.3 / 0.2, effort penalty at the same
/// 5 % as the evolutionary fitness. No stability term.
pub const MIXED_WEIGHTS: FitnessWeights = FitnessWeights {
    efficiency: 0.5,
    production: 0.3,
    safety: 0.2,
    stability: 0.0,
    effort: 0.05,
};

/// Objective terms of one trajectory, each on a 0–100 scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectiveTerms {
    pub efficiency_pct: f64,
    /// Mean production relative to the ideal rate at the current limit.
    pub production_pct: f64,
    pub safety_pct: f64,
    pub stability: f64,
    pub effort: f64,
}

impl ObjectiveTerms {
    pub fn from_trajectory(
        model: &PredictionModel,
        trajectory: &PredictionTrajectory,
        nominal_current_a: f64,
    ) -> Self {
        let ideal = model.ideal_production_lph();
        let production_pct = if ideal > 0.0 {
            trajectory.mean_production() / ideal * 100.0
        } else {
            0.0
        };
        let controls = trajectory.controls();
        let effort = if controls.is_empty() {
            0.0
        } else {
            controls
                .iter()
                .map(|c| control_effort(c, nominal_current_a))
                .sum::<f64>()
                / controls.len() as f64
        };
        ObjectiveTerms {
            efficiency_pct: trajectory.mean_efficiency(),
            production_pct,
            safety_pct: trajectory.mean_safety_margin(),
            stability: stability_score(trajectory),
            effort,
        }
    }

    pub fn weighted(&self, w: &FitnessWeights) -> f64 {
        w.efficiency * self.efficiency_pct
            + w.production * self.production_pct
            + w.safety * self.safety_pct
            + w.stability * self.stability
            - w.effort * self.effort
    }
}

/// Inverse variance of predicted efficiency, mapped to (0, 100].
pub fn stability_score(trajectory: &PredictionTrajectory) -> f64 {
    100.0 / (1.0 + trajectory.efficiency_variance())
}

/// Deviation from the nominal current as a percentage of the current span.
pub fn control_effort(action: &ControlAction, nominal_current_a: f64) -> f64 {
    (action.current_a - nominal_current_a).abs() / (CURRENT_MAX_A - CURRENT_MIN_A) * 100.0
}

/// HE-NMPC fitness of a trajectory.
pub fn fitness(
    model: &PredictionModel,
    trajectory: &PredictionTrajectory,
    nominal_current_a: f64,
) -> f64 {
    ObjectiveTerms::from_trajectory(model, trajectory, nominal_current_a).weighted(&FITNESS_WEIGHTS)
}

/// Mixed-controller score of a trajectory.
pub fn mixed_score(
    model: &PredictionModel,
    trajectory: &PredictionTrajectory,
    nominal_current_a: f64,
) -> f64 {
    ObjectiveTerms::from_trajectory(model, trajectory, nominal_current_a).weighted(&MIXED_WEIGHTS)
}

/// Predict `action` from `state` over `horizon` steps and return its fitness.
pub fn evaluate_fitness(
    model: &PredictionModel,
    state: &SystemState,
    action: &ControlAction,
    horizon: usize,
    nominal_current_a: f64,
) -> ElyzerResult<f64> {
    let trajectory = model.predict(state, action, horizon)?;
    Ok(fitness(model, &trajectory, nominal_current_a))
}
