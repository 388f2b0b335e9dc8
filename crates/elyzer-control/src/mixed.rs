// ─────────────────────────────────────────────────────────────────────
// Elyzer Control Core — Mixed Discrete/Continuous Control
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Exhaustive search over discrete current levels × a voltage grid.
//!
//! Current takes values from a fixed set of plant levels; voltage is
//! sampled uniformly on its envelope. Every pair is predicted over a
//! short horizon and scored with the mixed objective. Ties go to the
//! pair enumerated first (current outer, voltage inner).

use crate::controller::Controller;
use elyzer_core::model::PredictionModel;
use elyzer_core::objective::mixed_score;
use elyzer_types::config::MixedConfig;
use elyzer_types::error::{ElyzerError, ElyzerResult};
use elyzer_types::state::{ControlAction, SystemState};
use ndarray::Array1;
use rayon::prelude::*;
use std::sync::Arc;
use tracing::debug;

pub const NAME: &str = "mixed_integer";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPoint {
    pub current_a: f64,
    pub voltage_v: f64,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MixedOutcome {
    pub best: GridPoint,
    /// Number of pairs predicted.
    pub evaluated: usize,
    /// Pairs whose prediction failed or scored non-finite.
    pub failed: usize,
}

pub struct MixedIntegerController {
    model: Arc<PredictionModel>,
    config: MixedConfig,
    voltage_grid: Array1<f64>,
}

impl MixedIntegerController {
    pub fn new(model: Arc<PredictionModel>, config: MixedConfig) -> ElyzerResult<Self> {
        config.validate()?;
        let voltage_grid = if config.voltage_points == 1 {
            Array1::from_elem(1, config.voltage_min_v)
        } else {
            Array1::linspace(
                config.voltage_min_v,
                config.voltage_max_v,
                config.voltage_points,
            )
        };
        Ok(Self {
            model,
            config,
            voltage_grid,
        })
    }

    pub fn current_levels(&self) -> &[f64] {
        &self.config.current_levels_a
    }

    pub fn voltage_grid(&self) -> &Array1<f64> {
        &self.voltage_grid
    }

    fn score_pair(&self, state: &SystemState, current_a: f64, voltage_v: f64) -> Option<f64> {
        let action = ControlAction::clamped(current_a, voltage_v);
        let trajectory = self.model.predict(state, &action, self.config.horizon).ok()?;
        let score = mixed_score(&self.model, &trajectory, self.config.nominal_current_a);
        score.is_finite().then_some(score)
    }

    pub fn search(&self, state: &SystemState) -> ElyzerResult<MixedOutcome> {
        if !state.is_finite() {
            return Err(ElyzerError::computation(NAME, "non-finite state snapshot"));
        }

        let pairs: Vec<(f64, f64)> = self
            .config
            .current_levels_a
            .iter()
            .flat_map(|&i| self.voltage_grid.iter().map(move |&v| (i, v)))
            .collect();

        // Indexed parallel map keeps enumeration order for tie-breaking
        let scored: Vec<Option<f64>> = pairs
            .par_iter()
            .map(|&(i, v)| self.score_pair(state, i, v))
            .collect();

        let mut best: Option<GridPoint> = None;
        let mut failed = 0;
        for (&(current_a, voltage_v), score) in pairs.iter().zip(&scored) {
            let Some(score) = *score else {
                failed += 1;
                continue;
            };
            if best.map_or(true, |b| score > b.score) {
                best = Some(GridPoint {
                    current_a,
                    voltage_v,
                    score,
                });
            }
        }

        let best = best.ok_or_else(|| {
            ElyzerError::computation(NAME, "no grid point produced a finite score")
        })?;
        Ok(MixedOutcome {
            best,
            evaluated: pairs.len(),
            failed,
        })
    }
}

impl Controller for MixedIntegerController {
    fn name(&self) -> &str {
        NAME
    }

    fn compute_control(&self, state: &SystemState) -> ElyzerResult<ControlAction> {
        let outcome = self.search(state)?;
        debug!(
            controller = NAME,
            current_a = outcome.best.current_a,
            voltage_v = outcome.best.voltage_v,
            score = outcome.best.score,
            evaluated = outcome.evaluated,
            failed = outcome.failed,
            "grid optimum"
        );
        Ok(ControlAction::clamped(
            outcome.best.current_a,
            outcome.best.voltage_v,
        ))
    }
}
