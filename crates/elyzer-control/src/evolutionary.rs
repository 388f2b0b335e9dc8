// ─────────────────────────────────────────────────────────────────────
// Elyzer Control Core — HE-NMPC
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Hybrid evolutionary nonlinear model-predictive controller.
//!
//! Population search over constant (current, voltage) actions. Each
//! candidate is rolled out over the prediction horizon and scored with
//! the shared fitness. Truncation selection keeps the top half unchanged,
//! blend crossover and bounded mutation refill the population. The
//! generator is seeded per call, so identical inputs give identical
//! actions.

use crate::controller::Controller;
use elyzer_core::model::PredictionModel;
use elyzer_core::objective::fitness;
use elyzer_types::config::EvolutionConfig;
use elyzer_types::constants::{NOMINAL_CURRENT_A, NOMINAL_VOLTAGE_V};
use elyzer_types::error::{ElyzerError, ElyzerResult};
use elyzer_types::state::{ControlAction, SystemState};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::debug;

pub const NAME: &str = "he_nmpc";

/// Adaptive seed references.
const ADAPTIVE_TARGET_EFFICIENCY: f64 = 80.0;
const ADAPTIVE_TARGET_TEMPERATURE: f64 = 65.0;

/// Fixed library of seed strategies used to build generation 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedStrategy {
    OptimalSetpoint,
    Hold,
    EfficiencyBoost,
    ProductionBoost,
    Cooling,
    Heating,
    Adaptive,
}

impl SeedStrategy {
    pub const LIBRARY: [SeedStrategy; 7] = [
        SeedStrategy::OptimalSetpoint,
        SeedStrategy::Hold,
        SeedStrategy::EfficiencyBoost,
        SeedStrategy::ProductionBoost,
        SeedStrategy::Cooling,
        SeedStrategy::Heating,
        SeedStrategy::Adaptive,
    ];

    pub fn action(&self, state: &SystemState) -> ControlAction {
        let (i, v) = (state.current_a, state.voltage_v);
        match self {
            SeedStrategy::OptimalSetpoint => {
                ControlAction::clamped(NOMINAL_CURRENT_A, NOMINAL_VOLTAGE_V)
            }
            SeedStrategy::Hold => ControlAction::clamped(i, v),
            SeedStrategy::EfficiencyBoost => ControlAction::clamped(i * 0.9, v - 0.05),
            SeedStrategy::ProductionBoost => ControlAction::clamped(i * 1.1, v + 0.05),
            SeedStrategy::Cooling => ControlAction::clamped(i - 20.0, v - 0.1),
            SeedStrategy::Heating => ControlAction::clamped(i + 10.0, v + 0.1),
            SeedStrategy::Adaptive => {
                // Low efficiency → less current; cold stack → more drive
                let eff_err = ADAPTIVE_TARGET_EFFICIENCY - state.efficiency_pct;
                let temp_err = ADAPTIVE_TARGET_TEMPERATURE - state.stack_temperature_c;
                ControlAction::clamped(i - eff_err + 0.5 * temp_err, v + 0.01 * temp_err)
            }
        }
    }
}

/// Scored individual. Failed evaluations carry `f64::NEG_INFINITY`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub action: ControlAction,
    pub fitness: f64,
}

impl Candidate {
    pub fn is_viable(&self) -> bool {
        self.fitness.is_finite()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationStats {
    pub generation: usize,
    pub population_size: usize,
    pub best_fitness: f64,
    pub mean_fitness: f64,
    pub failed_evaluations: usize,
}

#[derive(Debug, Clone)]
pub struct EvolutionOutcome {
    pub best: Candidate,
    pub generations: Vec<GenerationStats>,
}

pub struct HeNmpcController {
    model: Arc<PredictionModel>,
    config: EvolutionConfig,
}

impl HeNmpcController {
    pub fn new(model: Arc<PredictionModel>, config: EvolutionConfig) -> ElyzerResult<Self> {
        config.validate()?;
        Ok(Self { model, config })
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    /// Generation 0: the seed library, truncated or padded with mutated
    /// replicas up to the population size.
    pub fn initial_population(
        &self,
        state: &SystemState,
        rng: &mut StdRng,
    ) -> Vec<ControlAction> {
        let p = self.config.population_size;
        let library = SeedStrategy::LIBRARY;
        (0..p)
            .map(|k| {
                let seed = library[k % library.len()].action(state);
                if k < library.len() {
                    seed
                } else {
                    self.perturb(&seed, rng)
                }
            })
            .collect()
    }

    /// Shared fitness of one action over the horizon.
    pub fn evaluate(&self, state: &SystemState, action: &ControlAction) -> ElyzerResult<f64> {
        let trajectory = self.model.predict(state, action, self.config.horizon)?;
        Ok(fitness(
            &self.model,
            &trajectory,
            self.config.nominal_current_a,
        ))
    }

    fn evaluate_population(
        &self,
        state: &SystemState,
        population: &[ControlAction],
    ) -> Vec<Candidate> {
        population
            .par_iter()
            .map(|action| {
                let fitness = match self.evaluate(state, action) {
                    Ok(f) if f.is_finite() => f,
                    _ => f64::NEG_INFINITY,
                };
                Candidate {
                    action: *action,
                    fitness,
                }
            })
            .collect()
    }

    /// Truncation selection: the top half of the viable candidates.
    fn select(&self, mut evaluated: Vec<Candidate>) -> Vec<Candidate> {
        let keep = self.config.population_size.div_ceil(2);
        evaluated.retain(Candidate::is_viable);
        evaluated.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
        evaluated.truncate(keep);
        evaluated
    }

    fn tournament<'a>(&self, survivors: &'a [Candidate], rng: &mut StdRng) -> &'a Candidate {
        let a = &survivors[rng.gen_range(0..survivors.len())];
        let b = &survivors[rng.gen_range(0..survivors.len())];
        if b.fitness > a.fitness {
            b
        } else {
            a
        }
    }

    /// Bounded uniform perturbation, clamped to the envelope.
    fn perturb(&self, action: &ControlAction, rng: &mut StdRng) -> ControlAction {
        let dc = self.config.mutation_current_a;
        let dv = self.config.mutation_voltage_v;
        ControlAction::clamped(
            action.current_a + rng.gen_range(-dc..=dc),
            action.voltage_v + rng.gen_range(-dv..=dv),
        )
    }

    /// Survivors carry over; children refill to the population size.
    fn reproduce(&self, survivors: &[Candidate], rng: &mut StdRng) -> Vec<ControlAction> {
        let p = self.config.population_size;
        let mut next: Vec<ControlAction> = survivors.iter().map(|c| c.action).collect();
        while next.len() < p {
            let p1 = self.tournament(survivors, rng);
            let p2 = self.tournament(survivors, rng);
            let child = p1.action.blend(&p2.action, self.config.crossover_alpha).clamp();
            let child = if rng.gen_bool(self.config.mutation_probability) {
                self.perturb(&child, rng)
            } else {
                child
            };
            next.push(child);
        }
        next
    }

    /// Run Init → Generation(0..G-1) → Terminal.
    pub fn optimize(&self, state: &SystemState) -> ElyzerResult<EvolutionOutcome> {
        if !state.is_finite() {
            return Err(ElyzerError::computation(NAME, "non-finite state snapshot"));
        }
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut population = self.initial_population(state, &mut rng);
        let mut best: Option<Candidate> = None;
        let mut generations = Vec::with_capacity(self.config.generations);

        for generation in 0..self.config.generations {
            let evaluated = self.evaluate_population(state, &population);
            let failed = evaluated.iter().filter(|c| !c.is_viable()).count();
            let viable: Vec<f64> = evaluated
                .iter()
                .filter(|c| c.is_viable())
                .map(|c| c.fitness)
                .collect();
            let mean = if viable.is_empty() {
                f64::NEG_INFINITY
            } else {
                viable.iter().sum::<f64>() / viable.len() as f64
            };

            let survivors = self.select(evaluated);
            let Some(leader) = survivors.first().copied() else {
                return Err(ElyzerError::computation(
                    NAME,
                    format!("no viable candidate in generation {generation}"),
                ));
            };
            if best.map_or(true, |b| leader.fitness > b.fitness) {
                best = Some(leader);
            }

            generations.push(GenerationStats {
                generation,
                population_size: population.len(),
                best_fitness: leader.fitness,
                mean_fitness: mean,
                failed_evaluations: failed,
            });
            debug!(
                controller = NAME,
                generation,
                best_fitness = leader.fitness,
                mean_fitness = mean,
                failed,
                "generation evaluated"
            );

            if generation + 1 < self.config.generations {
                population = self.reproduce(&survivors, &mut rng);
            }
        }

        let best = best.ok_or_else(|| ElyzerError::computation(NAME, "no generation ran"))?;
        Ok(EvolutionOutcome {
            best: Candidate {
                action: best.action.clamp(),
                fitness: best.fitness,
            },
            generations,
        })
    }
}

impl Controller for HeNmpcController {
    fn name(&self) -> &str {
        NAME
    }

    fn compute_control(&self, state: &SystemState) -> ElyzerResult<ControlAction> {
        Ok(self.optimize(state)?.best.action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elyzer_core::baseline;

    fn controller() -> HeNmpcController {
        HeNmpcController::new(
            Arc::new(PredictionModel::default()),
            EvolutionConfig::default(),
        )
        .expect("valid config")
    }

    #[test]
    fn test_seed_library_in_envelope() {
        let state = SystemState::default();
        for seed in SeedStrategy::LIBRARY {
            let a = seed.action(&state);
            assert!(a.is_within_bounds(), "{seed:?} → {a:?}");
        }
    }

    #[test]
    fn test_initial_population_padded_to_size() {
        let ctrl = controller();
        let mut rng = StdRng::seed_from_u64(1);
        let pop = ctrl.initial_population(&SystemState::default(), &mut rng);
        assert_eq!(pop.len(), ctrl.config().population_size);
        assert_eq!(pop[0], ControlAction::clamped(150.0, 2.1));
        assert!(pop.iter().all(|a| a.is_within_bounds()));
    }

    #[test]
    fn test_initial_population_truncated() {
        let cfg = EvolutionConfig {
            population_size: 3,
            ..EvolutionConfig::default()
        };
        let ctrl = HeNmpcController::new(Arc::new(PredictionModel::default()), cfg).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let pop = ctrl.initial_population(&SystemState::default(), &mut rng);
        assert_eq!(pop.len(), 3);
    }

    #[test]
    fn test_population_size_invariant() {
        let ctrl = controller();
        let outcome = ctrl.optimize(&SystemState::default()).unwrap();
        assert_eq!(outcome.generations.len(), ctrl.config().generations);
        for g in &outcome.generations {
            assert_eq!(g.population_size, ctrl.config().population_size);
        }
    }

    #[test]
    fn test_best_fitness_non_decreasing() {
        let outcome = controller().optimize(&SystemState::default()).unwrap();
        for w in outcome.generations.windows(2) {
            assert!(
                w[1].best_fitness >= w[0].best_fitness - 1e-12,
                "Elitism violated: {} → {}",
                w[0].best_fitness,
                w[1].best_fitness
            );
        }
    }

    #[test]
    fn test_deterministic_for_fixed_seed() {
        let ctrl = controller();
        let a = ctrl.compute_control(&SystemState::default()).unwrap();
        let b = ctrl.compute_control(&SystemState::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_not_worse_than_optimal_setpoint() {
        let ctrl = controller();
        let state = SystemState::default();
        let outcome = ctrl.optimize(&state).unwrap();
        let model = PredictionModel::default();
        let base = baseline::evaluate(&model, &state, ctrl.config().horizon, 150.0).unwrap();
        assert!(
            outcome.best.fitness >= base,
            "HE-NMPC {} < baseline {}",
            outcome.best.fitness,
            base
        );
    }

    #[test]
    fn test_failed_evaluation_scores_neg_infinity_and_is_dropped() {
        let ctrl = controller();
        let nominal = ControlAction::clamped(150.0, 2.1);
        let broken = ControlAction {
            current_a: f64::NAN,
            voltage_v: 2.1,
        };
        let evaluated = ctrl.evaluate_population(&SystemState::default(), &[broken, nominal]);
        assert_eq!(evaluated.len(), 2);
        assert_eq!(evaluated[0].fitness, f64::NEG_INFINITY);
        assert!(!evaluated[0].is_viable());
        assert!(evaluated[1].is_viable());

        let survivors = ctrl.select(evaluated);
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].action, nominal);
    }

    #[test]
    fn test_non_finite_state_rejected() {
        let state = SystemState {
            stack_temperature_c: f64::INFINITY,
            ..SystemState::default()
        };
        assert!(controller().compute_control(&state).is_err());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let cfg = EvolutionConfig {
            mutation_probability: 1.5,
            ..EvolutionConfig::default()
        };
        assert!(HeNmpcController::new(Arc::new(PredictionModel::default()), cfg).is_err());
    }
}
