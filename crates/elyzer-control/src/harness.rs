// ─────────────────────────────────────────────────────────────────────
// Elyzer Control Core — Comparison Harness
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Side-by-side comparison of the registered controllers.
//!
//! One cycle:
//! 1. Freeze the incoming state snapshot.
//! 2. Fan out: every controller runs on a blocking worker under its own
//!    time budget.
//! 3. Fan in: each outcome becomes exactly one `ControllerResult`
//!    (`Ok`, `Failed` or `TimedOut`, the latter two with a fallback action).
//! 4. Score every action under the shared model and flag constraint
//!    violations.
//! 5. Pick the best performer, publish, append to the history.
//!
//! States that arrive faster than the cadence are dropped, not queued.

use crate::constraints::OperatingEnvelope;
use crate::controller::Controller;
use crate::evolutionary::HeNmpcController;
use crate::history::ComparisonHistory;
use crate::mixed::MixedIntegerController;
use crate::quadratic::QuadraticTrackingController;
use crate::scenario::ScenarioRobustController;
use crate::sink::ComparisonSink;
use chrono::Utc;
use elyzer_core::model::PredictionModel;
use elyzer_core::objective::{fitness, stability_score};
use elyzer_types::config::{ControlSuiteConfig, HarnessConfig};
use elyzer_types::error::{ElyzerError, ElyzerResult};
use elyzer_types::state::{
    ComparisonSnapshot, ConstraintViolation, ControlAction, ControllerResult, PerformanceMetrics,
    Publication, ResultStatus, SystemState,
};
use futures::future::join_all;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinError;
use tracing::{debug, info, warn};

/// Cycle phase, broadcast on a watch channel while a cycle runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessPhase {
    Idle,
    Computing,
    Published,
}

/// Raw result of one controller task before scoring.
enum Outcome {
    Computed {
        action: ControlAction,
        elapsed: Duration,
    },
    Failed {
        message: String,
        elapsed: Duration,
    },
    TimedOut,
}

pub struct ComparisonHarness {
    model: Arc<PredictionModel>,
    controllers: Vec<Arc<dyn Controller>>,
    config: HarnessConfig,
    envelope: OperatingEnvelope,
    history: ComparisonHistory,
    last_good: HashMap<String, ControlAction>,
    last_cycle_at: Option<Instant>,
    cycle: u64,
    phase: watch::Sender<HarnessPhase>,
}

impl ComparisonHarness {
    /// Controllers are compared in registration order; names must be unique.
    pub fn new(
        model: Arc<PredictionModel>,
        controllers: Vec<Arc<dyn Controller>>,
        config: HarnessConfig,
    ) -> ElyzerResult<Self> {
        config.validate()?;
        if controllers.is_empty() {
            return Err(ElyzerError::ConfigError(
                "harness requires at least one controller".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for c in &controllers {
            if !seen.insert(c.name().to_string()) {
                return Err(ElyzerError::ConfigError(format!(
                    "duplicate controller name '{}'",
                    c.name()
                )));
            }
        }
        Ok(Self {
            envelope: OperatingEnvelope::with_temperature_limit(config.temperature_limit_c),
            history: ComparisonHistory::new(config.history_capacity),
            model,
            controllers,
            config,
            last_good: HashMap::new(),
            last_cycle_at: None,
            cycle: 0,
            phase: watch::Sender::new(HarnessPhase::Idle),
        })
    }

    /// The four standard controllers sharing one model:
    /// he_nmpc, quadratic_tracking, scenario_robust, mixed_integer.
    pub fn standard(config: &ControlSuiteConfig) -> ElyzerResult<Self> {
        config.validate()?;
        let model = Arc::new(PredictionModel::new(config.model.clone())?);
        let controllers: Vec<Arc<dyn Controller>> = vec![
            Arc::new(HeNmpcController::new(
                Arc::clone(&model),
                config.evolution.clone(),
            )?),
            Arc::new(QuadraticTrackingController::new(config.tracking.clone())?),
            Arc::new(ScenarioRobustController::new(
                Arc::clone(&model),
                config.scenario.clone(),
            )?),
            Arc::new(MixedIntegerController::new(
                Arc::clone(&model),
                config.mixed.clone(),
            )?),
        ];
        Self::new(model, controllers, config.harness.clone())
    }

    pub fn controller_names(&self) -> Vec<&str> {
        self.controllers.iter().map(|c| c.name()).collect()
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn model(&self) -> &PredictionModel {
        &self.model
    }

    pub fn history(&self) -> &ComparisonHistory {
        &self.history
    }

    /// Reads `Idle` between cycles; observers that need `Computing` and
    /// `Published` subscribe with [`Self::subscribe_phase`].
    pub fn phase(&self) -> HarnessPhase {
        *self.phase.borrow()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<HarnessPhase> {
        self.phase.subscribe()
    }

    pub fn last_good_action(&self, controller_name: &str) -> Option<ControlAction> {
        self.last_good.get(controller_name).copied()
    }

    /// Whether a state arriving at `now` would start a cycle.
    pub fn should_compute(&self, now: Instant) -> bool {
        match self.last_cycle_at {
            None => true,
            Some(last) => {
                let cadence = Duration::from_millis(self.config.cadence_ms);
                now.saturating_duration_since(last) >= cadence
            }
        }
    }

    pub async fn on_state(&mut self, state: SystemState) -> Option<Publication> {
        self.on_state_at(state, Instant::now()).await
    }

    /// Debounced entry point with an explicit arrival time.
    pub async fn on_state_at(
        &mut self,
        state: SystemState,
        now: Instant,
    ) -> Option<Publication> {
        if !self.should_compute(now) {
            debug!(cadence_ms = self.config.cadence_ms, "state debounced");
            return None;
        }
        self.last_cycle_at = Some(now);
        Some(self.compute_all(&state).await)
    }

    /// Run one comparison cycle unconditionally.
    pub async fn compute_all(&mut self, state: &SystemState) -> Publication {
        self.phase.send_replace(HarnessPhase::Computing);
        self.cycle += 1;
        let snapshot_state = *state;
        let budget = Duration::from_millis(self.config.controller_timeout_ms);

        let tasks = self.controllers.iter().map(|controller| {
            let controller = Arc::clone(controller);
            async move {
                let handle = tokio::task::spawn_blocking(move || {
                    let started = Instant::now();
                    let result = controller.compute_control(&snapshot_state);
                    (result, started.elapsed())
                });
                let joined_at = Instant::now();
                match tokio::time::timeout(budget, handle).await {
                    Ok(Ok((Ok(action), elapsed))) => Outcome::Computed { action, elapsed },
                    Ok(Ok((Err(e), elapsed))) => Outcome::Failed {
                        message: e.to_string(),
                        elapsed,
                    },
                    Ok(Err(join_error)) => Outcome::Failed {
                        message: panic_message(join_error),
                        elapsed: joined_at.elapsed(),
                    },
                    // The blocking task is abandoned and finishes on its own
                    Err(_) => Outcome::TimedOut,
                }
            }
        });
        let outcomes = join_all(tasks).await;

        let hold = state.applied_action();
        let mut results = Vec::with_capacity(outcomes.len());
        for (controller, outcome) in self.controllers.iter().zip(outcomes) {
            let name = controller.name().to_string();
            let fallback = self.last_good.get(&name).copied().unwrap_or(hold);
            let (action, status, elapsed) = match outcome {
                Outcome::Computed { action, elapsed } => {
                    self.last_good.insert(name.clone(), action.clamp());
                    (action, ResultStatus::Ok, elapsed)
                }
                Outcome::Failed { message, elapsed } => {
                    warn!(
                        controller = %name,
                        error = %message,
                        "controller failed; using fallback"
                    );
                    (fallback, ResultStatus::Failed { message }, elapsed)
                }
                Outcome::TimedOut => {
                    let budget_ms = self.config.controller_timeout_ms;
                    let timeout = ElyzerError::OrchestrationTimeout {
                        controller: name.clone(),
                        budget_ms,
                    };
                    warn!(controller = %name, error = %timeout, "using fallback");
                    (fallback, ResultStatus::TimedOut { budget_ms }, budget)
                }
            };
            results.push(self.assess(name, action, status, elapsed, state));
        }

        let best_performer = select_best(&results).map(|r| r.controller_name.clone());
        let degraded = best_performer.is_none() || results.iter().any(|r| !r.status.is_ok());
        let recommended = results
            .iter()
            .find(|r| Some(&r.controller_name) == best_performer.as_ref())
            .or_else(|| results.iter().find(|r| !r.status.is_ok()))
            .map(|r| r.control_action.clamp())
            .unwrap_or(hold);

        let snapshot = ComparisonSnapshot {
            cycle: self.cycle,
            cycle_timestamp: Utc::now(),
            results,
            best_performer,
            degraded,
        };
        info!(
            cycle = snapshot.cycle,
            best = snapshot.best_performer.as_deref().unwrap_or("none"),
            degraded,
            current_a = recommended.current_a,
            voltage_v = recommended.voltage_v,
            "comparison published"
        );

        self.phase.send_replace(HarnessPhase::Published);
        self.history.push(snapshot.clone());
        self.phase.send_replace(HarnessPhase::Idle);
        Publication {
            snapshot,
            recommended,
            degraded,
        }
    }

    /// Score `action` under the shared model and flag its violations.
    fn assess(
        &self,
        controller_name: String,
        action: ControlAction,
        status: ResultStatus,
        elapsed: Duration,
        state: &SystemState,
    ) -> ControllerResult {
        let response_time_ms = elapsed.as_secs_f64() * 1e3;
        let (performance_metrics, constraint_violations) =
            match self
                .model
                .predict(state, &action, self.config.evaluation_horizon)
            {
                Ok(trajectory) => {
                    let score = fitness(&self.model, &trajectory, self.config.nominal_current_a);
                    let metrics = PerformanceMetrics {
                        efficiency_pct: trajectory.mean_efficiency(),
                        production_lph: trajectory.mean_production(),
                        response_time_ms,
                        stability: stability_score(&trajectory),
                        cost_per_hour: action.power_kw() * state.economic_setpoint,
                        score: if score.is_finite() {
                            score
                        } else {
                            f64::NEG_INFINITY
                        },
                    };
                    (metrics, self.envelope.check(&action, Some(&trajectory)))
                }
                Err(e) => {
                    debug!(controller = %controller_name, error = %e, "action not evaluable");
                    (
                        PerformanceMetrics::unscored(response_time_ms),
                        self.envelope.check(&action, None),
                    )
                }
            };
        if !constraint_violations.is_empty() {
            debug!(
                controller = %controller_name,
                violations = ?violation_names(&constraint_violations),
                "constraint violations"
            );
        }
        ControllerResult {
            controller_name,
            control_action: action,
            performance_metrics,
            constraint_violations,
            status,
            computed_at: Utc::now(),
        }
    }

    /// Drive the harness from a telemetry channel until it closes.
    /// Returns the number of publications.
    pub async fn run<S: ComparisonSink>(
        &mut self,
        rx: &mut mpsc::Receiver<SystemState>,
        sink: &mut S,
    ) -> usize {
        let mut published = 0;
        while let Some(state) = rx.recv().await {
            if let Some(publication) = self.on_state(state).await {
                sink.publish(&publication);
                published += 1;
            }
        }
        info!(published, cycles = self.cycle, "telemetry closed");
        published
    }
}

/// Strictly highest finite score among `Ok` results; ties go to the
/// earliest registered controller.
pub fn select_best(results: &[ControllerResult]) -> Option<&ControllerResult> {
    let mut best: Option<&ControllerResult> = None;
    for r in results {
        if !r.status.is_ok() || !r.score().is_finite() {
            continue;
        }
        if best.map_or(true, |b| r.score() > b.score()) {
            best = Some(r);
        }
    }
    best
}

fn violation_names(violations: &BTreeSet<ConstraintViolation>) -> Vec<&'static str> {
    violations.iter().map(|v| v.as_str()).collect()
}

fn panic_message(error: JoinError) -> String {
    if !error.is_panic() {
        return format!("controller task cancelled: {error}");
    }
    let payload = error.into_panic();
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("controller panicked: {detail}")
}
