// ─────────────────────────────────────────────────────────────────────
// Elyzer Control Core — Comparison Harness Integration Tests
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! End-to-end behaviour of one comparison cycle: isolation of failing
//! and slow controllers, constraint flags, ranking, debouncing and the
//! telemetry loop.

use elyzer_control::harness::{ComparisonHarness, HarnessPhase};
use elyzer_control::Controller;
use elyzer_core::baseline;
use elyzer_core::model::PredictionModel;
use elyzer_types::config::{ControlSuiteConfig, HarnessConfig};
use elyzer_types::error::{ElyzerError, ElyzerResult};
use elyzer_types::state::{ConstraintViolation, ControlAction, ResultStatus, SystemState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

// ── Test controllers ─────────────────────────────────────────────────

struct Fixed {
    name: &'static str,
    action: ControlAction,
}

impl Controller for Fixed {
    fn name(&self) -> &str {
        self.name
    }

    fn compute_control(&self, _state: &SystemState) -> ElyzerResult<ControlAction> {
        Ok(self.action)
    }
}

struct Failing;

impl Controller for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    fn compute_control(&self, _state: &SystemState) -> ElyzerResult<ControlAction> {
        Err(ElyzerError::computation("failing", "solver diverged"))
    }
}

struct Panicking;

impl Controller for Panicking {
    fn name(&self) -> &str {
        "panicking"
    }

    fn compute_control(&self, _state: &SystemState) -> ElyzerResult<ControlAction> {
        panic!("index out of bounds");
    }
}

/// Answers immediately on the first call, then stalls past any budget.
struct Stalling {
    calls: AtomicUsize,
    first: ControlAction,
    stall: Duration,
}

impl Controller for Stalling {
    fn name(&self) -> &str {
        "stalling"
    }

    fn compute_control(&self, _state: &SystemState) -> ElyzerResult<ControlAction> {
        if self.calls.fetch_add(1, Ordering::SeqCst) > 0 {
            std::thread::sleep(self.stall);
        }
        Ok(self.first)
    }
}

fn fixed(name: &'static str, current_a: f64, voltage_v: f64) -> Arc<dyn Controller> {
    Arc::new(Fixed {
        name,
        action: ControlAction {
            current_a,
            voltage_v,
        },
    })
}

fn harness(controllers: Vec<Arc<dyn Controller>>, config: HarnessConfig) -> ComparisonHarness {
    ComparisonHarness::new(Arc::new(PredictionModel::default()), controllers, config)
        .expect("valid harness")
}

fn fast_config() -> HarnessConfig {
    HarnessConfig {
        cadence_ms: 0,
        controller_timeout_ms: 1_000,
        ..HarnessConfig::default()
    }
}

// ── Fan-out / fan-in ─────────────────────────────────────────────────

#[tokio::test]
async fn test_one_result_per_controller_in_order() {
    let mut h = harness(
        vec![
            fixed("a", 150.0, 2.1),
            Arc::new(Failing),
            fixed("b", 140.0, 2.0),
        ],
        fast_config(),
    );
    let p = h.compute_all(&SystemState::default()).await;
    let names: Vec<&str> = p
        .snapshot
        .results
        .iter()
        .map(|r| r.controller_name.as_str())
        .collect();
    assert_eq!(names, vec!["a", "failing", "b"]);
    assert_eq!(h.phase(), HarnessPhase::Idle);
}

#[tokio::test]
async fn test_phase_observable_during_cycle() {
    let slow: Arc<dyn Controller> = Arc::new(Stalling {
        calls: AtomicUsize::new(1),
        first: ControlAction::clamped(150.0, 2.1),
        stall: Duration::from_millis(50),
    });
    let mut h = harness(vec![slow], fast_config());
    let mut phases = h.subscribe_phase();
    assert_eq!(*phases.borrow(), HarnessPhase::Idle);

    let observer = tokio::spawn(async move {
        let mut seen = Vec::new();
        while phases.changed().await.is_ok() {
            let phase = *phases.borrow_and_update();
            seen.push(phase);
            if phase == HarnessPhase::Idle {
                break;
            }
        }
        seen
    });
    h.compute_all(&SystemState::default()).await;
    let seen = observer.await.unwrap();

    assert_eq!(seen.first(), Some(&HarnessPhase::Computing));
    assert_eq!(seen.last(), Some(&HarnessPhase::Idle));
    assert_eq!(h.phase(), HarnessPhase::Idle);
}

#[tokio::test]
async fn test_failure_is_isolated_and_degrades() {
    let mut h = harness(
        vec![Arc::new(Failing), fixed("steady", 150.0, 2.1)],
        fast_config(),
    );
    let state = SystemState::default();
    let p = h.compute_all(&state).await;

    let failed = p.snapshot.get("failing").unwrap();
    assert!(matches!(failed.status, ResultStatus::Failed { .. }));
    // No last known-good yet → hold the measured action
    assert_eq!(failed.control_action, state.applied_action());

    assert_eq!(p.snapshot.best_performer.as_deref(), Some("steady"));
    assert!(p.degraded);
    assert!(p.snapshot.degraded);
    assert_eq!(p.recommended, ControlAction::clamped(150.0, 2.1));
}

#[tokio::test]
async fn test_panic_is_reported_as_failure() {
    let mut h = harness(
        vec![Arc::new(Panicking), fixed("steady", 150.0, 2.1)],
        fast_config(),
    );
    let p = h.compute_all(&SystemState::default()).await;
    match &p.snapshot.get("panicking").unwrap().status {
        ResultStatus::Failed { message } => assert!(message.contains("panicked"), "{message}"),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(p.snapshot.len(), 2);
    assert_eq!(p.snapshot.best_performer.as_deref(), Some("steady"));
}

#[tokio::test]
async fn test_all_failing_publishes_degraded_hold() {
    let mut h = harness(vec![Arc::new(Failing)], fast_config());
    let state = SystemState {
        current_a: 130.0,
        voltage_v: 2.0,
        ..SystemState::default()
    };
    let p = h.compute_all(&state).await;
    assert!(p.snapshot.best_performer.is_none());
    assert!(p.degraded);
    assert_eq!(p.recommended, ControlAction::clamped(130.0, 2.0));
}

// ── Timeouts ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_timeout_falls_back_to_last_known_good() {
    let stalling = Arc::new(Stalling {
        calls: AtomicUsize::new(0),
        first: ControlAction::clamped(170.0, 2.2),
        stall: Duration::from_millis(400),
    });
    let cfg = HarnessConfig {
        cadence_ms: 0,
        controller_timeout_ms: 50,
        ..HarnessConfig::default()
    };
    let mut h = harness(vec![stalling, fixed("steady", 150.0, 2.1)], cfg);
    let state = SystemState::default();

    let first = h.compute_all(&state).await;
    assert!(first.snapshot.get("stalling").unwrap().status.is_ok());
    assert!(!first.degraded);

    let started = Instant::now();
    let second = h.compute_all(&state).await;
    assert!(started.elapsed() < Duration::from_millis(400));

    let r = second.snapshot.get("stalling").unwrap();
    assert_eq!(r.status, ResultStatus::TimedOut { budget_ms: 50 });
    assert_eq!(r.control_action, ControlAction::clamped(170.0, 2.2));
    assert!(second.degraded);
    assert_eq!(second.snapshot.best_performer.as_deref(), Some("steady"));
}

#[tokio::test]
async fn test_timeout_without_history_holds_measured_action() {
    let stalling = Arc::new(Stalling {
        calls: AtomicUsize::new(1),
        first: ControlAction::clamped(170.0, 2.2),
        stall: Duration::from_millis(300),
    });
    let cfg = HarnessConfig {
        cadence_ms: 0,
        controller_timeout_ms: 30,
        ..HarnessConfig::default()
    };
    let mut h = harness(vec![stalling], cfg);
    let state = SystemState::default();
    let p = h.compute_all(&state).await;
    let r = p.snapshot.get("stalling").unwrap();
    assert!(matches!(r.status, ResultStatus::TimedOut { .. }));
    assert_eq!(r.control_action, state.applied_action());
    assert_eq!(p.recommended, state.applied_action());
    assert!(p.degraded);
}

// ── Constraints & ranking ────────────────────────────────────────────

#[tokio::test]
async fn test_hot_stack_flags_temperature() {
    let mut h = harness(vec![fixed("aggressive", 200.0, 2.4)], fast_config());
    let state = SystemState {
        stack_temperature_c: 79.5,
        ..SystemState::default()
    };
    let p = h.compute_all(&state).await;
    let r = p.snapshot.get("aggressive").unwrap();
    assert!(r.has_violation(ConstraintViolation::TemperatureTooHigh));
    // Flag only: the result still competes
    assert!(r.status.is_ok());
}

#[tokio::test]
async fn test_nominal_action_has_no_violations() {
    let mut h = harness(vec![fixed("nominal", 150.0, 2.1)], fast_config());
    let p = h.compute_all(&SystemState::default()).await;
    assert!(p.snapshot.results[0].constraint_violations.is_empty());
}

#[tokio::test]
async fn test_out_of_range_action_flagged_and_recommendation_clamped() {
    let mut h = harness(vec![fixed("rogue", 250.0, 3.0)], fast_config());
    let p = h.compute_all(&SystemState::default()).await;
    let r = p.snapshot.get("rogue").unwrap();
    assert!(r.has_violation(ConstraintViolation::CurrentOutOfRange));
    assert!(r.has_violation(ConstraintViolation::VoltageOutOfRange));
    assert!(p.recommended.is_within_bounds());
}

#[tokio::test]
async fn test_tie_goes_to_first_registered() {
    let mut h = harness(
        vec![fixed("first", 150.0, 2.1), fixed("second", 150.0, 2.1)],
        fast_config(),
    );
    let p = h.compute_all(&SystemState::default()).await;
    assert_eq!(p.snapshot.results[0].score(), p.snapshot.results[1].score());
    assert_eq!(p.snapshot.best_performer.as_deref(), Some("first"));
}

#[tokio::test]
async fn test_metrics_populated() {
    let mut h = harness(vec![fixed("nominal", 150.0, 2.1)], fast_config());
    let p = h.compute_all(&SystemState::default()).await;
    let m = p.snapshot.results[0].performance_metrics;
    assert!(m.efficiency_pct >= 60.0 && m.efficiency_pct <= 95.0);
    assert!(m.production_lph > 0.0);
    assert!(m.stability > 0.0 && m.stability <= 100.0);
    // 150 A · 2.1 V = 0.315 kW at 0.12 per kWh
    assert!((m.cost_per_hour - 0.315 * 0.12).abs() < 1e-9);
    assert!(m.score.is_finite());
}

// ── Debounce & history ───────────────────────────────────────────────

#[tokio::test]
async fn test_debounce_drops_early_states() {
    let cfg = HarnessConfig {
        cadence_ms: 15_000,
        ..HarnessConfig::default()
    };
    let mut h = harness(vec![fixed("a", 150.0, 2.1)], cfg);
    let state = SystemState::default();
    let t0 = Instant::now();

    assert!(h.on_state_at(state, t0).await.is_some());
    assert!(h
        .on_state_at(state, t0 + Duration::from_secs(5))
        .await
        .is_none());
    assert!(h
        .on_state_at(state, t0 + Duration::from_secs(14))
        .await
        .is_none());
    assert!(h
        .on_state_at(state, t0 + Duration::from_secs(15))
        .await
        .is_some());
    assert_eq!(h.history().len(), 2);
}

#[tokio::test]
async fn test_history_bounded() {
    let cfg = HarnessConfig {
        history_capacity: 3,
        ..fast_config()
    };
    let mut h = harness(vec![fixed("a", 150.0, 2.1)], cfg);
    for _ in 0..5 {
        h.compute_all(&SystemState::default()).await;
    }
    assert_eq!(h.history().len(), 3);
    assert_eq!(h.history().latest().map(|s| s.cycle), Some(5));
    assert_eq!(h.history().win_counts().get("a"), Some(&3));
}

#[tokio::test]
async fn test_run_publishes_each_state() {
    let mut h = harness(vec![fixed("a", 150.0, 2.1)], fast_config());
    let (tx, mut rx) = mpsc::channel(8);
    for t in [64.0, 65.0, 66.0] {
        tx.send(SystemState {
            stack_temperature_c: t,
            ..SystemState::default()
        })
        .await
        .unwrap();
    }
    drop(tx);

    let mut sink = Vec::new();
    let published = h.run(&mut rx, &mut sink).await;
    assert_eq!(published, 3);
    let cycles: Vec<u64> = sink.iter().map(|p| p.snapshot.cycle).collect();
    assert_eq!(cycles, vec![1, 2, 3]);
}

// ── Standard suite ───────────────────────────────────────────────────

#[tokio::test]
async fn test_standard_suite_end_to_end() {
    let config = ControlSuiteConfig::default();
    let mut h = ComparisonHarness::standard(&config).unwrap();
    let state = SystemState {
        current_a: 150.0,
        voltage_v: 2.1,
        efficiency_pct: 75.0,
        o2_production_lph: 40.0,
        stack_temperature_c: 65.0,
        safety_margin_pct: 90.0,
        ..SystemState::default()
    };
    let p = h.compute_all(&state).await;

    assert_eq!(p.snapshot.len(), 4);
    for r in &p.snapshot.results {
        assert!(r.status.is_ok(), "{} → {:?}", r.controller_name, r.status);
        assert!(
            (100.0..=200.0).contains(&r.control_action.current_a),
            "{} current {}",
            r.controller_name,
            r.control_action.current_a
        );
        assert!((1.8..=2.4).contains(&r.control_action.voltage_v));
    }

    let baseline_fitness = baseline::evaluate(
        h.model(),
        &state,
        config.harness.evaluation_horizon,
        config.harness.nominal_current_a,
    )
    .unwrap();
    let he = p.snapshot.get("he_nmpc").unwrap();
    assert!(
        he.score() >= baseline_fitness,
        "he_nmpc {} < baseline {}",
        he.score(),
        baseline_fitness
    );
    assert!(p.snapshot.best_performer.is_some());
    assert!(!p.degraded);
}
