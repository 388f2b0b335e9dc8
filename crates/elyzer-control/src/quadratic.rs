// ─────────────────────────────────────────────────────────────────────
// Elyzer Control Core — Quadratic Tracking
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Single-shot quadratic-tracking controller.
//!
//! Proportional correction of current and voltage toward fixed
//! efficiency, production and temperature references. No iteration:
//! O(1) and deterministic for a given state.

use crate::controller::Controller;
use elyzer_types::config::TrackingConfig;
use elyzer_types::error::{ElyzerError, ElyzerResult};
use elyzer_types::state::{ControlAction, SystemState};
use tracing::debug;

pub const NAME: &str = "quadratic_tracking";

/// Reference errors, `target − measured`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackingErrors {
    pub efficiency: f64,
    pub production: f64,
    pub temperature: f64,
}

impl TrackingErrors {
    pub fn of(state: &SystemState, cfg: &TrackingConfig) -> Self {
        TrackingErrors {
            efficiency: cfg.target_efficiency_pct - state.efficiency_pct,
            production: cfg.target_production_lph - state.o2_production_lph,
            temperature: cfg.target_temperature_c - state.stack_temperature_c,
        }
    }
}

/// Tracking law shared with the scenario-robust controller.
/// Returns the clamped action.
pub fn tracking_action(state: &SystemState, cfg: &TrackingConfig) -> ControlAction {
    let e = TrackingErrors::of(state, cfg);
    let d_current =
        cfg.k_current_production * e.production + cfg.k_current_temperature * e.temperature;
    let d_voltage =
        cfg.k_voltage_efficiency * e.efficiency + cfg.k_voltage_temperature * e.temperature;
    ControlAction::clamped(state.current_a + d_current, state.voltage_v + d_voltage)
}

pub struct QuadraticTrackingController {
    config: TrackingConfig,
}

impl QuadraticTrackingController {
    pub fn new(config: TrackingConfig) -> ElyzerResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }
}

impl Controller for QuadraticTrackingController {
    fn name(&self) -> &str {
        NAME
    }

    fn compute_control(&self, state: &SystemState) -> ElyzerResult<ControlAction> {
        if !state.is_finite() {
            return Err(ElyzerError::computation(NAME, "non-finite state snapshot"));
        }
        let action = tracking_action(state, &self.config);
        debug!(
            controller = NAME,
            current_a = action.current_a,
            voltage_v = action.voltage_v,
            "tracking action"
        );
        Ok(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on_target() -> SystemState {
        let cfg = TrackingConfig::default();
        SystemState {
            efficiency_pct: cfg.target_efficiency_pct,
            o2_production_lph: cfg.target_production_lph,
            stack_temperature_c: cfg.target_temperature_c,
            ..SystemState::default()
        }
    }

    #[test]
    fn test_zero_error_holds_action() {
        let ctrl = QuadraticTrackingController::new(TrackingConfig::default()).unwrap();
        let state = on_target();
        let a = ctrl.compute_control(&state).unwrap();
        assert!((a.current_a - state.current_a).abs() < 1e-12);
        assert!((a.voltage_v - state.voltage_v).abs() < 1e-12);
    }

    #[test]
    fn test_production_deficit_raises_current() {
        let ctrl = QuadraticTrackingController::new(TrackingConfig::default()).unwrap();
        let state = SystemState {
            o2_production_lph: 20.0,
            ..on_target()
        };
        let a = ctrl.compute_control(&state).unwrap();
        // 5 L/h deficit · 2 A per L/h
        assert!((a.current_a - 160.0).abs() < 1e-9, "current = {}", a.current_a);
    }

    #[test]
    fn test_hot_stack_backs_off() {
        let ctrl = QuadraticTrackingController::new(TrackingConfig::default()).unwrap();
        let state = SystemState {
            stack_temperature_c: 75.0,
            ..on_target()
        };
        let a = ctrl.compute_control(&state).unwrap();
        assert!(a.current_a < state.current_a);
        assert!(a.voltage_v < state.voltage_v);
    }

    #[test]
    fn test_large_error_clamped() {
        let ctrl = QuadraticTrackingController::new(TrackingConfig::default()).unwrap();
        let state = SystemState {
            o2_production_lph: -500.0,
            efficiency_pct: 0.0,
            ..on_target()
        };
        let a = ctrl.compute_control(&state).unwrap();
        assert!(a.is_within_bounds(), "{a:?}");
        assert_eq!(a.current_a, 200.0);
    }

    #[test]
    fn test_non_finite_state_is_computation_error() {
        let ctrl = QuadraticTrackingController::new(TrackingConfig::default()).unwrap();
        let state = SystemState {
            efficiency_pct: f64::NAN,
            ..SystemState::default()
        };
        let err = ctrl.compute_control(&state).unwrap_err();
        assert!(matches!(err, ElyzerError::ControllerComputation { .. }));
    }
}
