// ─────────────────────────────────────────────────────────────────────
// Elyzer Control Core — State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::constants::{
    CURRENT_MAX_A, CURRENT_MIN_A, NOMINAL_CURRENT_A, NOMINAL_VOLTAGE_V, VOLTAGE_MAX_V,
    VOLTAGE_MIN_V,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Clamp into `[lo, hi]`, mapping NaN to the lower bound.
fn bounded(value: f64, lo: f64, hi: f64) -> f64 {
    if value.is_nan() {
        lo
    } else {
        value.clamp(lo, hi)
    }
}

/// Measured plant snapshot. One copy is shared read-only by every
/// controller within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SystemState {
    pub current_a: f64,
    pub voltage_v: f64,
    pub o2_production_lph: f64,
    pub efficiency_pct: f64,
    pub stack_temperature_c: f64,
    pub safety_margin_pct: f64,
    pub purity_pct: f64,
    /// Electricity price (currency/kWh).
    pub economic_setpoint: f64,
}

impl SystemState {
    /// The action currently applied to the stack, clamped to the envelope.
    pub fn applied_action(&self) -> ControlAction {
        ControlAction::clamped(self.current_a, self.voltage_v)
    }

    pub fn is_finite(&self) -> bool {
        [
            self.current_a,
            self.voltage_v,
            self.o2_production_lph,
            self.efficiency_pct,
            self.stack_temperature_c,
            self.safety_margin_pct,
            self.purity_pct,
            self.economic_setpoint,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

impl Default for SystemState {
    fn default() -> Self {
        SystemState {
            current_a: NOMINAL_CURRENT_A,
            voltage_v: NOMINAL_VOLTAGE_V,
            o2_production_lph: 40.0,
            efficiency_pct: 75.0,
            stack_temperature_c: 65.0,
            safety_margin_pct: 90.0,
            purity_pct: 99.5,
            economic_setpoint: 0.12,
        }
    }
}

/// Stack current and cell voltage command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlAction {
    pub current_a: f64,
    pub voltage_v: f64,
}

impl ControlAction {
    /// Build an action clamped to [100, 200] A × [1.8, 2.4] V.
    pub fn clamped(current_a: f64, voltage_v: f64) -> Self {
        ControlAction {
            current_a: bounded(current_a, CURRENT_MIN_A, CURRENT_MAX_A),
            voltage_v: bounded(voltage_v, VOLTAGE_MIN_V, VOLTAGE_MAX_V),
        }
    }

    pub fn clamp(self) -> Self {
        Self::clamped(self.current_a, self.voltage_v)
    }

    pub fn current_in_range(&self) -> bool {
        (CURRENT_MIN_A..=CURRENT_MAX_A).contains(&self.current_a)
    }

    pub fn voltage_in_range(&self) -> bool {
        (VOLTAGE_MIN_V..=VOLTAGE_MAX_V).contains(&self.voltage_v)
    }

    pub fn is_within_bounds(&self) -> bool {
        self.current_in_range() && self.voltage_in_range()
    }

    /// Blend crossover: `alpha·self + (1 − alpha)·other`, unclamped.
    pub fn blend(&self, other: &ControlAction, alpha: f64) -> ControlAction {
        ControlAction {
            current_a: alpha * self.current_a + (1.0 - alpha) * other.current_a,
            voltage_v: alpha * self.voltage_v + (1.0 - alpha) * other.voltage_v,
        }
    }

    /// Electrical power drawn by the stack (kW).
    pub fn power_kw(&self) -> f64 {
        self.current_a * self.voltage_v / 1000.0
    }
}

impl Default for ControlAction {
    fn default() -> Self {
        ControlAction {
            current_a: NOMINAL_CURRENT_A,
            voltage_v: NOMINAL_VOLTAGE_V,
        }
    }
}

/// Named condition flagged on an otherwise valid result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintViolation {
    CurrentOutOfRange,
    VoltageOutOfRange,
    TemperatureTooHigh,
    /// The model could not evaluate the action.
    PredictionUnavailable,
}

impl ConstraintViolation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintViolation::CurrentOutOfRange => "current_out_of_range",
            ConstraintViolation::VoltageOutOfRange => "voltage_out_of_range",
            ConstraintViolation::TemperatureTooHigh => "temperature_too_high",
            ConstraintViolation::PredictionUnavailable => "prediction_unavailable",
        }
    }
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-controller metrics, all evaluated under the shared model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Mean predicted efficiency over the evaluation horizon [%].
    pub efficiency_pct: f64,
    /// Mean predicted O2 production [L/h].
    pub production_lph: f64,
    /// Wall time spent computing the action [ms].
    pub response_time_ms: f64,
    /// 100 / (1 + var(efficiency)).
    pub stability: f64,
    /// Energy cost at the economic setpoint [currency/h].
    pub cost_per_hour: f64,
    /// Ranking score (shared fitness).
    pub score: f64,
}

impl PerformanceMetrics {
    /// Metrics for an action the model could not evaluate.
    pub fn unscored(response_time_ms: f64) -> Self {
        PerformanceMetrics {
            efficiency_pct: 0.0,
            production_lph: 0.0,
            response_time_ms,
            stability: 0.0,
            cost_per_hour: 0.0,
            score: f64::NEG_INFINITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultStatus {
    Ok,
    /// Internal controller fault; the action is a fallback.
    Failed { message: String },
    /// Budget exceeded; the action is a fallback.
    TimedOut { budget_ms: u64 },
}

impl ResultStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, ResultStatus::Ok)
    }
}

/// One controller's outcome for one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerResult {
    pub controller_name: String,
    pub control_action: ControlAction,
    pub performance_metrics: PerformanceMetrics,
    pub constraint_violations: BTreeSet<ConstraintViolation>,
    pub status: ResultStatus,
    pub computed_at: DateTime<Utc>,
}

impl ControllerResult {
    pub fn has_violation(&self, violation: ConstraintViolation) -> bool {
        self.constraint_violations.contains(&violation)
    }

    pub fn score(&self) -> f64 {
        self.performance_metrics.score
    }
}

/// All results of one cycle, in controller registration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSnapshot {
    pub cycle: u64,
    pub cycle_timestamp: DateTime<Utc>,
    pub results: Vec<ControllerResult>,
    pub best_performer: Option<String>,
    pub degraded: bool,
}

impl ComparisonSnapshot {
    pub fn get(&self, controller_name: &str) -> Option<&ControllerResult> {
        self.results
            .iter()
            .find(|r| r.controller_name == controller_name)
    }

    pub fn best(&self) -> Option<&ControllerResult> {
        self.best_performer.as_deref().and_then(|name| self.get(name))
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// What the harness hands to its sink after each cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    pub snapshot: ComparisonSnapshot,
    pub recommended: ControlAction,
    pub degraded: bool,
}
