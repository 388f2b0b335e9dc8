// ─────────────────────────────────────────────────────────────────────
// Elyzer Control Core — Prediction Model
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Deterministic electrolyzer forward model.
//!
//! Lumped single-stack physics: Faraday O2 production, overpotential
//! efficiency, first-order thermal balance and a safety margin derived
//! from the temperature and current limits. Identical inputs always give
//! an identical trajectory, so every controller is scored on equal terms.

use elyzer_types::config::ModelParams;
use elyzer_types::constants::{ELECTRONS_PER_O2, FARADAY, P_REF_GAS_PA, R_GAS, T_REF_GAS_K};
use elyzer_types::error::{ElyzerError, ElyzerResult};
use elyzer_types::state::{ControlAction, SystemState};
use ndarray::Array1;

/// Efficiency clamp [%].
const EFFICIENCY_MIN: f64 = 60.0;
const EFFICIENCY_MAX: f64 = 95.0;

/// Reference temperature for the activation overpotential [°C].
const ACTIVATION_REF_C: f64 = 25.0;

/// Molar volume of an ideal gas at the reference conditions [L/mol].
fn molar_volume_l() -> f64 {
    R_GAS * T_REF_GAS_K / P_REF_GAS_PA * 1000.0
}

/// O2 volumetric rate [L/h] for a current at a given faradaic efficiency.
pub fn faraday_production_lph(current_a: f64, efficiency_pct: f64) -> f64 {
    let moles_per_s = current_a * (efficiency_pct / 100.0) / (ELECTRONS_PER_O2 * FARADAY);
    (moles_per_s * molar_volume_l() * 3600.0).max(0.0)
}

fn finite(step: usize, quantity: &'static str, value: f64) -> ElyzerResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ElyzerError::ModelEvaluation {
            step,
            quantity,
            value,
        })
    }
}

/// Overpotential breakdown at one operating point [V].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overpotentials {
    pub activation: f64,
    pub ohmic: f64,
    pub concentration: f64,
}

impl Overpotentials {
    pub fn total(&self) -> f64 {
        self.activation + self.ohmic + self.concentration
    }
}

/// Ordered predicted states. Built once by the model, read-only after.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionTrajectory {
    initial: SystemState,
    controls: Vec<ControlAction>,
    states: Vec<SystemState>,
}

impl PredictionTrajectory {
    pub fn initial(&self) -> &SystemState {
        &self.initial
    }

    pub fn controls(&self) -> &[ControlAction] {
        &self.controls
    }

    pub fn states(&self) -> &[SystemState] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Final predicted state. Trajectories always hold at least one step.
    pub fn last(&self) -> &SystemState {
        self.states.last().unwrap_or(&self.initial)
    }

    pub fn efficiency_series(&self) -> Array1<f64> {
        self.states.iter().map(|s| s.efficiency_pct).collect()
    }

    pub fn mean_efficiency(&self) -> f64 {
        self.efficiency_series().mean().unwrap_or(0.0)
    }

    /// Population variance of predicted efficiency.
    pub fn efficiency_variance(&self) -> f64 {
        if self.states.is_empty() {
            return 0.0;
        }
        self.efficiency_series().var(0.0)
    }

    pub fn mean_production(&self) -> f64 {
        let series: Array1<f64> = self.states.iter().map(|s| s.o2_production_lph).collect();
        series.mean().unwrap_or(0.0)
    }

    pub fn mean_safety_margin(&self) -> f64 {
        let series: Array1<f64> = self.states.iter().map(|s| s.safety_margin_pct).collect();
        series.mean().unwrap_or(0.0)
    }

    pub fn max_temperature(&self) -> f64 {
        self.states
            .iter()
            .map(|s| s.stack_temperature_c)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Lumped electrolyzer stack model.
#[derive(Debug, Clone)]
pub struct PredictionModel {
    params: ModelParams,
}

impl PredictionModel {
    pub fn new(params: ModelParams) -> ElyzerResult<Self> {
        params.validate()?;
        Ok(PredictionModel { params })
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    /// Activation (Tafel, temperature-relieved), ohmic and concentration
    /// overpotentials for a current at a stack temperature.
    pub fn overpotentials(&self, current_a: f64, temperature_c: f64) -> Overpotentials {
        let p = &self.params;
        let ratio = (current_a / p.exchange_current_a).max(1.0);
        let thermal_relief =
            (1.0 - p.activation_temp_coeff * (temperature_c - ACTIVATION_REF_C)).max(0.0);
        Overpotentials {
            activation: p.tafel_slope_v * ratio.ln() * thermal_relief,
            ohmic: current_a * p.cell_resistance_ohm,
            concentration: p.concentration_coeff_v_per_a * current_a,
        }
    }

    /// One unit step of the plant under a constant control.
    pub fn step(
        &self,
        state: &SystemState,
        control: &ControlAction,
        step_idx: usize,
    ) -> ElyzerResult<SystemState> {
        let p = &self.params;
        let current = finite(step_idx, "current", control.current_a)?;
        let voltage = finite(step_idx, "voltage", control.voltage_v)?;
        let temperature = finite(step_idx, "temperature", state.stack_temperature_c)?;

        // Cell voltage required to pass the commanded current
        let required = self.overpotentials(current, temperature);
        let cell_voltage = finite(
            step_idx,
            "cell_voltage",
            p.ideal_voltage_v + required.total(),
        )?;

        // Under-driven cell: current falls with the available overvoltage
        let headroom = cell_voltage - p.ideal_voltage_v;
        let drive = if voltage >= cell_voltage || headroom <= 0.0 {
            1.0
        } else {
            ((voltage - p.ideal_voltage_v) / headroom).clamp(0.0, 1.0)
        };
        let effective_current = current * drive;

        // Efficiency at the current actually drawn
        let drawn = if drive < 1.0 {
            self.overpotentials(effective_current, temperature)
        } else {
            required
        };
        let efficiency = finite(
            step_idx,
            "efficiency",
            p.ideal_voltage_v / (p.ideal_voltage_v + drawn.total()) * 100.0,
        )?
        .clamp(EFFICIENCY_MIN, EFFICIENCY_MAX);

        let production = finite(
            step_idx,
            "o2_production",
            faraday_production_lph(effective_current, efficiency),
        )?;

        // Thermal balance: Joule heat + dissipated overdrive − cooling
        let joule = effective_current * effective_current * p.cell_resistance_ohm;
        let overdrive =
            effective_current * (voltage - cell_voltage).max(0.0) * p.overdrive_heat_fraction;
        let cooling = (temperature - p.ambient_temperature_c) * p.cooling_gain_w_per_k;
        let d_temp = finite(
            step_idx,
            "temperature_delta",
            (joule + overdrive - cooling) * p.thermal_coefficient_k_per_j * p.dt_s,
        )?;
        let new_temperature =
            (temperature + d_temp).clamp(p.temperature_min_c, p.temperature_max_c);

        let temperature_margin = ((p.temperature_limit_c - new_temperature)
            / p.temperature_limit_c
            * 100.0)
            .clamp(0.0, 100.0);
        let current_margin =
            ((p.current_limit_a - current) / p.current_limit_a * 100.0).clamp(0.0, 100.0);
        let safety = finite(
            step_idx,
            "safety_margin",
            temperature_margin.min(current_margin),
        )?;

        Ok(SystemState {
            current_a: effective_current,
            voltage_v: voltage,
            o2_production_lph: production,
            efficiency_pct: efficiency,
            stack_temperature_c: new_temperature,
            safety_margin_pct: safety,
            purity_pct: state.purity_pct,
            economic_setpoint: state.economic_setpoint,
        })
    }

    /// Apply `control` for `steps` unit steps.
    pub fn predict(
        &self,
        initial: &SystemState,
        control: &ControlAction,
        steps: usize,
    ) -> ElyzerResult<PredictionTrajectory> {
        let controls = vec![*control; steps];
        self.predict_sequence(initial, &controls)
    }

    /// Apply one control per step. The trajectory is a pure function of
    /// `initial` and `controls`.
    pub fn predict_sequence(
        &self,
        initial: &SystemState,
        controls: &[ControlAction],
    ) -> ElyzerResult<PredictionTrajectory> {
        if controls.is_empty() {
            return Err(ElyzerError::ConfigError(
                "prediction requires at least one step".to_string(),
            ));
        }
        let mut states = Vec::with_capacity(controls.len());
        let mut state = *initial;
        for (k, control) in controls.iter().enumerate() {
            state = self.step(&state, control, k)?;
            states.push(state);
        }
        Ok(PredictionTrajectory {
            initial: *initial,
            controls: controls.to_vec(),
            states,
        })
    }

    /// Ideal O2 rate at the current limit with 100 % efficiency [L/h].
    pub fn ideal_production_lph(&self) -> f64 {
        faraday_production_lph(self.params.current_limit_a, 100.0)
    }
}

impl Default for PredictionModel {
    fn default() -> Self {
        PredictionModel {
            params: ModelParams::default(),
        }
    }
}
