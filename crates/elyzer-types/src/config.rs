// ─────────────────────────────────────────────────────────────────────
// Elyzer Control Core — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::constants::{
    CURRENT_MAX_A, CURRENT_MIN_A, E_REVERSIBLE, NOMINAL_CURRENT_A, TEMPERATURE_LIMIT_C,
    VOLTAGE_MAX_V, VOLTAGE_MIN_V,
};
use crate::error::{ElyzerError, ElyzerResult};
use serde::{Deserialize, Serialize};

/// Tolerance on the scenario probability sum.
pub const PROBABILITY_TOLERANCE: f64 = 1e-9;

fn require(cond: bool, msg: &str) -> ElyzerResult<()> {
    if cond {
        Ok(())
    } else {
        Err(ElyzerError::ConfigError(msg.to_string()))
    }
}

fn finite_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Top-level configuration for the whole comparison suite.
/// Every section is optional in JSON and falls back to its defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlSuiteConfig {
    pub model: ModelParams,
    pub evolution: EvolutionConfig,
    pub tracking: TrackingConfig,
    pub scenario: ScenarioConfig,
    pub mixed: MixedConfig,
    pub harness: HarnessConfig,
}

impl ControlSuiteConfig {
    /// Load from a JSON file and validate every section.
    pub fn from_file(path: &str) -> ElyzerResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ElyzerResult<()> {
        self.model.validate()?;
        self.evolution.validate()?;
        self.tracking.validate()?;
        self.scenario.validate()?;
        self.mixed.validate()?;
        self.harness.validate()
    }
}

/// Electrochemical and thermal parameters of the prediction model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParams {
    pub ideal_voltage_v: f64,
    pub cell_resistance_ohm: f64,
    pub tafel_slope_v: f64,
    pub exchange_current_a: f64,
    /// Relative drop of activation overpotential per K above 25 °C.
    pub activation_temp_coeff: f64,
    pub concentration_coeff_v_per_a: f64,
    /// Fraction of voltage overdrive dissipated as stack heat.
    pub overdrive_heat_fraction: f64,
    pub ambient_temperature_c: f64,
    pub cooling_gain_w_per_k: f64,
    pub thermal_coefficient_k_per_j: f64,
    pub dt_s: f64,
    pub temperature_min_c: f64,
    pub temperature_max_c: f64,
    pub temperature_limit_c: f64,
    pub current_limit_a: f64,
}

impl Default for ModelParams {
    fn default() -> Self {
        ModelParams {
            ideal_voltage_v: E_REVERSIBLE,
            cell_resistance_ohm: 0.002,
            tafel_slope_v: 0.06,
            exchange_current_a: 1.0,
            activation_temp_coeff: 0.005,
            concentration_coeff_v_per_a: 0.0003,
            overdrive_heat_fraction: 1.0,
            ambient_temperature_c: 25.0,
            cooling_gain_w_per_k: 1.0,
            thermal_coefficient_k_per_j: 0.01,
            dt_s: 1.0,
            temperature_min_c: 20.0,
            temperature_max_c: 100.0,
            temperature_limit_c: TEMPERATURE_LIMIT_C,
            current_limit_a: CURRENT_MAX_A,
        }
    }
}

impl ModelParams {
    pub fn validate(&self) -> ElyzerResult<()> {
        require(
            finite_positive(self.ideal_voltage_v),
            "ideal_voltage_v must be finite and > 0",
        )?;
        require(
            self.cell_resistance_ohm.is_finite() && self.cell_resistance_ohm >= 0.0,
            "cell_resistance_ohm must be finite and >= 0",
        )?;
        require(
            self.tafel_slope_v.is_finite() && self.tafel_slope_v >= 0.0,
            "tafel_slope_v must be finite and >= 0",
        )?;
        require(
            finite_positive(self.exchange_current_a),
            "exchange_current_a must be finite and > 0",
        )?;
        require(
            self.activation_temp_coeff.is_finite()
                && self.concentration_coeff_v_per_a.is_finite()
                && self.overdrive_heat_fraction.is_finite()
                && self.ambient_temperature_c.is_finite(),
            "model coefficients must be finite",
        )?;
        require(
            self.cooling_gain_w_per_k.is_finite() && self.cooling_gain_w_per_k >= 0.0,
            "cooling_gain_w_per_k must be finite and >= 0",
        )?;
        require(
            finite_positive(self.thermal_coefficient_k_per_j),
            "thermal_coefficient_k_per_j must be finite and > 0",
        )?;
        require(finite_positive(self.dt_s), "dt_s must be finite and > 0")?;
        require(
            self.temperature_min_c.is_finite()
                && self.temperature_max_c.is_finite()
                && self.temperature_min_c < self.temperature_max_c,
            "temperature_min_c must be < temperature_max_c",
        )?;
        require(
            self.temperature_limit_c.is_finite(),
            "temperature_limit_c must be finite",
        )?;
        require(
            finite_positive(self.current_limit_a),
            "current_limit_a must be finite and > 0",
        )
    }
}

/// HE-NMPC population search parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub population_size: usize,
    pub generations: usize,
    pub horizon: usize,
    pub crossover_alpha: f64,
    pub mutation_probability: f64,
    pub mutation_current_a: f64,
    pub mutation_voltage_v: f64,
    pub nominal_current_a: f64,
    pub seed: u64,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        EvolutionConfig {
            population_size: 20,
            generations: 10,
            horizon: 10,
            crossover_alpha: 0.7,
            mutation_probability: 0.3,
            mutation_current_a: 15.0,
            mutation_voltage_v: 0.1,
            nominal_current_a: NOMINAL_CURRENT_A,
            seed: 42,
        }
    }
}

impl EvolutionConfig {
    pub fn validate(&self) -> ElyzerResult<()> {
        require(self.population_size >= 2, "population_size must be >= 2")?;
        require(self.generations >= 1, "generations must be >= 1")?;
        require(self.horizon >= 1, "horizon must be >= 1")?;
        require(
            (0.0..=1.0).contains(&self.crossover_alpha),
            "crossover_alpha must be in [0, 1]",
        )?;
        require(
            (0.0..=1.0).contains(&self.mutation_probability),
            "mutation_probability must be in [0, 1]",
        )?;
        require(
            self.mutation_current_a.is_finite()
                && self.mutation_current_a >= 0.0
                && self.mutation_voltage_v.is_finite()
                && self.mutation_voltage_v >= 0.0,
            "mutation bounds must be finite and >= 0",
        )?;
        require(
            self.nominal_current_a.is_finite(),
            "nominal_current_a must be finite",
        )
    }
}

/// Fixed references and proportional gains of the quadratic tracker.
/// Errors are `target − measured`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub target_efficiency_pct: f64,
    pub target_production_lph: f64,
    pub target_temperature_c: f64,
    /// A per L/h of production error.
    pub k_current_production: f64,
    /// A per K of temperature error.
    pub k_current_temperature: f64,
    /// V per % of efficiency error.
    pub k_voltage_efficiency: f64,
    /// V per K of temperature error.
    pub k_voltage_temperature: f64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        TrackingConfig {
            target_efficiency_pct: 80.0,
            target_production_lph: 25.0,
            target_temperature_c: 65.0,
            k_current_production: 2.0,
            k_current_temperature: 1.5,
            k_voltage_efficiency: 0.01,
            k_voltage_temperature: 0.005,
        }
    }
}

impl TrackingConfig {
    pub fn validate(&self) -> ElyzerResult<()> {
        let all = [
            self.target_efficiency_pct,
            self.target_production_lph,
            self.target_temperature_c,
            self.k_current_production,
            self.k_current_temperature,
            self.k_voltage_efficiency,
            self.k_voltage_temperature,
        ];
        require(
            all.iter().all(|v| v.is_finite()),
            "tracking targets and gains must be finite",
        )
    }
}

/// One disturbance hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub name: String,
    pub efficiency_offset_pct: f64,
    pub temperature_offset_c: f64,
    pub probability: f64,
}

impl ScenarioSpec {
    pub fn new(
        name: &str,
        efficiency_offset_pct: f64,
        temperature_offset_c: f64,
        probability: f64,
    ) -> Self {
        ScenarioSpec {
            name: name.to_string(),
            efficiency_offset_pct,
            temperature_offset_c,
            probability,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub scenarios: Vec<ScenarioSpec>,
    /// Gain structure applied to every perturbed state.
    pub tracking: TrackingConfig,
    /// Model horizon used to vet each scenario solution.
    pub horizon: usize,
    pub nominal_current_a: f64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        ScenarioConfig {
            scenarios: vec![
                ScenarioSpec::new("nominal", 0.0, 0.0, 0.4),
                ScenarioSpec::new("efficiency_high", 5.0, 0.0, 0.15),
                ScenarioSpec::new("efficiency_low", -5.0, 0.0, 0.15),
                ScenarioSpec::new("temperature_high", 0.0, 5.0, 0.15),
                ScenarioSpec::new("temperature_low", 0.0, -5.0, 0.15),
            ],
            tracking: TrackingConfig::default(),
            horizon: 5,
            nominal_current_a: NOMINAL_CURRENT_A,
        }
    }
}

impl ScenarioConfig {
    pub fn probability_sum(&self) -> f64 {
        self.scenarios.iter().map(|s| s.probability).sum()
    }

    pub fn validate(&self) -> ElyzerResult<()> {
        require(!self.scenarios.is_empty(), "at least one scenario is required")?;
        for s in &self.scenarios {
            require(
                s.probability.is_finite() && s.probability >= 0.0,
                "scenario probabilities must be finite and >= 0",
            )?;
            require(
                s.efficiency_offset_pct.is_finite() && s.temperature_offset_c.is_finite(),
                "scenario offsets must be finite",
            )?;
        }
        require(self.horizon >= 1, "horizon must be >= 1")?;
        require(
            self.nominal_current_a.is_finite(),
            "nominal_current_a must be finite",
        )?;
        let sum = self.probability_sum();
        if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(ElyzerError::ConfigError(format!(
                "scenario probabilities must sum to 1, got {sum:.12}"
            )));
        }
        self.tracking.validate()
    }
}

/// Discrete current grid × continuous voltage grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixedConfig {
    pub current_levels_a: Vec<f64>,
    pub voltage_min_v: f64,
    pub voltage_max_v: f64,
    pub voltage_points: usize,
    pub horizon: usize,
    pub nominal_current_a: f64,
}

impl Default for MixedConfig {
    fn default() -> Self {
        MixedConfig {
            current_levels_a: vec![100.0, 120.0, 140.0, 160.0, 180.0, 200.0],
            voltage_min_v: VOLTAGE_MIN_V,
            voltage_max_v: VOLTAGE_MAX_V,
            voltage_points: 7,
            horizon: 5,
            nominal_current_a: NOMINAL_CURRENT_A,
        }
    }
}

impl MixedConfig {
    pub fn validate(&self) -> ElyzerResult<()> {
        require(
            !self.current_levels_a.is_empty(),
            "current_levels_a must not be empty",
        )?;
        require(
            self.current_levels_a
                .iter()
                .all(|c| (CURRENT_MIN_A..=CURRENT_MAX_A).contains(c)),
            "current levels must lie in [100, 200] A",
        )?;
        require(
            VOLTAGE_MIN_V <= self.voltage_min_v
                && self.voltage_min_v <= self.voltage_max_v
                && self.voltage_max_v <= VOLTAGE_MAX_V,
            "voltage grid must lie in [1.8, 2.4] V",
        )?;
        require(self.voltage_points >= 1, "voltage_points must be >= 1")?;
        require(self.horizon >= 1, "horizon must be >= 1")?;
        require(
            self.nominal_current_a.is_finite(),
            "nominal_current_a must be finite",
        )
    }
}

/// Comparison harness cadence, budgets and bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Minimum interval between two computations.
    pub cadence_ms: u64,
    /// Per-controller time budget.
    pub controller_timeout_ms: u64,
    pub evaluation_horizon: usize,
    pub temperature_limit_c: f64,
    pub history_capacity: usize,
    pub nominal_current_a: f64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            cadence_ms: 15_000,
            controller_timeout_ms: 5_000,
            evaluation_horizon: 10,
            temperature_limit_c: TEMPERATURE_LIMIT_C,
            history_capacity: 50,
            nominal_current_a: NOMINAL_CURRENT_A,
        }
    }
}

impl HarnessConfig {
    pub fn validate(&self) -> ElyzerResult<()> {
        require(
            self.controller_timeout_ms > 0,
            "controller_timeout_ms must be > 0",
        )?;
        require(self.evaluation_horizon >= 1, "evaluation_horizon must be >= 1")?;
        require(
            self.temperature_limit_c.is_finite(),
            "temperature_limit_c must be finite",
        )?;
        require(self.history_capacity >= 1, "history_capacity must be >= 1")?;
        require(
            self.nominal_current_a.is_finite(),
            "nominal_current_a must be finite",
        )
    }
}
