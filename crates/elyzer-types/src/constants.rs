// ─────────────────────────────────────────────────────────────────────
// Elyzer Control Core — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Faraday constant (C/mol)
pub const FARADAY: f64 = 96485.332;

/// Molar gas constant (J/(mol·K))
pub const R_GAS: f64 = 8.314;

/// Electrons transferred per O2 molecule (2 H2O → O2 + 4 H+ + 4 e-)
pub const ELECTRONS_PER_O2: f64 = 4.0;

/// Reversible water-splitting voltage at 25 °C (V)
pub const E_REVERSIBLE: f64 = 1.23;

/// Reference gas temperature for volumetric rates (K)
pub const T_REF_GAS_K: f64 = 298.15;

/// Reference gas pressure for volumetric rates (Pa)
pub const P_REF_GAS_PA: f64 = 101_325.0;

/// Actuator envelope. Every controller output is clamped to these.
pub const CURRENT_MIN_A: f64 = 100.0;
pub const CURRENT_MAX_A: f64 = 200.0;
pub const VOLTAGE_MIN_V: f64 = 1.8;
pub const VOLTAGE_MAX_V: f64 = 2.4;

/// Static "optimal_setpoint" operating point.
pub const NOMINAL_CURRENT_A: f64 = 150.0;
pub const NOMINAL_VOLTAGE_V: f64 = 2.1;

/// Stack temperature above which a result is flagged (°C).
pub const TEMPERATURE_LIMIT_C: f64 = 80.0;
