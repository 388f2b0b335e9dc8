// ─────────────────────────────────────────────────────────────────────
// Elyzer Control Core — Elyzer Control
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Control strategies and their comparison harness.
//!
//! HE-NMPC, quadratic tracking, scenario-robust and mixed
//! discrete/continuous controllers behind one `Controller` trait,
//! ranked every cycle by `harness::ComparisonHarness`.

pub mod constraints;
pub mod controller;
pub mod evolutionary;
pub mod harness;
pub mod history;
pub mod mixed;
pub mod quadratic;
pub mod scenario;
pub mod sink;

pub use controller::Controller;
pub use harness::ComparisonHarness;
