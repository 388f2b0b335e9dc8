// ─────────────────────────────────────────────────────────────────────
// Elyzer Control Core — Elyzer Core
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Electrolyzer prediction model and shared control objective.

pub mod baseline;
pub mod model;
pub mod objective;
