//! Capability interface shared by every control strategy.

use elyzer_types::error::ElyzerResult;
use elyzer_types::state::{ControlAction, SystemState};

/// One control strategy.
///
/// Implementations are stateless across calls and safe to share between
/// threads; the harness runs each on its own blocking worker.
pub trait Controller: Send + Sync {
    /// Stable identifier used in results and snapshots.
    fn name(&self) -> &str;

    /// Compute an action for `state`. The returned action must already be
    /// clamped to the actuator envelope.
    fn compute_control(&self, state: &SystemState) -> ElyzerResult<ControlAction>;
}
