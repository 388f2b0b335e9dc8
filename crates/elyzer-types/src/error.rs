use thiserror::Error;

#[derive(Error, Debug)]
pub enum ElyzerError {
    #[error("Model evaluation failed at step {step}: {quantity} = {value}")]
    ModelEvaluation {
        step: usize,
        quantity: &'static str,
        value: f64,
    },

    #[error("Controller '{controller}' failed: {message}")]
    ControllerComputation { controller: String, message: String },

    #[error("Controller '{controller}' exceeded its {budget_ms} ms budget")]
    OrchestrationTimeout { controller: String, budget_ms: u64 },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ElyzerError {
    /// Shorthand for an isolated controller fault.
    pub fn computation(controller: &str, message: impl Into<String>) -> Self {
        ElyzerError::ControllerComputation {
            controller: controller.to_string(),
            message: message.into(),
        }
    }
}

pub type ElyzerResult<T> = Result<T, ElyzerError>;
