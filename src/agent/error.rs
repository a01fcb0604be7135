use thiserror::Error;

/// Failures that end a turn. Tool failures never appear here; they are fed
/// back to the model as tool-result text.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("api error: {0:#}")]
    Model(#[source] anyhow::Error),
    #[error("api returned empty response (no choices)")]
    EmptyResponse,
    #[error("agent step limit reached")]
    StepLimit(usize),
}
