//! Error taxonomy for the flow pipeline.

use thiserror::Error;

/// Errors surfaced by flow execution.
///
/// The kinds map one-to-one onto the pipeline stages: `Validation` fires
/// before any network traffic, `Service` wraps transport and upstream
/// failures, and `Parse` covers model output that could not be coerced into
/// the declared shape. `Parse` keeps the offending payload so a failed
/// response is never lost.
#[derive(Error, Debug)]
pub enum FlowError {
    /// Input rejected before the model call was attempted.
    #[error("validation failed: {detail}")]
    Validation { detail: String },

    /// The model service call failed (transport, status, or envelope).
    #[error("model service error: {detail}")]
    Service { detail: String },

    /// Model output could not be parsed into the declared shape.
    #[error("response parse error: {detail}")]
    Parse { detail: String, payload: String },
}

impl FlowError {
    pub fn validation(detail: impl Into<String>) -> Self {
        FlowError::Validation {
            detail: detail.into(),
        }
    }

    pub fn service(detail: impl Into<String>) -> Self {
        FlowError::Service {
            detail: detail.into(),
        }
    }

    pub fn parse(detail: impl Into<String>, payload: impl Into<String>) -> Self {
        FlowError::Parse {
            detail: detail.into(),
            payload: payload.into(),
        }
    }
}
