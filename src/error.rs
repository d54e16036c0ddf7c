use thiserror::Error;

/// Errors that can occur while laying out or rendering a plan.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PlanError {
    /// Malformed plan description (bad scale, bad settings, wrong kind tag).
    #[error("invalid plan: {0}")]
    Validation(String),

    /// Required data is missing or unusable (e.g. no coordinates at all).
    #[error("plan data error: {0}")]
    Data(String),

    /// A numeric subsystem could not produce a result
    /// (degenerate triangulation, too few samples, NaN interpolation).
    #[error("computation failed: {0}")]
    Computation(String),

    /// Propagated from the drawing backend, with context.
    #[error("render failed while placing {context}: {message}")]
    Render { context: String, message: String },
}

impl PlanError {
    pub fn render(context: impl Into<String>, message: impl Into<String>) -> Self {
        PlanError::Render {
            context: context.into(),
            message: message.into(),
        }
    }
}
