#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A required credential or setting is absent from the environment.
    /// Carries the variable name only -- never the value.
    #[error("Server misconfiguration: {0} is not set")]
    Configuration(&'static str),

    /// The upstream service answered 200 but with an unusable shape.
    #[error("Upstream protocol error: {0}")]
    UpstreamProtocol(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
