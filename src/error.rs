//! Crate-wide error type and result alias.

/// Errors produced by the dispatch pipeline.
///
/// Every variant maps to a specific HTTP disposition in
/// [`crate::pipeline`]; the `Display` text is not necessarily what is
/// returned to the client (the orchestrator picks the exact body per the
/// error table), but it is what gets logged.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No service with this name/version is known to the service repository.
    #[error("The service {name} with version {version} does not exist!")]
    ServiceNotFound {
        /// Requested service name.
        name: String,
        /// Requested service version.
        version: String,
    },

    /// No operation on the service matches the request's method and path.
    #[error("operation not found")]
    OperationNotFound,

    /// A required/validated parameter constraint was violated.
    #[error("{0}. Check parameter constraints.")]
    ConstraintViolation(String),

    /// A dispatcher produced a criterion (or name) for which no response exists.
    #[error("The response {0} does not exist!")]
    ResponseNotFound(String),

    /// Script or JSON-body evaluation failed. Caught at the call site and
    /// converted to a null criterion; never propagated to the client.
    #[error("dispatcher evaluation failed: {0}")]
    DispatchEvaluation(String),

    /// The upstream proxy call failed.
    #[error("proxy call failed: {0}")]
    Proxy(String),

    /// Template rendering failed.
    #[error("template rendering failed: {0}")]
    Render(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
