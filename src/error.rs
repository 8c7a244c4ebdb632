use thiserror::Error;

/// Failure classes for the simulator.
///
/// There are no retry paths: configuration problems are handled by
/// re-prompting before anything is built, and every other class is fatal
/// for the whole run.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid run parameters (non-positive sizes, too few blocks).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The compute executor could not be brought up (no device, shader
    /// build failure). Carries the diagnostic for the user.
    #[error("executor initialization failed: {0}")]
    ExecutorInit(String),

    /// Dispatch or readback failed mid-simulation. The loop has no
    /// partial-step recovery; the run must be restarted.
    #[error("executor step failed: {0}")]
    ExecutorRuntime(String),

    /// Allocation failure for the weight matrix or activation buffers.
    #[error("out of memory: {0}")]
    Resource(String),
}

impl From<std::collections::TryReserveError> for Error {
    fn from(e: std::collections::TryReserveError) -> Self {
        Error::Resource(e.to_string())
    }
}
