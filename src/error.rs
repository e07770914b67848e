use thiserror::Error;

/// Errors in the library.
///
/// The replay buffer underflow is the only recoverable variant: the agent
/// treats it as the data-collection phase and skips the optimization step.
/// Everything else is fatal for the current run.
#[derive(Error, Debug)]
pub enum DdpgError {
    /// The replay buffer does not hold enough transitions for a batch.
    #[error("replay buffer holds {len} transitions but {requested} were requested")]
    InsufficientData { requested: usize, len: usize },

    /// A configured vector length does not match the network shapes.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// A configuration value is outside its valid range.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A loss came back NaN or Inf. Continuing would corrupt the online
    /// parameters and, through the soft update, the target parameters.
    #[error("non-finite {context} loss: {value}")]
    Numerical { context: &'static str, value: f64 },

    /// The environment collaborator failed mid-run.
    ///
    /// The engines propagate environment failures as plain
    /// [`anyhow::Error`]; this variant lifts one into the typed taxonomy
    /// for callers that match on [`DdpgError`].
    #[error("environment failure: {0}")]
    Environment(#[source] anyhow::Error),

    #[error(transparent)]
    Tensor(#[from] candle_core::Error),

    /// Checkpoint io inside the library goes through the tensor substrate
    /// and surfaces as [`DdpgError::Tensor`]; this conversion is for
    /// callers managing checkpoint files directly.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_name_their_cause() {
        let underflow = DdpgError::InsufficientData {
            requested: 4,
            len: 3,
        };
        assert_eq!(
            underflow.to_string(),
            "replay buffer holds 3 transitions but 4 were requested",
        );

        let env = DdpgError::Environment(anyhow::anyhow!("the simulator hung up"));
        assert_eq!(env.to_string(), "environment failure: the simulator hung up");

        let io: DdpgError = std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no checkpoint here",
        )
        .into();
        assert_eq!(io.to_string(), "no checkpoint here");
    }
}
