use thiserror::Error;

/// Failures of a durable mirror backend.
///
/// These never reach users of [`TtlCache`](super::TtlCache); the cache logs
/// them and carries on with its in-memory state.
#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("Mirror I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Mirror record could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),
}
