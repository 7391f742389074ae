use thiserror::Error;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("Duplicate instance in topology view: {0}")]
    DuplicateInstance(String),

    #[error("Local instance {0} is not a member of the topology view")]
    UnknownLocalInstance(String),

    #[error("Topology view contains no instances")]
    EmptyView,

    #[error("Topology event channel closed")]
    ChannelClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RouterError>;
