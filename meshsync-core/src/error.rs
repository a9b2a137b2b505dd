use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("invalid relative path: {0}")]
    InvalidPath(String),

    #[error("invalid node descriptor: {0}")]
    InvalidNode(String),

    #[error("lock unavailable: {0}")]
    LockUnavailable(String),

    #[error("replicated transition was not committed: {0}")]
    NotCommitted(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
