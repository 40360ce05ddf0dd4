#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ThreadError {
    #[error("thread already rooted at {existing}, refusing to re-root at {attempted}")]
    InvalidRoot { existing: String, attempted: String },
    #[error("parent {0} is not in the thread")]
    UnknownParent(String),
    #[error("post {0} is not in the thread")]
    UnknownNode(String),
}

pub type Result<T, E = ThreadError> = std::result::Result<T, E>;
