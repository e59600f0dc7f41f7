use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Turn(#[from] chat_loop::ChatError),

    #[error("conversation has no user message to resubmit")]
    NoUserMessage,

    #[error("cannot edit message: {0}")]
    InvalidEdit(String),
}
