use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Transport error: {0}")]
    Transport(#[from] llm_client::ClientError),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("tool continuation exceeded {0} rounds")]
    ToolRoundsExceeded(usize),

    #[error("Cancelled")]
    Cancelled,
}
