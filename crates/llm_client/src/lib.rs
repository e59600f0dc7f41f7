pub mod client;
pub mod error;
pub mod event;
pub mod request;
pub mod sse;
mod wire;

pub use client::{ChatClient, APP_TITLE};
pub use error::ClientError;
pub use event::{ChatStream, FinishReason, StreamEvent, ToolCallDelta};
pub use request::build_chat_body;
pub use sse::{event_stream, SseDecoder};

pub type Result<T> = std::result::Result<T, ClientError>;
