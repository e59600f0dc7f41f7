pub mod controller;
pub mod error;
pub mod storage;
pub mod structs;

pub use controller::ChatController;
pub use error::SessionError;
pub use storage::{ConversationStore, FileConversationStore};
pub use structs::Conversation;

pub type Result<T> = std::result::Result<T, SessionError>;
