//! Conversation persistence: one JSON file per conversation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::error::SessionError;
use crate::structs::Conversation;

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// All stored conversations, most recently updated first.
    async fn load_conversations(&self) -> Result<Vec<Conversation>, SessionError>;

    async fn save_conversation(&self, conversation: &Conversation) -> Result<(), SessionError>;

    async fn delete_conversation(&self, id: &str) -> Result<(), SessionError>;
}

#[derive(Clone)]
pub struct FileConversationStore {
    base_path: PathBuf,
}

impl FileConversationStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn conversation_path(&self, id: &str) -> PathBuf {
        self.base_path.join(format!("{id}.json"))
    }
}

#[async_trait]
impl ConversationStore for FileConversationStore {
    async fn load_conversations(&self) -> Result<Vec<Conversation>, SessionError> {
        if !self.base_path.exists() {
            return Ok(Vec::new());
        }

        let mut conversations = Vec::new();
        let mut entries = fs::read_dir(&self.base_path).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }

            let contents = fs::read_to_string(&path).await?;
            match serde_json::from_str::<Conversation>(&contents) {
                Ok(conversation) => conversations.push(conversation),
                Err(error) => {
                    // One corrupt file must not take the whole history down.
                    log::warn!("skipping unreadable conversation {}: {error}", path.display());
                }
            }
        }

        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(conversations)
    }

    async fn save_conversation(&self, conversation: &Conversation) -> Result<(), SessionError> {
        fs::create_dir_all(&self.base_path).await?;

        let path = self.conversation_path(&conversation.id);
        let contents = serde_json::to_string_pretty(conversation)?;
        fs::write(&path, contents).await?;

        Ok(())
    }

    async fn delete_conversation(&self, id: &str) -> Result<(), SessionError> {
        let path = self.conversation_path(id);
        if path.exists() {
            fs::remove_file(&path).await?;
        }
        Ok(())
    }
}
