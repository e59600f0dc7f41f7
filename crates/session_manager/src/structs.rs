use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use chat_core::{Message, Role};

const DEFAULT_TITLE: &str = "New chat";
const TITLE_MAX_CHARS: usize = 50;

/// One chat: an ordered message sequence plus display metadata. Persisted as
/// a whole after every completed turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: DEFAULT_TITLE.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Derive the title from the first user message once, leaving manually
    /// renamed conversations alone.
    pub fn refresh_title(&mut self) {
        if !self.title.is_empty() && self.title != DEFAULT_TITLE {
            return;
        }

        if let Some(first_user) = self
            .messages
            .iter()
            .find(|message| message.role == Role::User && !message.content.is_empty())
        {
            self.title = truncate_title(&first_user.content);
        }
    }

    pub fn last_user_index(&self) -> Option<usize> {
        self.messages
            .iter()
            .rposition(|message| message.role == Role::User)
    }
}

fn truncate_title(content: &str) -> String {
    let mut title: String = content.chars().take(TITLE_MAX_CHARS).collect();
    if content.chars().count() > TITLE_MAX_CHARS {
        title.push_str("...");
    }
    title
}
