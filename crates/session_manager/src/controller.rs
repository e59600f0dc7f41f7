//! Turn sequencing over one conversation.
//!
//! The controller is the only writer of the message list. A turn's stream
//! assembler receives a read-only history snapshot and returns the messages
//! it produced; they are appended here only when the turn settles cleanly,
//! so a failed or cancelled turn never leaves a half-written assistant
//! message in history.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use chat_core::{Attachment, ConfigError, Message, ModelSpec, Role, Settings};
use chat_loop::{run_chat_turn, ChatEvent, RenderSink, TextFormatter, ThrottledRenderer};
use llm_client::ChatClient;
use tool_system::ToolInvoker;

use crate::error::SessionError;
use crate::storage::ConversationStore;
use crate::structs::Conversation;

pub struct ChatController<T: ConversationStore> {
    conversation: Conversation,
    store: T,
    client: Arc<ChatClient>,
    invoker: Arc<ToolInvoker>,
    model: &'static ModelSpec,
    settings: Settings,
    active_turn: Option<CancellationToken>,
}

impl<T: ConversationStore> ChatController<T> {
    pub fn new(
        conversation: Conversation,
        store: T,
        client: Arc<ChatClient>,
        invoker: Arc<ToolInvoker>,
        model_id: &str,
        settings: Settings,
    ) -> Result<Self, ConfigError> {
        let model = chat_core::model::lookup(model_id)
            .ok_or_else(|| ConfigError::UnknownModel(model_id.to_string()))?;

        Ok(Self {
            conversation,
            store,
            client,
            invoker,
            model,
            settings,
            active_turn: None,
        })
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn model(&self) -> &'static ModelSpec {
        self.model
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn set_model(&mut self, model_id: &str) -> Result<(), ConfigError> {
        self.model = chat_core::model::lookup(model_id)
            .ok_or_else(|| ConfigError::UnknownModel(model_id.to_string()))?;
        Ok(())
    }

    /// Append a user message and run one assistant turn.
    pub async fn send_message<F, S>(
        &mut self,
        content: impl Into<String>,
        attachments: Vec<Attachment>,
        renderer: &mut ThrottledRenderer<F, S>,
        events: &mpsc::Sender<ChatEvent>,
        cancel: CancellationToken,
    ) -> Result<(), SessionError>
    where
        F: TextFormatter,
        S: RenderSink,
    {
        self.conversation
            .messages
            .push(Message::user(content, attachments));
        self.submit(renderer, events, cancel).await
    }

    /// Drop everything after the last user message and resubmit it.
    pub async fn regenerate<F, S>(
        &mut self,
        renderer: &mut ThrottledRenderer<F, S>,
        events: &mpsc::Sender<ChatEvent>,
        cancel: CancellationToken,
    ) -> Result<(), SessionError>
    where
        F: TextFormatter,
        S: RenderSink,
    {
        let last_user = self
            .conversation
            .last_user_index()
            .ok_or(SessionError::NoUserMessage)?;
        self.conversation.messages.truncate(last_user + 1);
        self.submit(renderer, events, cancel).await
    }

    /// Replace the content of the user message at `index`, discard every
    /// later message, and resubmit. Edits are destructive to subsequent
    /// turns; branches are never interleaved.
    pub async fn edit_message<F, S>(
        &mut self,
        index: usize,
        new_content: impl Into<String>,
        renderer: &mut ThrottledRenderer<F, S>,
        events: &mpsc::Sender<ChatEvent>,
        cancel: CancellationToken,
    ) -> Result<(), SessionError>
    where
        F: TextFormatter,
        S: RenderSink,
    {
        match self.conversation.messages.get(index) {
            Some(message) if message.role == Role::User => {}
            Some(_) => {
                return Err(SessionError::InvalidEdit(
                    "only user messages can be edited".to_string(),
                ))
            }
            None => {
                return Err(SessionError::InvalidEdit(format!(
                    "index {index} is out of range"
                )))
            }
        }

        self.conversation.messages.truncate(index + 1);
        self.conversation.messages[index].content = new_content.into();
        self.submit(renderer, events, cancel).await
    }

    async fn submit<F, S>(
        &mut self,
        renderer: &mut ThrottledRenderer<F, S>,
        events: &mpsc::Sender<ChatEvent>,
        cancel: CancellationToken,
    ) -> Result<(), SessionError>
    where
        F: TextFormatter,
        S: RenderSink,
    {
        // Single active stream per conversation: a new turn first cancels
        // whatever is still in flight.
        if let Some(previous) = self.active_turn.replace(cancel.clone()) {
            previous.cancel();
        }

        let mut request = Vec::with_capacity(self.conversation.messages.len() + 1);
        request.push(Message::system(self.settings.system_prompt.clone()));
        request.extend(self.conversation.messages.iter().cloned());

        let result = run_chat_turn(
            &self.client,
            &self.invoker,
            self.model,
            &self.settings,
            &request,
            renderer,
            events,
            &cancel,
        )
        .await;

        self.active_turn = None;

        let turn = result?;

        self.conversation.messages.extend(turn.messages);
        self.conversation.refresh_title();
        self.conversation.touch();
        self.store.save_conversation(&self.conversation).await?;

        Ok(())
    }
}
