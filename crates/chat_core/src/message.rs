use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attachment::Attachment;
use crate::tool::ToolCall;
use crate::usage::UsageSummary;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    #[serde(default = "generate_id", skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageSummary>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

impl Message {
    pub fn user(content: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        Self {
            id: generate_id(),
            role: Role::User,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
            attachments,
            usage: None,
            created_at: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Option<Vec<ToolCall>>) -> Self {
        Self {
            id: generate_id(),
            role: Role::Assistant,
            content: content.into(),
            tool_calls,
            tool_call_id: None,
            attachments: Vec::new(),
            usage: None,
            created_at: Utc::now(),
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            role: Role::Tool,
            content: content.into(),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
            attachments: Vec::new(),
            usage: None,
            created_at: Utc::now(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            role: Role::System,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
            attachments: Vec::new(),
            usage: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_usage(mut self, usage: Option<UsageSummary>) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{FunctionCall, ToolCall};

    #[test]
    fn roles_serialize_lowercase() {
        let message = Message::user("hi", Vec::new());
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["role"], "user");
        assert!(value.get("tool_calls").is_none());
        assert!(value.get("attachments").is_none());
    }

    #[test]
    fn tool_result_carries_call_id() {
        let message = Message::tool_result("call_1", r#"{"ok":true}"#);
        assert_eq!(message.role, Role::Tool);
        assert_eq!(message.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn assistant_with_tool_calls_round_trips() {
        let call = ToolCall {
            id: "call_1".to_string(),
            tool_type: "function".to_string(),
            function: FunctionCall {
                name: "web_search".to_string(),
                arguments: r#"{"query":"rust"}"#.to_string(),
            },
        };
        let message = Message::assistant("", Some(vec![call]));

        let json = serde_json::to_string(&message).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back.tool_calls.as_ref().unwrap().len(), 1);
        assert_eq!(back.tool_calls.unwrap()[0].function.name, "web_search");
    }
}
