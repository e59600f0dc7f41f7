//! Chat-completion request serialization.
//!
//! Builds the provider JSON body without leaking internal [`Message`] fields
//! (ids, timestamps, usage). Attachment handling follows the original client:
//! text files are inlined into the user text, images travel as image-url
//! content parts, other kinds are local-only.

use chat_core::{AttachmentKind, Message, ModelSpec, Role, Settings, ToolSchema};
use serde_json::{json, Value};

/// Convert internal messages to the wire `messages` array.
pub fn messages_to_wire_json(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .filter_map(message_to_wire_json)
        .collect()
}

fn message_to_wire_json(message: &Message) -> Option<Value> {
    let role = match message.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };

    match message.role {
        Role::User => {
            let mut text = message.content.clone();
            let mut image_parts = Vec::new();

            for attachment in &message.attachments {
                match &attachment.kind {
                    AttachmentKind::Text { content } => {
                        text.push_str(&format!("\n\n[File: {}]\n{}", attachment.name, content));
                    }
                    AttachmentKind::Image { data_url } => {
                        image_parts.push(json!({
                            "type": "image_url",
                            "image_url": { "url": data_url },
                        }));
                    }
                    _ => {}
                }
            }

            let content = if image_parts.is_empty() {
                json!(text)
            } else {
                let mut parts = vec![json!({ "type": "text", "text": text })];
                parts.extend(image_parts);
                json!(parts)
            };

            Some(json!({ "role": role, "content": content }))
        }
        Role::Assistant => {
            // Providers reject assistant turns that carry neither text nor
            // tool calls, so those are dropped from history.
            if message.content.is_empty() && message.tool_calls.is_none() {
                return None;
            }

            let mut wire = json!({ "role": role, "content": message.content });
            if let Some(tool_calls) = &message.tool_calls {
                wire["tool_calls"] = json!(tool_calls);
            }
            Some(wire)
        }
        Role::Tool => {
            let tool_call_id = message.tool_call_id.as_deref()?;
            Some(json!({
                "role": role,
                "content": message.content,
                "tool_call_id": tool_call_id,
            }))
        }
        Role::System => Some(json!({ "role": role, "content": message.content })),
    }
}

/// Build the streaming request body for one round.
pub fn build_chat_body(
    model: &ModelSpec,
    messages: &[Message],
    settings: &Settings,
    tools: &[ToolSchema],
) -> Value {
    let max_tokens = if settings.max_tokens > 0 {
        settings.max_tokens
    } else {
        model.max_tokens
    };

    let mut body = json!({
        "model": model.id,
        "messages": messages_to_wire_json(messages),
        "stream": true,
        "temperature": settings.temperature,
        "top_p": settings.top_p,
        "max_tokens": max_tokens,
    });

    if model.supports_reasoning {
        body["reasoning"] = json!({ "effort": "high" });
    }

    if model.supports_web_search && settings.web_search {
        body["plugins"] = json!([{ "id": "web" }]);
        body["web_search_options"] = json!({ "search_context_size": "high" });
    }

    if !tools.is_empty() {
        body["tools"] = json!(tools);
    }

    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_core::{model, Attachment, FunctionCall, ToolCall};

    fn test_model() -> &'static ModelSpec {
        model::lookup(model::DEFAULT_MODEL).unwrap()
    }

    #[test]
    fn internal_fields_are_omitted() {
        let out = messages_to_wire_json(&[Message::user("Hello", Vec::new())]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["role"], "user");
        assert_eq!(out[0]["content"], "Hello");
        assert!(out[0].get("id").is_none());
        assert!(out[0].get("created_at").is_none());
    }

    #[test]
    fn text_attachments_are_inlined() {
        let message = Message::user(
            "Summarize this",
            vec![Attachment::text("notes.md", "# heading\nbody")],
        );
        let out = messages_to_wire_json(&[message]);
        assert_eq!(
            out[0]["content"],
            "Summarize this\n\n[File: notes.md]\n# heading\nbody"
        );
    }

    #[test]
    fn image_attachments_become_content_parts() {
        let message = Message::user(
            "What is this?",
            vec![Attachment::image("shot.png", "data:image/png;base64,AAAA")],
        );
        let out = messages_to_wire_json(&[message]);

        let parts = out[0]["content"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(parts[1]["image_url"]["url"], "data:image/png;base64,AAAA");
    }

    #[test]
    fn empty_assistant_without_tool_calls_is_dropped() {
        let out = messages_to_wire_json(&[
            Message::assistant("", None),
            Message::assistant("kept", None),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["content"], "kept");
    }

    #[test]
    fn tool_flow_messages_keep_ids() {
        let call = ToolCall {
            id: "call_1".to_string(),
            tool_type: "function".to_string(),
            function: FunctionCall {
                name: "web_search".to_string(),
                arguments: r#"{"query":"x"}"#.to_string(),
            },
        };
        let out = messages_to_wire_json(&[
            Message::assistant("", Some(vec![call])),
            Message::tool_result("call_1", r#"{"ok":true}"#),
        ]);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["tool_calls"][0]["id"], "call_1");
        assert_eq!(out[0]["tool_calls"][0]["type"], "function");
        assert_eq!(out[1]["role"], "tool");
        assert_eq!(out[1]["tool_call_id"], "call_1");
    }

    #[test]
    fn body_has_required_fields() {
        let settings = Settings::default();
        let body = build_chat_body(
            test_model(),
            &[Message::user("hi", Vec::new())],
            &settings,
            &[],
        );

        assert_eq!(body["model"], model::DEFAULT_MODEL);
        assert_eq!(body["stream"], true);
        assert_eq!(body["temperature"], 0.6);
        assert_eq!(body["top_p"], 0.93);
        assert_eq!(body["max_tokens"], 16000);
        assert!(body.get("tools").is_none());
        assert!(body.get("plugins").is_none());
    }

    #[test]
    fn reasoning_models_get_reasoning_effort() {
        let settings = Settings::default();
        let body = build_chat_body(test_model(), &[], &settings, &[]);
        assert_eq!(body["reasoning"]["effort"], "high");

        let plain = model::lookup("deepseek/deepseek-v3.2-exp").unwrap();
        let body = build_chat_body(plain, &[], &settings, &[]);
        assert!(body.get("reasoning").is_none());
    }

    #[test]
    fn web_search_adds_plugins_only_when_enabled() {
        let mut settings = Settings::default();
        settings.web_search = true;
        let body = build_chat_body(test_model(), &[], &settings, &[]);
        assert_eq!(body["plugins"][0]["id"], "web");
        assert_eq!(body["web_search_options"]["search_context_size"], "high");
    }

    #[test]
    fn tools_array_is_included_when_present() {
        let tools = vec![ToolSchema {
            schema_type: "function".to_string(),
            function: chat_core::FunctionSchema {
                name: "web_search".to_string(),
                description: "Search the web".to_string(),
                parameters: json!({"type": "object"}),
            },
        }];
        let body = build_chat_body(test_model(), &[], &Settings::default(), &tools);
        assert_eq!(body["tools"][0]["function"]["name"], "web_search");
    }
}
