//! Serde shapes for the chat-completion stream protocol.

use serde::Deserialize;

use crate::event::{FinishReason, StreamEvent, ToolCallDelta};

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ChunkDelta {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCallDelta>>,
    images: Option<Vec<WireImageDelta>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCallDelta {
    index: Option<u32>,
    id: Option<String>,
    function: Option<WireFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct WireFunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireImageDelta {
    index: Option<u32>,
    image_url: Option<WireImageUrl>,
}

#[derive(Debug, Deserialize)]
struct WireImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
}

/// Map one wire chunk to its events, in protocol order: content first (so
/// tool-call bookkeeping never delays rendering), then tool-call and image
/// deltas, then the finish marker, then usage.
pub(crate) fn events_from_chunk(chunk: ChatCompletionChunk) -> Vec<StreamEvent> {
    let mut events = Vec::new();

    if let Some(choice) = chunk.choices.into_iter().next() {
        if let Some(content) = choice.delta.content {
            events.push(StreamEvent::Content(content));
        }

        for (position, call) in choice.delta.tool_calls.into_iter().flatten().enumerate() {
            events.push(StreamEvent::ToolCall(ToolCallDelta {
                index: call.index.unwrap_or(position as u32),
                id: call.id,
                name: call.function.as_ref().and_then(|f| f.name.clone()),
                arguments: call.function.and_then(|f| f.arguments),
            }));
        }

        for (position, image) in choice.delta.images.into_iter().flatten().enumerate() {
            if let Some(image_url) = image.image_url {
                events.push(StreamEvent::Image {
                    url: image_url.url,
                    index: image.index.unwrap_or(position as u32),
                });
            }
        }

        if let Some(reason) = choice.finish_reason {
            events.push(StreamEvent::Finish(FinishReason::parse(&reason)));
        }
    }

    if let Some(usage) = chunk.usage {
        events.push(StreamEvent::Usage {
            prompt_tokens: usage.prompt_tokens.unwrap_or(0),
            completion_tokens: usage.completion_tokens.unwrap_or(0),
            total_tokens: usage.total_tokens,
        });
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(payload: &str) -> Vec<StreamEvent> {
        let chunk: ChatCompletionChunk = serde_json::from_str(payload).unwrap();
        events_from_chunk(chunk)
    }

    #[test]
    fn content_delta_yields_content_event() {
        let events = decode(r#"{"choices":[{"delta":{"content":"Hello"}}]}"#);
        assert_eq!(events, vec![StreamEvent::Content("Hello".to_string())]);
    }

    #[test]
    fn combined_chunk_preserves_event_order() {
        let events = decode(
            r#"{"choices":[{"delta":{"content":"x","tool_calls":[{"index":0,"id":"call_1","function":{"name":"web_search","arguments":"{"}}]},"finish_reason":"tool_calls"}]}"#,
        );

        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], StreamEvent::Content(_)));
        assert!(matches!(events[1], StreamEvent::ToolCall(_)));
        assert_eq!(events[2], StreamEvent::Finish(FinishReason::ToolCalls));
    }

    #[test]
    fn usage_comes_after_finish() {
        let events = decode(
            r#"{"choices":[{"delta":{},"finish_reason":"stop"}],"usage":{"prompt_tokens":10,"completion_tokens":2,"total_tokens":12}}"#,
        );

        assert_eq!(events[0], StreamEvent::Finish(FinishReason::Stop));
        assert_eq!(
            events[1],
            StreamEvent::Usage {
                prompt_tokens: 10,
                completion_tokens: 2,
                total_tokens: Some(12),
            }
        );
    }

    #[test]
    fn image_delta_yields_image_event() {
        let events = decode(
            r#"{"choices":[{"delta":{"images":[{"index":0,"image_url":{"url":"https://img.example/1.png"}}]}}]}"#,
        );
        assert_eq!(
            events,
            vec![StreamEvent::Image {
                url: "https://img.example/1.png".to_string(),
                index: 0,
            }]
        );
    }

    #[test]
    fn tool_call_delta_without_index_falls_back_to_position() {
        let events =
            decode(r#"{"choices":[{"delta":{"tool_calls":[{"function":{"arguments":"}"}}]}}]}"#);
        match &events[0] {
            StreamEvent::ToolCall(delta) => {
                assert_eq!(delta.index, 0);
                assert_eq!(delta.arguments.as_deref(), Some("}"));
                assert!(delta.id.is_none());
            }
            other => panic!("expected tool call delta, got {other:?}"),
        }
    }

    #[test]
    fn empty_choices_with_usage_still_reports_usage() {
        let events = decode(r#"{"choices":[],"usage":{"prompt_tokens":5,"completion_tokens":1}}"#);
        assert_eq!(
            events,
            vec![StreamEvent::Usage {
                prompt_tokens: 5,
                completion_tokens: 1,
                total_tokens: None,
            }]
        );
    }
}
