//! The per-turn state machine.
//!
//! A turn is one user-message-to-assistant-response exchange. It may span
//! several HTTP requests: when a round finishes with `tool_calls`, the
//! accumulated calls are executed and a continuation request carrying the
//! assistant's announcement plus one tool-result message per call is issued.
//! The continuation loop is explicitly bounded.

use chat_core::{Attachment, Message, ModelSpec, Settings, UsageSummary};
use llm_client::{build_chat_body, ChatClient, ChatStream, FinishReason, StreamEvent};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use futures::StreamExt;
use tool_system::ToolInvoker;

use crate::accumulator::ToolCallAccumulator;
use crate::error::ChatError;
use crate::events::ChatEvent;
use crate::renderer::{RenderSink, TextFormatter, ThrottledRenderer};

/// Upper bound on suspend/resume cycles within one turn. The protocol itself
/// has no bound; a runaway model would otherwise loop forever.
pub const MAX_TOOL_ROUNDS: usize = 8;

/// Everything a settled turn produced, in order: intermediate assistant and
/// tool messages from continuation rounds, then the final assistant message.
#[derive(Debug)]
pub struct TurnOutput {
    pub messages: Vec<Message>,
    pub usage: Option<UsageSummary>,
}

#[derive(Debug)]
struct RoundOutput {
    content: String,
    tool_calls: Vec<chat_core::ToolCall>,
    images: Vec<String>,
    usage: Option<UsageSummary>,
    finish: Option<FinishReason>,
}

/// Drive one turn to a terminal state. The history snapshot is read-only;
/// every message the turn produces is returned, never inserted into history
/// here. After cancellation fires no further events are emitted and the
/// partial output is discarded by returning `ChatError::Cancelled`.
#[allow(clippy::too_many_arguments)]
pub async fn run_chat_turn<F, S>(
    client: &ChatClient,
    invoker: &ToolInvoker,
    model: &ModelSpec,
    settings: &Settings,
    history: &[Message],
    renderer: &mut ThrottledRenderer<F, S>,
    events: &mpsc::Sender<ChatEvent>,
    cancel: &CancellationToken,
) -> Result<TurnOutput, ChatError>
where
    F: TextFormatter,
    S: RenderSink,
{
    let tool_schemas = invoker.schemas();
    let mut produced: Vec<Message> = Vec::new();

    for round in 0..MAX_TOOL_ROUNDS {
        if cancel.is_cancelled() {
            return Err(ChatError::Cancelled);
        }
        renderer.resume();

        let mut request_messages = history.to_vec();
        request_messages.extend(produced.iter().cloned());
        let body = build_chat_body(model, &request_messages, settings, &tool_schemas);

        log::debug!(
            "dispatching round {} with {} messages",
            round + 1,
            request_messages.len()
        );

        let stream = match client.chat_stream(&body).await {
            Ok(stream) => stream,
            Err(error) => {
                send_event(
                    events,
                    cancel,
                    ChatEvent::Error {
                        message: error.to_string(),
                    },
                )
                .await;
                return Err(ChatError::Transport(error));
            }
        };

        let output = consume_round(stream, model, renderer, events, cancel).await?;

        match output.finish {
            Some(FinishReason::ToolCalls) => {
                if output.tool_calls.is_empty() {
                    return Err(ChatError::Protocol(
                        "finish_reason \"tool_calls\" without any accumulated tool call"
                            .to_string(),
                    ));
                }

                let calls = output.tool_calls;
                send_event(
                    events,
                    cancel,
                    ChatEvent::ToolCallsCompleted {
                        calls: calls.clone(),
                    },
                )
                .await;

                let results = invoker.invoke_all(&calls, cancel).await;
                if cancel.is_cancelled() {
                    return Err(ChatError::Cancelled);
                }
                send_event(
                    events,
                    cancel,
                    ChatEvent::ToolResults {
                        results: results.clone(),
                    },
                )
                .await;

                produced.push(Message::assistant(output.content, Some(calls)));
                for completed in &results {
                    produced.push(Message::tool_result(
                        completed.call.id.clone(),
                        completed.result_payload(),
                    ));
                }
            }
            // Stop, a provider-specific reason, or stream end without a
            // marker all settle the turn.
            _ => {
                let attachments: Vec<Attachment> = output
                    .images
                    .iter()
                    .enumerate()
                    .map(|(i, url)| Attachment::image(format!("image_{}", i + 1), url.clone()))
                    .collect();

                produced.push(
                    Message::assistant(output.content, None)
                        .with_usage(output.usage)
                        .with_attachments(attachments),
                );

                send_event(events, cancel, ChatEvent::Completed).await;
                return Ok(TurnOutput {
                    messages: produced,
                    usage: output.usage,
                });
            }
        }
    }

    Err(ChatError::ToolRoundsExceeded(MAX_TOOL_ROUNDS))
}

/// Consume one response stream to completion, driving the renderer's
/// deferred flushes from the same select loop that reads events.
async fn consume_round<F, S>(
    mut stream: ChatStream,
    model: &ModelSpec,
    renderer: &mut ThrottledRenderer<F, S>,
    events: &mpsc::Sender<ChatEvent>,
    cancel: &CancellationToken,
) -> Result<RoundOutput, ChatError>
where
    F: TextFormatter,
    S: RenderSink,
{
    let mut content = String::new();
    let mut accumulator = ToolCallAccumulator::new();
    let mut images = Vec::new();
    let mut usage: Option<UsageSummary> = None;
    let mut finish: Option<FinishReason> = None;
    let mut stopped = false;

    loop {
        let flush_at = renderer.next_flush();

        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ChatError::Cancelled),
            _ = deadline_sleep(flush_at) => {
                renderer.flush();
                continue;
            }
            item = stream.next() => match item {
                None => break,
                Some(Ok(event)) => event,
                Some(Err(error)) => {
                    send_event(events, cancel, ChatEvent::Error { message: error.to_string() })
                        .await;
                    return Err(ChatError::Transport(error));
                }
            },
        };

        match event {
            StreamEvent::Content(delta) => {
                // Empty deltas would only wake the renderer for nothing.
                if delta.is_empty() {
                    continue;
                }
                content.push_str(&delta);
                renderer.add_chunk(&delta);
                send_event(
                    events,
                    cancel,
                    ChatEvent::Content {
                        delta,
                        total: content.clone(),
                    },
                )
                .await;
            }
            StreamEvent::ToolCall(delta) => {
                accumulator.apply(&delta);
            }
            StreamEvent::Image { url, .. } => {
                images.push(url.clone());
                send_event(events, cancel, ChatEvent::Image { url }).await;
            }
            StreamEvent::Finish(reason) => {
                log::debug!("stream finished: {reason:?}");
                stopped = reason == FinishReason::Stop;
                finish = Some(reason);
                renderer.finalize();
            }
            StreamEvent::Usage {
                prompt_tokens,
                completion_tokens,
                total_tokens,
            } => {
                // A provider may report usage mid-stream; only the terminal
                // stop report is trusted.
                if stopped {
                    let summary = UsageSummary::from_counts(
                        prompt_tokens,
                        completion_tokens,
                        total_tokens,
                        model.pricing.as_ref(),
                    );
                    usage = Some(summary);
                    send_event(
                        events,
                        cancel,
                        ChatEvent::Usage {
                            usage: summary,
                            finished: true,
                        },
                    )
                    .await;
                }
            }
            StreamEvent::Malformed(raw) => {
                log::warn!("skipping malformed stream record: {raw}");
            }
        }
    }

    // Some servers end the body without a finish marker.
    renderer.finalize();

    Ok(RoundOutput {
        content,
        tool_calls: accumulator.finalize(),
        images,
        usage,
        finish,
    })
}

async fn deadline_sleep(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Observer delivery, suppressed once the turn is cancelled.
async fn send_event(events: &mpsc::Sender<ChatEvent>, cancel: &CancellationToken, event: ChatEvent) {
    if cancel.is_cancelled() {
        return;
    }
    if events.send(event).await.is_err() {
        log::debug!("chat event receiver dropped");
    }
}
