//! Incremental server-sent-event record decoding.
//!
//! The transport hands us byte chunks split at arbitrary offsets, so the
//! decoder buffers the trailing partial record across calls and only ever
//! emits complete newline-terminated records. Decoding is split-invariant:
//! any partition of the byte stream produces the same event sequence.

use futures_util::StreamExt;
use reqwest::Response;

use crate::error::ClientError;
use crate::event::{ChatStream, StreamEvent};
use crate::wire::{events_from_chunk, ChatCompletionChunk};

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "data: [DONE]";

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one transport chunk and return every event whose record is now
    /// complete. Bytes after the last newline stay buffered for the next call.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            // Records are newline-bounded, so a multi-byte character never
            // spans two records and lossy decoding per line is exact.
            let line = String::from_utf8_lossy(&line[..newline]);
            decode_record(line.trim(), &mut events);
        }

        events
    }

    /// Signal end of stream. A dangling unterminated fragment is a truncated
    /// record, not an error: it is discarded, matching servers that terminate
    /// without a final delimiter.
    pub fn finish(self) {
        if !self.buffer.is_empty() {
            log::debug!(
                "discarding {} bytes of unterminated stream data",
                self.buffer.len()
            );
        }
    }
}

fn decode_record(line: &str, events: &mut Vec<StreamEvent>) {
    if line.is_empty() || line == DONE_SENTINEL {
        return;
    }
    // SSE comment lines (": OPENROUTER PROCESSING" keep-alives and the like).
    if line.starts_with(':') {
        return;
    }

    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        events.push(StreamEvent::Malformed(line.to_string()));
        return;
    };

    match serde_json::from_str::<ChatCompletionChunk>(payload) {
        Ok(chunk) => events.extend(events_from_chunk(chunk)),
        Err(_) => events.push(StreamEvent::Malformed(line.to_string())),
    }
}

/// Adapt an HTTP response body into the typed event stream. Transport read
/// failures surface as `ClientError::Stream`; decode failures never do (they
/// become `Malformed` events).
pub fn event_stream(response: Response) -> ChatStream {
    Box::pin(async_stream::stream! {
        let mut decoder = SseDecoder::new();
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => {
                    for event in decoder.feed(&bytes) {
                        yield Ok(event);
                    }
                }
                Err(error) => {
                    yield Err(ClientError::Stream(error.to_string()));
                    return;
                }
            }
        }

        decoder.finish();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::FinishReason;

    const STREAM: &str = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n",
        "\n",
        ": OPENROUTER PROCESSING\n",
        "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}],\"usage\":{\"prompt_tokens\":10,\"completion_tokens\":2,\"total_tokens\":12}}\n",
        "data: [DONE]\n",
    );

    fn decode_all(input: &[u8], split: usize) -> Vec<StreamEvent> {
        let mut decoder = SseDecoder::new();
        let mut events = Vec::new();
        if split == 0 {
            events.extend(decoder.feed(input));
        } else {
            for fragment in input.chunks(split) {
                events.extend(decoder.feed(fragment));
            }
        }
        decoder.finish();
        events
    }

    #[test]
    fn decodes_a_whole_stream() {
        let events = decode_all(STREAM.as_bytes(), 0);
        assert_eq!(
            events,
            vec![
                StreamEvent::Content("Hel".to_string()),
                StreamEvent::Content("lo".to_string()),
                StreamEvent::Finish(FinishReason::Stop),
                StreamEvent::Usage {
                    prompt_tokens: 10,
                    completion_tokens: 2,
                    total_tokens: Some(12),
                },
            ]
        );
    }

    #[test]
    fn split_invariance_at_every_offset() {
        let expected = decode_all(STREAM.as_bytes(), 0);
        for split in 1..STREAM.len() {
            assert_eq!(
                decode_all(STREAM.as_bytes(), split),
                expected,
                "split size {split} changed the decoded events"
            );
        }
    }

    #[test]
    fn split_invariance_inside_multibyte_characters() {
        let stream = "data: {\"choices\":[{\"delta\":{\"content\":\"héllo ▊ wörld\"}}]}\n";
        let expected = decode_all(stream.as_bytes(), 0);
        assert_eq!(
            expected,
            vec![StreamEvent::Content("héllo ▊ wörld".to_string())]
        );
        // Byte-level splits land inside the UTF-8 sequences.
        for split in 1..stream.len() {
            assert_eq!(decode_all(stream.as_bytes(), split), expected);
        }
    }

    #[test]
    fn dangling_fragment_is_discarded() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"lost\"}}]}");
        assert!(events.is_empty());
        decoder.finish();
    }

    #[test]
    fn unparseable_payload_yields_malformed_not_error() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: {not json}\nnoise without prefix\n");
        assert_eq!(
            events,
            vec![
                StreamEvent::Malformed("data: {not json}".to_string()),
                StreamEvent::Malformed("noise without prefix".to_string()),
            ]
        );
    }

    #[test]
    fn done_sentinel_and_blank_lines_are_filtered() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"\n\ndata: [DONE]\n\n");
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn event_stream_decodes_a_mock_response() {
        use futures_util::StreamExt;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stream"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(STREAM),
            )
            .mount(&server)
            .await;

        let response = reqwest::Client::new()
            .get(format!("{}/stream", server.uri()))
            .send()
            .await
            .expect("response");

        let mut stream = event_stream(response);
        let mut events = Vec::new();
        while let Some(item) = stream.next().await {
            events.push(item.expect("decoded event"));
        }

        assert_eq!(events.len(), 4);
        assert_eq!(events[0], StreamEvent::Content("Hel".to_string()));
        assert_eq!(events[2], StreamEvent::Finish(FinishReason::Stop));
    }
}
