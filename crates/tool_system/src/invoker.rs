use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use chat_core::{ToolCall, ToolSchema};

use crate::error::ToolError;
use crate::registry::ToolRegistry;

/// Result of one tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolOutcome {
    Success(Value),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedCall {
    pub call: ToolCall,
    pub outcome: ToolOutcome,
}

impl CompletedCall {
    /// JSON-stringified payload sent upstream as the `tool` message content.
    pub fn result_payload(&self) -> String {
        match &self.outcome {
            ToolOutcome::Success(value) => value.to_string(),
            ToolOutcome::Error(message) => json!({ "error": message }).to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Error(_))
    }
}

/// Executes a finalized tool-call list. Strictly sequential: providers expect
/// the result list to match the call order, and every result must be in hand
/// before the continuation request is built.
pub struct ToolInvoker {
    registry: Arc<ToolRegistry>,
}

impl ToolInvoker {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.registry.list_schemas()
    }

    /// Run every call in order, one `CompletedCall` per input call. A parse
    /// failure or unknown tool name becomes an error outcome and processing
    /// continues. Cancellation abandons the in-flight call and marks the
    /// rest as errors without starting them.
    pub async fn invoke_all(
        &self,
        calls: &[ToolCall],
        cancel: &CancellationToken,
    ) -> Vec<CompletedCall> {
        let mut completed = Vec::with_capacity(calls.len());

        for call in calls {
            let outcome = if cancel.is_cancelled() {
                ToolOutcome::Error("cancelled".to_string())
            } else {
                tokio::select! {
                    _ = cancel.cancelled() => ToolOutcome::Error("cancelled".to_string()),
                    outcome = self.invoke_one(call) => outcome,
                }
            };

            if let ToolOutcome::Error(message) = &outcome {
                log::warn!("tool '{}' failed: {}", call.function.name, message);
            }

            completed.push(CompletedCall {
                call: call.clone(),
                outcome,
            });
        }

        completed
    }

    async fn invoke_one(&self, call: &ToolCall) -> ToolOutcome {
        let name = &call.function.name;

        let args = match parse_tool_args(&call.function.arguments) {
            Ok(args) => args,
            Err(error) => {
                return ToolOutcome::Error(format!("invalid arguments for '{name}': {error}"))
            }
        };

        let Some(tool) = self.registry.get(name) else {
            return ToolOutcome::Error(format!("unknown tool: {name}"));
        };

        log::debug!("executing tool '{name}'");
        match tool.execute(args).await {
            Ok(payload) => ToolOutcome::Success(payload),
            Err(error) => ToolOutcome::Error(error.to_string()),
        }
    }
}

/// Parse accumulated argument JSON. An empty buffer means "no arguments".
pub fn parse_tool_args(raw: &str) -> Result<Value, ToolError> {
    if raw.trim().is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(raw).map_err(|error| ToolError::InvalidArguments(error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chat_core::FunctionCall;

    use crate::registry::Tool;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "echoes its arguments"
        }

        fn parameters_schema(&self) -> serde_json::Value {
            json!({"type": "object"})
        }

        async fn execute(&self, args: Value) -> Result<Value, ToolError> {
            Ok(json!({ "echo": args }))
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "broken"
        }

        fn description(&self) -> &str {
            "always fails"
        }

        fn parameters_schema(&self) -> serde_json::Value {
            json!({"type": "object"})
        }

        async fn execute(&self, _args: Value) -> Result<Value, ToolError> {
            Err(ToolError::Execution("boom".to_string()))
        }
    }

    fn make_call(id: &str, name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            tool_type: "function".to_string(),
            function: FunctionCall {
                name: name.to_string(),
                arguments: arguments.to_string(),
            },
        }
    }

    fn invoker_with_tools() -> ToolInvoker {
        let registry = ToolRegistry::new();
        registry.register(EchoTool).unwrap();
        registry.register(FailingTool).unwrap();
        ToolInvoker::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn outcomes_preserve_call_order() {
        let invoker = invoker_with_tools();
        let calls = vec![
            make_call("call_1", "echo", r#"{"a":1}"#),
            make_call("call_2", "echo", r#"{"a":2}"#),
        ];

        let completed = invoker
            .invoke_all(&calls, &CancellationToken::new())
            .await;

        assert_eq!(completed.len(), 2);
        assert_eq!(completed[0].call.id, "call_1");
        assert_eq!(completed[1].call.id, "call_2");
        assert_eq!(
            completed[1].outcome,
            ToolOutcome::Success(json!({ "echo": { "a": 2 } }))
        );
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error_outcome_not_a_failure() {
        let invoker = invoker_with_tools();
        let calls = vec![
            make_call("call_1", "nonexistent", "{}"),
            make_call("call_2", "echo", "{}"),
        ];

        let completed = invoker
            .invoke_all(&calls, &CancellationToken::new())
            .await;

        assert!(completed[0].is_error());
        assert!(completed[0].result_payload().contains("unknown tool"));
        assert!(!completed[1].is_error());
    }

    #[tokio::test]
    async fn malformed_arguments_are_an_error_outcome() {
        let invoker = invoker_with_tools();
        let calls = vec![make_call("call_1", "echo", "{not json")];

        let completed = invoker
            .invoke_all(&calls, &CancellationToken::new())
            .await;

        match &completed[0].outcome {
            ToolOutcome::Error(message) => assert!(message.contains("invalid arguments")),
            other => panic!("expected error outcome, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn tool_failure_is_captured_and_execution_continues() {
        let invoker = invoker_with_tools();
        let calls = vec![
            make_call("call_1", "broken", "{}"),
            make_call("call_2", "echo", "{}"),
        ];

        let completed = invoker
            .invoke_all(&calls, &CancellationToken::new())
            .await;

        assert!(completed[0].is_error());
        assert_eq!(completed[0].result_payload(), r#"{"error":"Execution failed: boom"}"#);
        assert!(!completed[1].is_error());
    }

    #[tokio::test]
    async fn cancelled_token_skips_remaining_calls() {
        let invoker = invoker_with_tools();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let calls = vec![make_call("call_1", "echo", "{}")];
        let completed = invoker.invoke_all(&calls, &cancel).await;

        assert_eq!(
            completed[0].outcome,
            ToolOutcome::Error("cancelled".to_string())
        );
    }

    #[test]
    fn empty_arguments_parse_to_empty_object() {
        assert_eq!(parse_tool_args("").unwrap(), json!({}));
        assert_eq!(parse_tool_args("  ").unwrap(), json!({}));
        assert!(parse_tool_args("{oops").is_err());
    }
}
