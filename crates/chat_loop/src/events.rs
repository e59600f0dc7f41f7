use serde::{Deserialize, Serialize};

use chat_core::{ToolCall, UsageSummary};
use tool_system::CompletedCall;

/// The per-turn observer stream. The UI subscribes to exactly one of these
/// channels per turn; ordering matches stream arrival order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// Incremental assistant text plus everything received so far.
    Content { delta: String, total: String },

    /// A generated image URL.
    Image { url: String },

    /// The assistant finished announcing tool calls; execution starts next.
    ToolCallsCompleted { calls: Vec<ToolCall> },

    /// Every tool call settled, in call order.
    ToolResults { results: Vec<CompletedCall> },

    /// Token accounting from the terminal stop record.
    Usage { usage: UsageSummary, finished: bool },

    /// The turn reached its terminal state.
    Completed,

    Error { message: String },
}
