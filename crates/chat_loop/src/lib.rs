pub mod accumulator;
pub mod error;
pub mod events;
pub mod renderer;
pub mod turn;

pub use accumulator::ToolCallAccumulator;
pub use error::ChatError;
pub use events::ChatEvent;
pub use renderer::{FormatError, RenderSink, TextFormatter, ThrottledRenderer, FLUSH_INTERVAL};
pub use turn::{run_chat_turn, TurnOutput, MAX_TOOL_ROUNDS};
