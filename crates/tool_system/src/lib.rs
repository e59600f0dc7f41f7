pub mod builtin;
pub mod error;
pub mod invoker;
pub mod registry;

pub use builtin::{FetchUrlTool, WebSearchTool};
pub use error::ToolError;
pub use invoker::{parse_tool_args, CompletedCall, ToolInvoker, ToolOutcome};
pub use registry::{RegistryError, SharedTool, Tool, ToolRegistry};
