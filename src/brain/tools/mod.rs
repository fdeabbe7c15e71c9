//! Tool System
//!
//! Functions the search agent can call mid-conversation.

pub mod error;
pub mod registry;
pub mod tavily_search;
mod r#trait;

pub use error::{Result, ToolError};
pub use registry::ToolRegistry;
pub use tavily_search::TavilySearchTool;
pub use r#trait::{Tool, ToolResult};
