//! Alfred SDK
//!
//! Shared library providing error and tool I/O types for Alfred components.
//! This crate is used by the engine and by its tools.

/// Error types and handling
pub mod errors;

/// Tool input/output types
pub mod types;

// Re-export commonly used types
pub use errors::{AlfredErrorExt, EngineError, ErrorKind};
pub use types::{ToolError, ToolInput, ToolOutput, ToolSpec};
