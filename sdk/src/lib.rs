//! Genesis SDK
//!
//! Shared traits and types for Genesis components.
//! This crate is used by the engine and by tool implementations.

/// Core tool trait
pub mod core_tool;

/// Error types and handling
pub mod errors;

/// Decision wire types
pub mod types;

// Re-export commonly used types
pub use core_tool::{required_arg, CoreTool};
pub use errors::{EngineError, GenesisErrorExt};
pub use types::{
    is_tool_output, tool_error, tool_output, ActionRequest, Decision, InputOrigin,
    TOOL_ERROR_PREFIX, TOOL_OUTPUT_PREFIX,
};
