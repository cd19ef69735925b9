//! Genesis Engine Library
//!
//! This library provides the core functionality of the Genesis agent.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// API credentials and redaction
pub mod secrets;

/// Database persistence module
pub mod db;

/// Domain event log
pub mod events;

/// LLM provider abstraction layer
pub mod llm;

/// Agent loop core module
pub mod agent;

/// Built-in native core tools
pub mod tools;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
