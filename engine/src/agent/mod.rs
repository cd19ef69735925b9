//! Agent Loop Core
//!
//! The agent keeps the conversation and the durable task record; the driver
//! runs the chat → parse → dispatch cycle on top of it.

pub mod conversation;
pub mod core;
pub mod decision;
pub mod driver;
pub mod task_state;

pub use conversation::Conversation;
pub use self::core::{build_system_prompt, Agent, BRAIN_ERROR_REPLY};
pub use decision::{parse_decision, strip_code_fence};
pub use driver::{Driver, SilentObserver, TurnObserver, TurnOutcome, INVALID_JSON_PROMPT};
pub use task_state::{classify_reply, TaskState, TaskStateStore, TaskStatus};
