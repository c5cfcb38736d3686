//! Agent Loop Core
//!
//! This module implements the turn loop that alternates between the model and
//! the tools until the model answers without requesting a tool. Conversations
//! are append-only and kept per session.

pub mod conversation;
pub mod core;
pub mod router;
pub mod sessions;

pub use conversation::{exchanges, Conversation};
pub use self::core::{AgentCore, TurnResult};
pub use router::{route, Route, TurnLimits, TurnOutcome, TurnRouter, TurnState};
pub use sessions::{SessionHandle, SessionStore};
