//! Application layer: the chat session use case wired over the core traits.

pub mod chat_session;


pub use chat_session::{ChatSession, SessionSettings, SubmitOutcome};
