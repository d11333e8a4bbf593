//! Remote collaborators for the Dekr chat client.

pub mod http_chat_api;

pub use http_chat_api::{DEFAULT_REQUEST_TIMEOUT, HttpChatApi};
