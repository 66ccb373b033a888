//! Messaging module - buyer/seller messages gated by contact access.

mod errors;
mod message;

pub use errors::MessagingError;
pub use message::{Message, NewMessage, MAX_BODY_CHARS};
