//! Messaging handlers.

mod gate;
mod send_message;

pub use gate::MessagingGate;
pub use send_message::{ListMessagesHandler, SendMessageCommand, SendMessageHandler};
