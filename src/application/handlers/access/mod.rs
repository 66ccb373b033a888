//! Access handlers.
//!
//! - `AccessGrantManager` - grant, check, revoke and sweep contact access
//! - `ContactRevealHandler` - contact details for viewers who have access

mod contact_reveal;
mod grant_manager;

pub use contact_reveal::{ContactRevealHandler, GetContactQuery};
pub use grant_manager::AccessGrantManager;
