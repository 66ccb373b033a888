//! Access module - who may see a listing's contact details.

mod errors;
mod grant;

pub use errors::AccessError;
pub use grant::{AccessGrant, AccessType, GrantOptions, GrantOutcome, NewAccessGrant};
