//! Listing module - listings, users and contact reveal results.

mod contact;
mod parties;

pub use contact::{ContactReveal, GrantedVia, RevealedContact};
pub use parties::{ContactDetails, ListingRef, UserRef};
