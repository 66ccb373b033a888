//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (ids, timestamps, errors, state machine)
//! - `ledger` - Transactions, their status machine, money and revenue
//! - `access` - Access grants over listing contact details
//! - `listing` - Read-only listing and user views, contact reveal outcomes
//! - `messaging` - Buyer/seller messages
//! - `webhook` - Payment provider event verification and normalization

pub mod access;
pub mod foundation;
pub mod ledger;
pub mod listing;
pub mod messaging;
pub mod webhook;
