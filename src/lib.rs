//! Contact Ledger - paid contact access for a classifieds marketplace.
//!
//! Records payment transactions, reconciles Stripe webhooks into them,
//! grants buyers access to seller contact details and gates messaging on
//! that access.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
