//! Adapters - Implementations of port interfaces.
//!
//! - `events` - Ledger event publishers (in-memory, tracing)
//! - `http` - REST API
//! - `memory` - In-memory repositories for development and tests
//! - `postgres` - PostgreSQL repositories
//! - `stripe` - Stripe checkout client and a mock provider

pub mod events;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;
