//! Ledger event publisher adapters.
//!
//! - `TracingEventPublisher` - structured log lines, used in production
//! - `InMemoryEventPublisher` - captures events for tests

mod in_memory;
mod tracing_publisher;

pub use in_memory::InMemoryEventPublisher;
pub use tracing_publisher::TracingEventPublisher;
