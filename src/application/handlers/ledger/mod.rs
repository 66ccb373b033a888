//! Ledger handlers.

mod transaction_manager;

pub use transaction_manager::{LogPaymentCommand, TransactionManager};
