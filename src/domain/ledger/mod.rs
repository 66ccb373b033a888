//! Ledger module - transactions, their status machine, money and revenue.

mod errors;
mod events;
mod money;
mod revenue;
mod status;
mod transaction;
mod transaction_type;

pub use errors::TransactionError;
pub use events::{LedgerEvent, LedgerEventEnvelope};
pub use money::{from_minor_units, normalize_amount, to_minor_units, Currency, LEDGER_SCALE};
pub use revenue::{DailyRevenue, RevenuePeriod, RevenueStats, TypeRevenue};
pub use status::TransactionStatus;
pub use transaction::{
    Metadata, NewTransaction, SortOrder, StatusExtras, Transaction, TransactionPage,
    TransactionQuery,
};
pub use transaction_type::TransactionType;
