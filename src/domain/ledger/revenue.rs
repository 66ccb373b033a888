//! Revenue reporting over completed transactions.

use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::money::LEDGER_SCALE;
use super::{Transaction, TransactionStatus, TransactionType};
use crate::domain::foundation::Timestamp;

/// Reporting window, always ending now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevenuePeriod {
    /// Since midnight UTC today.
    Day,
    /// Last 7 days.
    Week,
    /// Last 30 days.
    #[default]
    Month,
    /// Last 365 days.
    Year,
    AllTime,
}

impl RevenuePeriod {
    /// Inclusive lower bound of the window, `None` for all time.
    pub fn window_start(&self, now: Timestamp) -> Option<Timestamp> {
        match self {
            RevenuePeriod::Day => now
                .date()
                .and_hms_opt(0, 0, 0)
                .map(|midnight| Timestamp::from_datetime(Utc.from_utc_datetime(&midnight))),
            RevenuePeriod::Week => Some(now.minus_days(7)),
            RevenuePeriod::Month => Some(now.minus_days(30)),
            RevenuePeriod::Year => Some(now.minus_days(365)),
            RevenuePeriod::AllTime => None,
        }
    }

    /// True if `at` falls inside the window ending at `now`.
    pub fn contains(&self, at: &Timestamp, now: Timestamp) -> bool {
        self.window_start(now).map_or(true, |start| !at.is_before(&start))
    }
}

/// Revenue for one product type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeRevenue {
    pub transaction_type: TransactionType,
    pub total: Decimal,
    pub count: u64,
}

/// Revenue for one UTC calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyRevenue {
    pub date: NaiveDate,
    pub total: Decimal,
    pub count: u64,
}

/// Aggregate over completed transactions in a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevenueStats {
    pub period: RevenuePeriod,
    pub total: Decimal,
    pub count: u64,
    pub average: Decimal,
    pub by_type: Vec<TypeRevenue>,
    pub by_day: Vec<DailyRevenue>,
}

impl RevenueStats {
    /// Aggregates the completed rows of `transactions`; other statuses are skipped.
    pub fn aggregate<'a>(
        period: RevenuePeriod,
        transactions: impl IntoIterator<Item = &'a Transaction>,
    ) -> Self {
        let mut by_type: BTreeMap<TransactionType, (Decimal, u64)> = BTreeMap::new();
        let mut by_day: BTreeMap<NaiveDate, (Decimal, u64)> = BTreeMap::new();

        for tx in transactions
            .into_iter()
            .filter(|tx| tx.status == TransactionStatus::Completed)
        {
            let entry = by_type.entry(tx.transaction_type).or_default();
            entry.0 += tx.amount;
            entry.1 += 1;

            let entry = by_day.entry(tx.created_at.date()).or_default();
            entry.0 += tx.amount;
            entry.1 += 1;
        }

        Self::from_buckets(
            period,
            by_type
                .into_iter()
                .map(|(transaction_type, (total, count))| TypeRevenue {
                    transaction_type,
                    total,
                    count,
                })
                .collect(),
            by_day
                .into_iter()
                .map(|(date, (total, count))| DailyRevenue { date, total, count })
                .collect(),
        )
    }

    /// Builds the summary from pre-grouped buckets. Totals derive from `by_type`.
    pub fn from_buckets(
        period: RevenuePeriod,
        by_type: Vec<TypeRevenue>,
        by_day: Vec<DailyRevenue>,
    ) -> Self {
        let total: Decimal = by_type.iter().map(|bucket| bucket.total).sum();
        let count: u64 = by_type.iter().map(|bucket| bucket.count).sum();
        let average = if count == 0 {
            Decimal::ZERO
        } else {
            (total / Decimal::from(count))
                .round_dp_with_strategy(LEDGER_SCALE, RoundingStrategy::MidpointAwayFromZero)
        };

        Self {
            period,
            total,
            count,
            average,
            by_type,
            by_day,
        }
    }
}
