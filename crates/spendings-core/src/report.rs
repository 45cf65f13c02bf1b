//! Spending reports
//!
//! Sums spendings over a calendar-month window, per tag and overall. A
//! spending counts toward every tag it carries but only once toward the
//! total; untagged spendings land in the `other` bucket.
//!
//! ```text
//! Spending report for current month:
//!
//! food: 41.25
//! work: 35.75
//!
//! Total: 51.25
//! ```

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::models::{BotCommand, Spending};
use crate::store::RecordStore;

/// Label of the catch-all bucket
pub const OTHER_LABEL: &str = "other";

/// Reply sent when the store cannot be queried
pub const REPORT_FAILED: &str = "Failed to generate report";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportPeriod {
    /// First instant of this month through now
    CurrentMonth,
    /// The whole previous calendar month
    LastMonth,
}

impl ReportPeriod {
    pub fn label(&self) -> &'static str {
        match self {
            Self::CurrentMonth => "current month",
            Self::LastMonth => "last month",
        }
    }

    /// Inclusive `(from, to)` window for this period at `now`
    pub fn window(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let this_month = first_of_month(now.date_naive());
        let this_month_start = start_of_day(this_month);

        match self {
            Self::CurrentMonth => (this_month_start, now),
            Self::LastMonth => {
                let last_month = first_of_month(this_month - Days::new(1));
                (
                    start_of_day(last_month),
                    this_month_start - Duration::nanoseconds(1),
                )
            }
        }
    }
}

impl From<BotCommand> for ReportPeriod {
    fn from(command: BotCommand) -> Self {
        match command {
            BotCommand::Report => Self::CurrentMonth,
            BotCommand::ReportLastMonth => Self::LastMonth,
        }
    }
}

impl fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Aggregated totals for one period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpendingReport {
    pub period: ReportPeriod,
    /// Per-tag subtotals, ordered by tag name (excludes the catch-all)
    pub totals: BTreeMap<String, f64>,
    /// Catch-all bucket: untagged spendings, plus any tag literally named `other`
    pub other: f64,
    /// Every spending counted once
    pub total: f64,
}

impl SpendingReport {
    pub fn aggregate(period: ReportPeriod, spendings: &[Spending]) -> Self {
        let mut totals: BTreeMap<String, f64> = BTreeMap::new();
        let mut other = 0.0;
        let mut total = 0.0;

        for spending in spendings {
            total += spending.cost;

            if spending.tags.is_empty() {
                other += spending.cost;
                continue;
            }
            for tag in &spending.tags {
                if tag.name == OTHER_LABEL {
                    other += spending.cost;
                } else {
                    *totals.entry(tag.name.clone()).or_insert(0.0) += spending.cost;
                }
            }
        }

        Self {
            period,
            totals,
            other,
            total,
        }
    }

    pub fn render(&self) -> String {
        let mut lines = vec![format!("Spending report for {}:", self.period), String::new()];

        for (tag, amount) in &self.totals {
            lines.push(format!("{}: {:.2}", tag, amount));
        }
        if self.other > 0.0 {
            lines.push(format!("{}: {:.2}", OTHER_LABEL, self.other));
        }
        if lines.len() > 2 {
            lines.push(String::new());
        }

        lines.push(format!("Total: {:.2}", self.total));
        lines.join("\n")
    }
}

impl fmt::Display for SpendingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Query the store for `period` at `now` and aggregate
pub fn build_report<S: RecordStore + ?Sized>(
    store: &S,
    period: ReportPeriod,
    now: DateTime<Utc>,
) -> Result<SpendingReport> {
    let (from, to) = period.window(now);
    let spendings = store.spendings_between(from, to)?;
    Ok(SpendingReport::aggregate(period, &spendings))
}
