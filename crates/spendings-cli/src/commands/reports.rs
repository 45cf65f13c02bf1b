//! Report command implementation

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use spendings_core::{build_report, Config, Database, ReportPeriod};

use super::open_db;

pub fn cmd_report(config: &Config, no_encrypt: bool, last_month: bool) -> Result<()> {
    let db = open_db(config, no_encrypt)?;
    let period = if last_month {
        ReportPeriod::LastMonth
    } else {
        ReportPeriod::CurrentMonth
    };

    println!("{}", render_report(&db, period, Utc::now())?);
    Ok(())
}

pub fn render_report(db: &Database, period: ReportPeriod, now: DateTime<Utc>) -> Result<String> {
    let report = build_report(db, period, now).context("Failed to generate report")?;
    Ok(report.render())
}
