//! One fetch → process → reply cycle
//!
//! Messages are handled strictly in delivery order. A failure on one message
//! is logged and counted; it never stops the rest of the batch. Only a failed
//! fetch fails the whole run.

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::gateway::MessageGateway;
use crate::models::{BatchSummary, BotCommand, InboundMessage};
use crate::processor::{ProcessOutcome, UpdateProcessor};
use crate::report::{build_report, ReportPeriod, REPORT_FAILED};
use crate::store::RecordStore;

/// Run a single batch
///
/// `clock` is sampled once per message and supplies both the default
/// effective date and the report window end.
pub async fn run_batch<S, G, C>(store: &S, gateway: &G, clock: C) -> Result<BatchSummary>
where
    S: RecordStore + Sync,
    G: MessageGateway,
    C: Fn() -> DateTime<Utc>,
{
    let messages = gateway.fetch_messages().await?;
    let mut summary = BatchSummary {
        received: messages.len(),
        ..Default::default()
    };

    let processor = UpdateProcessor::new(store);

    for message in &messages {
        let now = clock();
        match message.command {
            Some(command) => {
                answer_report(store, gateway, message, command, now, &mut summary).await;
            }
            None => match processor.process_message(message, now) {
                Ok(ProcessOutcome::Ignored) => summary.ignored += 1,
                Ok(ProcessOutcome::Created(_)) => summary.created += 1,
                Ok(ProcessOutcome::Updated(_)) => summary.updated += 1,
                Err(e) => {
                    error!(
                        message_id = message.message_id,
                        chat_id = message.chat_id,
                        "Failed to process message: {}",
                        e
                    );
                    summary.failed += 1;
                }
            },
        }
    }

    if let Some(last_update_id) = messages.iter().map(|m| m.update_id).max() {
        if let Err(e) = gateway.confirm(last_update_id).await {
            warn!(last_update_id, "Failed to acknowledge updates: {}", e);
        }
    }

    info!(
        received = summary.received,
        created = summary.created,
        updated = summary.updated,
        ignored = summary.ignored,
        reports_sent = summary.reports_sent,
        failed = summary.failed,
        "Batch complete"
    );
    Ok(summary)
}

async fn answer_report<S, G>(
    store: &S,
    gateway: &G,
    message: &InboundMessage,
    command: BotCommand,
    now: DateTime<Utc>,
    summary: &mut BatchSummary,
) where
    S: RecordStore + Sync,
    G: MessageGateway,
{
    let period = ReportPeriod::from(command);
    debug!(chat_id = message.chat_id, %command, "Generating report");

    let (reply, built) = match build_report(store, period, now) {
        Ok(report) => (report.render(), true),
        Err(e) => {
            error!(chat_id = message.chat_id, %period, "Failed to generate report: {}", e);
            (REPORT_FAILED.to_string(), false)
        }
    };

    match gateway.send_message(message.chat_id, &reply).await {
        Ok(()) if built => summary.reports_sent += 1,
        Ok(()) => summary.failed += 1,
        Err(e) => {
            warn!(chat_id = message.chat_id, "Failed to send report: {}", e);
            summary.failed += 1;
        }
    }
}
