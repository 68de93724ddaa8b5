//! Shared types for the relay pipeline.

use serde::Serialize;

use crate::error::RecordError;
use crate::event::ObjectLocation;

// ── Inbound message ─────────────────────────────────────────────────

/// Raw message bytes plus where they were read from.
///
/// Owned by the intake controller for one processing cycle.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub location: ObjectLocation,
    pub raw: Vec<u8>,
}

// ── Lists and subscribers ───────────────────────────────────────────

/// Normalized (lower-cased) name of a subscriber list, e.g. `alerts`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ListName(String);

impl ListName {
    /// Callers are expected to pass an already-normalized name.
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ListName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered destination addresses for a list. Empty means "nothing to do".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriberSet(Vec<String>);

impl SubscriberSet {
    pub fn new(addresses: Vec<String>) -> Self {
        Self(addresses)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for SubscriberSet {
    fn from(addresses: Vec<String>) -> Self {
        Self(addresses)
    }
}

// ── Outcomes ────────────────────────────────────────────────────────

/// Why a recipient produced no forwarded message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Local part does not name a known list.
    UnknownList,
    /// The list resolved to an empty subscriber set (or the lookup failed).
    NoSubscribers,
}

/// Terminal state of one declared recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecipientOutcome {
    Skipped { reason: SkipReason },
    Dispatched { list: ListName, subscribers: usize },
    Failed { list: ListName, reason: String },
}

impl RecipientOutcome {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Skipped { .. } => "skipped",
            Self::Dispatched { .. } => "dispatched",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Outcome for one recipient address of a record.
#[derive(Debug, Clone, Serialize)]
pub struct RecipientReport {
    pub recipient: String,
    #[serde(flatten)]
    pub outcome: RecipientOutcome,
}

/// Result of processing one event record.
#[derive(Debug)]
pub enum RecordOutcome {
    /// Fetched and parsed; every recipient has a report.
    Processed(Vec<RecipientReport>),
    /// Key outside the accepted prefix; nothing fetched.
    Ignored,
    /// Fetch or parse failed; no recipient was processed.
    Failed(RecordError),
}

#[derive(Debug)]
pub struct RecordReport {
    pub location: ObjectLocation,
    pub outcome: RecordOutcome,
}

/// Aggregate of one handler invocation.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub records: Vec<RecordReport>,
}

impl BatchReport {
    /// Records whose fetch or parse failed.
    pub fn failed_records(&self) -> impl Iterator<Item = &RecordReport> {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, RecordOutcome::Failed(_)))
    }

    /// Per-recipient reports across all processed records.
    pub fn recipients(&self) -> impl Iterator<Item = &RecipientReport> {
        self.records.iter().flat_map(|r| match &r.outcome {
            RecordOutcome::Processed(reports) => reports.as_slice(),
            _ => &[],
        })
    }

    /// Count of recipients that were dispatched.
    pub fn dispatched(&self) -> usize {
        self.recipients()
            .filter(|r| matches!(r.outcome, RecipientOutcome::Dispatched { .. }))
            .count()
    }

    /// Count of recipients whose compose or dispatch failed.
    pub fn failed_recipients(&self) -> usize {
        self.recipients()
            .filter(|r| matches!(r.outcome, RecipientOutcome::Failed { .. }))
            .count()
    }
}

// ── Handler response ────────────────────────────────────────────────

/// What the invoking platform sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl HandlerResponse {
    pub fn ok() -> Self {
        Self {
            status_code: 200,
            body: "OK".to_string(),
        }
    }
}

impl From<&BatchReport> for HandlerResponse {
    /// 200 unless a record could not be fetched or parsed.
    fn from(report: &BatchReport) -> Self {
        let failures: Vec<String> = report
            .records
            .iter()
            .filter_map(|r| match &r.outcome {
                RecordOutcome::Failed(e) => Some(format!("{}: {e}", r.location)),
                _ => None,
            })
            .collect();

        if failures.is_empty() {
            Self::ok()
        } else {
            Self {
                status_code: 500,
                body: failures.join("; "),
            }
        }
    }
}
