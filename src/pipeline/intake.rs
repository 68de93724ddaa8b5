//! Intake controller — runs each inbound event record through the relay.
//!
//! Per record:
//! 1. Fetch raw bytes from the object store (fatal for the record)
//! 2. Parse once (fatal for the record)
//! 3. For each declared `To` address: classify → look up subscribers →
//!    compose → dispatch
//!
//! Unknown lists and empty subscriber sets are skips. A compose or dispatch
//! failure fails only that recipient; later recipients and records still run.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::channels::dispatcher::{MailTransport, RelayDispatcher};
use crate::channels::smtp::{OutboxTransport, SmtpRelay};
use crate::config::{ObjectStoreConfig, RelayConfig, TransportConfig};
use crate::error::RecordError;
use crate::event::{EventRecord, ObjectLocation, StorageEvent};
use crate::pipeline::classifier::RecipientClassifier;
use crate::pipeline::composer::ForwardComposer;
use crate::pipeline::decomposer::{self, ParsedMessage};
use crate::pipeline::types::{
    BatchReport, HandlerResponse, InboundMessage, RecipientOutcome, RecipientReport,
    RecordOutcome, RecordReport, SkipReason,
};
use crate::store::directory::SubscriberDirectory;
use crate::store::object::{FsObjectStore, HttpObjectStore};
use crate::store::params::FsParameterStore;
use crate::store::traits::{ObjectStore, ParameterStore};

/// Explicitly constructed client handles the controller depends on.
pub struct IntakeDeps {
    pub objects: Arc<dyn ObjectStore>,
    pub parameters: Arc<dyn ParameterStore>,
    pub transport: Arc<dyn MailTransport>,
}

impl IntakeDeps {
    /// Build the production clients described by the configuration.
    pub fn from_config(config: &RelayConfig) -> crate::error::Result<Self> {
        let objects: Arc<dyn ObjectStore> = match &config.object_store {
            ObjectStoreConfig::Filesystem { root } => Arc::new(FsObjectStore::new(root.clone())),
            ObjectStoreConfig::Http { endpoint } => Arc::new(HttpObjectStore::new(endpoint.clone())),
        };

        let transport: Arc<dyn MailTransport> = match &config.transport {
            TransportConfig::Smtp(smtp) => Arc::new(SmtpRelay::new(smtp)?),
            TransportConfig::Outbox { dir } => Arc::new(OutboxTransport::new(dir.clone())?),
        };

        Ok(Self {
            objects,
            parameters: Arc::new(FsParameterStore::new(config.parameter_root.clone())),
            transport,
        })
    }
}

pub struct IntakeController {
    objects: Arc<dyn ObjectStore>,
    directory: SubscriberDirectory,
    classifier: RecipientClassifier,
    composer: ForwardComposer,
    dispatcher: RelayDispatcher,
    key_prefix: Option<String>,
}

impl IntakeController {
    pub fn new(config: &RelayConfig, deps: IntakeDeps) -> crate::error::Result<Self> {
        Ok(Self {
            objects: deps.objects,
            directory: SubscriberDirectory::new(deps.parameters, config.parameter_namespace.clone()),
            classifier: RecipientClassifier::new(&config.lists),
            composer: ForwardComposer::new(&config.domain, &config.noreply_local_part)?,
            dispatcher: RelayDispatcher::new(deps.transport),
            key_prefix: config.key_prefix.clone(),
        })
    }

    /// Event-triggered entry point: process every record, then summarize.
    pub async fn handle(&self, event: &StorageEvent) -> HandlerResponse {
        let report = self.handle_event(event).await;
        let response = HandlerResponse::from(&report);

        info!(
            records = report.records.len(),
            dispatched = report.dispatched(),
            failed_recipients = report.failed_recipients(),
            failed_records = report.failed_records().count(),
            status = response.status_code,
            "Batch complete"
        );
        response
    }

    /// Process every record of an event in order.
    pub async fn handle_event(&self, event: &StorageEvent) -> BatchReport {
        if let Ok(json) = serde_json::to_string(event) {
            debug!(event = %json, "Received event");
        }

        let mut report = BatchReport::default();
        for record in &event.records {
            report.records.push(self.handle_record(record).await);
        }
        report
    }

    async fn handle_record(&self, record: &EventRecord) -> RecordReport {
        let location = record.location();

        let outside_prefix = self
            .key_prefix
            .as_deref()
            .filter(|prefix| !location.key.starts_with(prefix));
        if let Some(prefix) = outside_prefix {
            warn!(
                bucket = %location.container,
                key = %location.key,
                prefix = %prefix,
                "Ignoring object outside the intake prefix"
            );
            return RecordReport {
                location,
                outcome: RecordOutcome::Ignored,
            };
        }

        info!(
            bucket = %location.container,
            key = %location.key,
            event_time = ?record.event_time,
            "Processing email"
        );

        let outcome = match self.process_record(&location).await {
            Ok(reports) => RecordOutcome::Processed(reports),
            Err(e) => {
                error!(
                    bucket = %location.container,
                    key = %location.key,
                    error = %e,
                    "Failed to process record"
                );
                RecordOutcome::Failed(e)
            }
        };

        RecordReport { location, outcome }
    }

    /// Fetch and parse one stored message, then relay it to each recipient.
    pub async fn process_record(
        &self,
        location: &ObjectLocation,
    ) -> Result<Vec<RecipientReport>, RecordError> {
        let inbound = self.fetch(location).await?;
        let parsed = decomposer::parse(&inbound.raw)?;

        if parsed.recipients.is_empty() {
            warn!(key = %location.key, "Message declares no To recipients");
        }

        let mut reports = Vec::with_capacity(parsed.recipients.len());
        for recipient in &parsed.recipients {
            let outcome = self.relay_to(&parsed, recipient).await;
            debug!(recipient = %recipient, outcome = outcome.label(), "Recipient done");
            reports.push(RecipientReport {
                recipient: recipient.clone(),
                outcome,
            });
        }
        Ok(reports)
    }

    async fn fetch(&self, location: &ObjectLocation) -> Result<InboundMessage, RecordError> {
        let raw = self
            .objects
            .get(&location.container, &location.key)
            .await?;
        debug!(
            store = self.objects.name(),
            key = %location.key,
            bytes = raw.len(),
            "Fetched raw message"
        );
        Ok(InboundMessage {
            location: location.clone(),
            raw,
        })
    }

    /// Relay the parsed message to the list named by one recipient address.
    pub async fn relay_to(&self, parsed: &ParsedMessage, recipient: &str) -> RecipientOutcome {
        let Some(list) = self.classifier.classify(recipient) else {
            info!(recipient = %recipient, "Unknown recipient, skipping");
            return RecipientOutcome::Skipped {
                reason: SkipReason::UnknownList,
            };
        };

        info!(list = %list, recipient = %recipient, "Email to list");

        let subscribers = self.directory.lookup(&list).await;
        info!(list = %list, count = subscribers.len(), "Found subscribers");
        if subscribers.is_empty() {
            info!(list = %list, "No subscribers, skipping forward");
            return RecipientOutcome::Skipped {
                reason: SkipReason::NoSubscribers,
            };
        }

        let forwarded = match self.composer.compose(parsed, recipient, &subscribers) {
            Ok(forwarded) => forwarded,
            Err(e) => {
                error!(list = %list, recipient = %recipient, error = %e, "Failed to compose forward");
                return RecipientOutcome::Failed {
                    list,
                    reason: e.to_string(),
                };
            }
        };

        match self.dispatcher.send(&forwarded).await {
            Ok(()) => {
                info!(
                    list = %list,
                    sender = %parsed.sender_text(),
                    subscribers = forwarded.to.len(),
                    "Forwarded email"
                );
                RecipientOutcome::Dispatched {
                    list,
                    subscribers: forwarded.to.len(),
                }
            }
            Err(e) => {
                error!(
                    list = %list,
                    recipient = %recipient,
                    transport = self.dispatcher.transport_name(),
                    error = %e,
                    "Failed to dispatch forward"
                );
                RecipientOutcome::Failed {
                    list,
                    reason: e.to_string(),
                }
            }
        }
    }
}
