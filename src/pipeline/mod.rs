//! Relay pipeline.
//!
//! Every stored message flows through:
//! 1. `decomposer::parse()` — raw bytes into sender, subject, bodies, recipients
//! 2. `RecipientClassifier::classify()` — recipient address to list name
//! 3. `ForwardComposer::compose()` — a forward addressed to the list's subscribers
//!
//! `IntakeController` drives the steps per event record and hands each
//! composed forward to the dispatcher.

pub mod classifier;
pub mod composer;
pub mod decomposer;
pub mod intake;
pub mod types;

pub use classifier::RecipientClassifier;
pub use composer::{ForwardComposer, ForwardedMessage};
pub use decomposer::{ParsedMessage, Sender};
pub use intake::{IntakeController, IntakeDeps};
pub use types::{BatchReport, HandlerResponse, RecipientOutcome, RecordOutcome};
