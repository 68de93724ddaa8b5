//! Outbound mail: the dispatcher and the transports it can submit to.

pub mod dispatcher;
pub mod smtp;

pub use dispatcher::{MailTransport, OutboundPayload, RelayDispatcher};
pub use smtp::{OutboxTransport, SmtpRelay};
