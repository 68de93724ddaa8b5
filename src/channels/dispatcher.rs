//! Relay dispatcher — hands composed messages to the outbound transport.
//!
//! There is no local retry: a rejected or failed send is reported to the
//! caller as a per-recipient failure.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::DispatchError;
use crate::pipeline::composer::ForwardedMessage;

/// A serialized message plus its SMTP envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundPayload {
    pub sender: Option<String>,
    pub recipients: Vec<String>,
    pub data: Vec<u8>,
}

impl OutboundPayload {
    /// Wrap a composed message as a raw transport payload.
    pub fn from_message(message: &ForwardedMessage) -> Self {
        let envelope = message.message().envelope();
        Self {
            sender: envelope.from().map(ToString::to_string),
            recipients: envelope.to().iter().map(ToString::to_string).collect(),
            data: message.formatted(),
        }
    }
}

/// An outbound mail transport accepting raw messages.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Transport name for logs and errors.
    fn name(&self) -> &str;

    /// Submit a raw message. `Ok` means the transport accepted it.
    async fn send_raw(&self, payload: &OutboundPayload) -> Result<(), DispatchError>;
}

pub struct RelayDispatcher {
    transport: Arc<dyn MailTransport>,
}

impl RelayDispatcher {
    pub fn new(transport: Arc<dyn MailTransport>) -> Self {
        Self { transport }
    }

    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }

    /// Send one forwarded message.
    pub async fn send(&self, message: &ForwardedMessage) -> Result<(), DispatchError> {
        let payload = OutboundPayload::from_message(message);
        if payload.recipients.is_empty() {
            return Err(DispatchError::InvalidEnvelope(
                "message has no envelope recipients".into(),
            ));
        }

        debug!(
            transport = self.transport.name(),
            bytes = payload.data.len(),
            recipients = payload.recipients.len(),
            "Submitting forwarded message"
        );

        self.transport.send_raw(&payload).await?;

        info!(
            target_address = %message.target,
            subscribers = payload.recipients.len(),
            "Forwarded message accepted by transport"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::pipeline::composer::ForwardComposer;
    use crate::pipeline::decomposer::{ParsedMessage, Sender};

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<OutboundPayload>>,
        reject: bool,
    }

    #[async_trait]
    impl MailTransport for RecordingTransport {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send_raw(&self, payload: &OutboundPayload) -> Result<(), DispatchError> {
            if self.reject {
                return Err(DispatchError::Rejected {
                    transport: "recording".into(),
                    reason: "554 quota exceeded".into(),
                });
            }
            self.sent.lock().unwrap().push(payload.clone());
            Ok(())
        }
    }

    fn forwarded() -> ForwardedMessage {
        let original = ParsedMessage {
            sender: Sender {
                name: None,
                address: Some("a@x.com".into()),
            },
            subject: "Test".into(),
            text_body: "Hello".into(),
            html_body: None,
            recipients: vec!["alerts@chirpy.studio".into()],
        };
        ForwardComposer::new("chirpy.studio", "noreply")
            .unwrap()
            .compose(
                &original,
                "alerts@chirpy.studio",
                &vec!["s1@y.com".to_string(), "s2@y.com".to_string()].into(),
            )
            .unwrap()
    }

    #[test]
    fn payload_uses_message_envelope() {
        let payload = OutboundPayload::from_message(&forwarded());
        assert_eq!(payload.sender.as_deref(), Some("noreply@chirpy.studio"));
        assert_eq!(payload.recipients, vec!["s1@y.com", "s2@y.com"]);
        assert!(String::from_utf8_lossy(&payload.data).contains("Hello"));
    }

    #[tokio::test]
    async fn send_submits_one_payload() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = RelayDispatcher::new(transport.clone());
        dispatcher.send(&forwarded()).await.unwrap();
        assert_eq!(transport.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejection_is_surfaced() {
        let transport = Arc::new(RecordingTransport {
            reject: true,
            ..Default::default()
        });
        let dispatcher = RelayDispatcher::new(transport);
        let err = dispatcher.send(&forwarded()).await.unwrap_err();
        assert!(matches!(err, DispatchError::Rejected { .. }));
    }
}
