//! Mail transports backed by lettre — SMTP relay and a `.eml` outbox.
//!
//! Both lettre transports are blocking; sends run on `spawn_blocking`.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use lettre::address::Envelope;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, FileTransport, SmtpTransport, Transport};
use secrecy::ExposeSecret;
use tracing::debug;

use crate::channels::dispatcher::{MailTransport, OutboundPayload};
use crate::config::SmtpConfig;
use crate::error::DispatchError;

/// Port that speaks TLS from the first byte; everything else uses STARTTLS.
const IMPLICIT_TLS_PORT: u16 = 465;

/// Build a lettre envelope from a payload's sender and recipients.
pub fn envelope_for(payload: &OutboundPayload) -> Result<Envelope, DispatchError> {
    let sender = payload
        .sender
        .as_deref()
        .map(str::parse::<Address>)
        .transpose()
        .map_err(|e| DispatchError::InvalidEnvelope(format!("sender: {e}")))?;

    let recipients = payload
        .recipients
        .iter()
        .map(|r| {
            r.parse::<Address>()
                .map_err(|e| DispatchError::InvalidEnvelope(format!("recipient {r}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Envelope::new(sender, recipients).map_err(|e| DispatchError::InvalidEnvelope(e.to_string()))
}

// ── SMTP ────────────────────────────────────────────────────────────

/// SMTP relay (e.g. an SES SMTP endpoint).
pub struct SmtpRelay {
    host: String,
    transport: Arc<SmtpTransport>,
}

impl SmtpRelay {
    pub fn new(config: &SmtpConfig) -> Result<Self, DispatchError> {
        let builder = if config.tls {
            let builder = if config.port == IMPLICIT_TLS_PORT {
                SmtpTransport::relay(&config.host)
            } else {
                SmtpTransport::starttls_relay(&config.host)
            };
            builder.map_err(|e| DispatchError::Transport {
                transport: "smtp".into(),
                reason: format!("SMTP relay error: {e}"),
            })?
        } else {
            SmtpTransport::builder_dangerous(&config.host)
        };

        let mut builder = builder.port(config.port);
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.expose_secret().to_string(),
            ));
        }

        Ok(Self {
            host: config.host.clone(),
            transport: Arc::new(builder.build()),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpRelay {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn send_raw(&self, payload: &OutboundPayload) -> Result<(), DispatchError> {
        let envelope = envelope_for(payload)?;
        let data = payload.data.clone();
        let transport = Arc::clone(&self.transport);

        let result = tokio::task::spawn_blocking(move || transport.send_raw(&envelope, &data))
            .await
            .map_err(|e| DispatchError::Transport {
                transport: "smtp".into(),
                reason: format!("send task panicked: {e}"),
            })?;

        match result {
            Ok(response) => {
                debug!(host = %self.host, code = %response.code(), "SMTP accepted message");
                Ok(())
            }
            Err(e) if e.is_permanent() => Err(DispatchError::Rejected {
                transport: "smtp".into(),
                reason: e.to_string(),
            }),
            Err(e) => Err(DispatchError::Transport {
                transport: "smtp".into(),
                reason: e.to_string(),
            }),
        }
    }
}

// ── Outbox ──────────────────────────────────────────────────────────

/// Writes each message as `<uuid>.eml` into a directory instead of sending.
pub struct OutboxTransport {
    dir: PathBuf,
    transport: Arc<FileTransport>,
}

impl OutboxTransport {
    /// Create the outbox, making the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, DispatchError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| DispatchError::Transport {
            transport: "outbox".into(),
            reason: format!("cannot create {}: {e}", dir.display()),
        })?;
        Ok(Self {
            transport: Arc::new(FileTransport::new(&dir)),
            dir,
        })
    }
}

#[async_trait]
impl MailTransport for OutboxTransport {
    fn name(&self) -> &str {
        "outbox"
    }

    async fn send_raw(&self, payload: &OutboundPayload) -> Result<(), DispatchError> {
        let envelope = envelope_for(payload)?;
        let data = payload.data.clone();
        let transport = Arc::clone(&self.transport);

        let id = tokio::task::spawn_blocking(move || transport.send_raw(&envelope, &data))
            .await
            .map_err(|e| DispatchError::Transport {
                transport: "outbox".into(),
                reason: format!("write task panicked: {e}"),
            })?
            .map_err(|e| DispatchError::Transport {
                transport: "outbox".into(),
                reason: e.to_string(),
            })?;

        debug!(dir = %self.dir.display(), id = %id, "Wrote message to outbox");
        Ok(())
    }
}
