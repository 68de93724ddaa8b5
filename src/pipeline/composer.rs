//! Forward composer — builds the outbound message that embeds the original.
//!
//! The message is assembled with lettre's structured builder: headers are
//! typed, long values are folded, and multipart boundaries are random per
//! message rather than derived from the clock.

use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::{Address, Message};
use tracing::warn;
use uuid::Uuid;

use crate::error::ComposeError;
use crate::pipeline::decomposer::ParsedMessage;
use crate::pipeline::types::SubscriberSet;

/// Separator line opening the forwarded block.
pub const FORWARD_SEPARATOR: &str = "---------- Forwarded message ----------";

const PREAMBLE_STYLE: &str =
    "border-left: 2px solid #ccc; padding-left: 10px; margin-bottom: 20px; color: #666;";

/// A composed outbound message, ready for dispatch.
#[derive(Debug, Clone)]
pub struct ForwardedMessage {
    /// Original recipient the forward masquerades as.
    pub target: String,
    /// Rendered `From` value.
    pub from: String,
    /// Rendered `Reply-To` value, absent when the original sender is unusable.
    pub reply_to: Option<String>,
    /// Accepted subscriber addresses, in list order.
    pub to: Vec<String>,
    pub subject: String,
    pub text_body: String,
    pub html_body: Option<String>,
    message: Message,
}

impl ForwardedMessage {
    /// `To` header text: subscribers joined with `", "`.
    pub fn to_header(&self) -> String {
        self.to.join(", ")
    }

    pub fn has_html_part(&self) -> bool {
        self.html_body.is_some()
    }

    /// The structured message.
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Serialized RFC 5322 bytes.
    pub fn formatted(&self) -> Vec<u8> {
        self.message.formatted()
    }
}

/// Builds forwarded messages for one forwarding domain.
#[derive(Debug, Clone)]
pub struct ForwardComposer {
    domain: String,
    noreply: Address,
}

impl ForwardComposer {
    /// `noreply_local_part@domain` is the fixed From address of every forward.
    pub fn new(domain: &str, noreply_local_part: &str) -> Result<Self, ComposeError> {
        let address = format!("{noreply_local_part}@{domain}");
        let noreply = address
            .parse::<Address>()
            .map_err(|e| ComposeError::InvalidAddress {
                address,
                reason: e.to_string(),
            })?;
        Ok(Self {
            domain: domain.to_string(),
            noreply,
        })
    }

    /// Compose the forward of `original` as received by `target`, addressed to
    /// `subscribers`.
    ///
    /// Subscriber entries that are not valid addresses are skipped; the
    /// compose fails if none remain.
    pub fn compose(
        &self,
        original: &ParsedMessage,
        target: &str,
        subscribers: &SubscriberSet,
    ) -> Result<ForwardedMessage, ComposeError> {
        if subscribers.is_empty() {
            return Err(ComposeError::NoSubscribers);
        }

        let mut to = Vec::with_capacity(subscribers.len());
        let mut mailboxes = Vec::with_capacity(subscribers.len());
        for subscriber in subscribers.iter() {
            match subscriber.parse::<Mailbox>() {
                Ok(mailbox) => {
                    mailboxes.push(mailbox);
                    to.push(subscriber.to_string());
                }
                Err(e) => {
                    warn!(
                        subscriber = %subscriber,
                        recipient = %target,
                        error = %e,
                        "Skipping invalid subscriber address"
                    );
                }
            }
        }
        if to.is_empty() {
            return Err(ComposeError::NoValidRecipients {
                target: target.to_string(),
            });
        }

        let from = Mailbox::new(Some(target.to_string()), self.noreply.clone());
        let sender_text = original.sender_text();
        let subject = format!("[{target}] {}", original.subject);
        let text_body = plain_text_body(original, target);
        let html_body = original
            .html_body
            .as_deref()
            .filter(|html| !html.trim().is_empty())
            .map(|html| html_text_body(original, target, html));

        let reply_to = reply_to_mailbox(original);
        if reply_to.is_none() {
            warn!(sender = %sender_text, "Original sender has no usable address, omitting Reply-To");
        }

        let mut builder = Message::builder()
            .from(from.clone())
            .subject(subject.clone())
            .message_id(Some(format!("<{}@{}>", Uuid::new_v4(), self.domain)));
        for mailbox in mailboxes {
            builder = builder.to(mailbox);
        }
        if let Some(ref mailbox) = reply_to {
            builder = builder.reply_to(mailbox.clone());
        }

        let mut body = MultiPart::alternative().singlepart(SinglePart::plain(text_body.clone()));
        if let Some(ref html) = html_body {
            body = body.singlepart(SinglePart::html(html.clone()));
        }

        let message = builder
            .multipart(body)
            .map_err(|e| ComposeError::Build(e.to_string()))?;

        Ok(ForwardedMessage {
            target: target.to_string(),
            from: from.to_string(),
            reply_to: reply_to.map(|m| m.to_string()),
            to,
            subject,
            text_body,
            html_body,
            message,
        })
    }
}

fn reply_to_mailbox(original: &ParsedMessage) -> Option<Mailbox> {
    let address = original.sender.address.as_deref()?.parse::<Address>().ok()?;
    Some(Mailbox::new(original.sender.name.clone(), address))
}

/// Plain part: separator, echo lines, blank line, original body verbatim.
fn plain_text_body(original: &ParsedMessage, target: &str) -> String {
    [
        FORWARD_SEPARATOR.to_string(),
        format!("From: {}", original.sender_text()),
        format!("To: {target}"),
        format!("Subject: {}", original.subject),
        String::new(),
        original.text_body.clone(),
    ]
    .join("\r\n")
}

/// HTML part: bordered, muted preamble, then the original rich body unmodified.
fn html_text_body(original: &ParsedMessage, target: &str, html: &str) -> String {
    [
        format!("<div style=\"{PREAMBLE_STYLE}\">"),
        format!("<strong>{FORWARD_SEPARATOR}</strong><br>"),
        format!("From: {}<br>", escape_html(&original.sender_text())),
        format!("To: {}<br>", escape_html(target)),
        format!("Subject: {}", escape_html(&original.subject)),
        "</div>".to_string(),
        html.to_string(),
    ]
    .join("\r\n")
}

/// Escape text for inclusion in the HTML preamble.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
