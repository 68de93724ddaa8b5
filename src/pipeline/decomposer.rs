//! Message decomposer — raw RFC 5322 bytes into the fields the relay forwards.

use mail_parser::{Address, MessageParser, PartType};

use crate::error::MalformedMessage;

/// Subject used when the original has none.
pub const NO_SUBJECT: &str = "(no subject)";

/// Sender text used when the original has no usable From.
pub const UNKNOWN_SENDER: &str = "unknown sender";

/// The original message's primary sender.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sender {
    pub name: Option<String>,
    pub address: Option<String>,
}

impl std::fmt::Display for Sender {
    /// Display-plus-address text: `Alice <alice@x.com>`, `alice@x.com`, or `Alice`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.name, &self.address) {
            (Some(name), Some(address)) => write!(f, "{name} <{address}>"),
            (None, Some(address)) => f.write_str(address),
            (Some(name), None) => f.write_str(name),
            (None, None) => f.write_str(UNKNOWN_SENDER),
        }
    }
}

/// Decoded, read-only view of an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessage {
    pub sender: Sender,
    pub subject: String,
    /// Plain-text body, empty when the message has none.
    pub text_body: String,
    /// Rich body, only when the message carried a non-empty `text/html` part.
    pub html_body: Option<String>,
    /// Declared `To` addresses, in header order.
    pub recipients: Vec<String>,
}

impl ParsedMessage {
    /// Sender as display-plus-address text.
    pub fn sender_text(&self) -> String {
        self.sender.to_string()
    }
}

/// Parse raw message bytes.
///
/// Fails only when the input is not a mail message at all: empty input,
/// or nothing the parser recognizes as a header block.
pub fn parse(raw: &[u8]) -> Result<ParsedMessage, MalformedMessage> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Err(MalformedMessage::new("empty input"));
    }

    let message = MessageParser::default()
        .parse(raw)
        .ok_or_else(|| MalformedMessage::new("not a mail message"))?;

    if message.headers().is_empty() {
        return Err(MalformedMessage::new("no headers"));
    }

    let sender = message
        .from()
        .and_then(|addr| addr.first())
        .map(|a| Sender {
            name: a.name().map(str::to_string).filter(|s| !s.trim().is_empty()),
            address: a.address().map(str::to_string).filter(|s| !s.trim().is_empty()),
        })
        .unwrap_or_default();

    let subject = message
        .subject()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(NO_SUBJECT)
        .to_string();

    let text_body = message
        .body_text(0)
        .map(|t| t.into_owned())
        .unwrap_or_default();

    // body_html() synthesizes HTML from text-only messages; only a real
    // text/html part counts as a rich body.
    let html_body = message
        .html_body
        .first()
        .and_then(|id| message.parts.get(*id as usize))
        .and_then(|part| match &part.body {
            PartType::Html(html) if !html.trim().is_empty() => Some(html.to_string()),
            _ => None,
        });

    Ok(ParsedMessage {
        sender,
        subject,
        text_body,
        html_body,
        recipients: extract_addresses(message.to()),
    })
}

/// Extract addresses from an optional address header, flattening groups.
pub fn extract_addresses(addr: Option<&Address>) -> Vec<String> {
    let Some(addr) = addr else {
        return Vec::new();
    };
    match addr {
        Address::List(addrs) => addrs
            .iter()
            .filter_map(|a| a.address.as_ref().map(|s| s.to_string()))
            .collect(),
        Address::Group(groups) => groups
            .iter()
            .flat_map(|g| {
                g.addresses
                    .iter()
                    .filter_map(|a| a.address.as_ref().map(|s| s.to_string()))
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = "From: Alice Example <alice@x.com>\r\n\
        To: info@chirpy.studio, Unknown <unknown@chirpy.studio>\r\n\
        Subject: Test\r\n\
        Message-ID: <1@x.com>\r\n\
        \r\n\
        Hello\r\n";

    const ALTERNATIVE: &str = "From: a@x.com\r\n\
        To: alerts@chirpy.studio\r\n\
        Subject: Rich\r\n\
        MIME-Version: 1.0\r\n\
        Content-Type: multipart/alternative; boundary=\"b1\"\r\n\
        \r\n\
        --b1\r\n\
        Content-Type: text/plain; charset=utf-8\r\n\
        \r\n\
        Plain version\r\n\
        --b1\r\n\
        Content-Type: text/html; charset=utf-8\r\n\
        \r\n\
        <p>Rich <b>version</b></p>\r\n\
        --b1--\r\n";

    #[test]
    fn parses_simple_message() {
        let parsed = parse(SIMPLE.as_bytes()).unwrap();
        assert_eq!(parsed.sender_text(), "Alice Example <alice@x.com>");
        assert_eq!(parsed.subject, "Test");
        assert!(parsed.text_body.contains("Hello"));
        assert!(parsed.html_body.is_none());
        assert_eq!(
            parsed.recipients,
            vec!["info@chirpy.studio", "unknown@chirpy.studio"]
        );
    }

    #[test]
    fn parses_alternative_message() {
        let parsed = parse(ALTERNATIVE.as_bytes()).unwrap();
        assert_eq!(parsed.sender_text(), "a@x.com");
        assert!(parsed.text_body.contains("Plain version"));
        let html = parsed.html_body.expect("html part");
        assert!(html.contains("<p>Rich <b>version</b></p>"));
    }

    #[test]
    fn missing_subject_uses_placeholder() {
        let raw = "From: a@x.com\r\nTo: info@chirpy.studio\r\n\r\nbody\r\n";
        let parsed = parse(raw.as_bytes()).unwrap();
        assert_eq!(parsed.subject, NO_SUBJECT);
    }

    #[test]
    fn missing_from_uses_unknown_sender() {
        let raw = "To: info@chirpy.studio\r\nSubject: x\r\n\r\nbody\r\n";
        let parsed = parse(raw.as_bytes()).unwrap();
        assert_eq!(parsed.sender, Sender::default());
        assert_eq!(parsed.sender_text(), UNKNOWN_SENDER);
    }

    #[test]
    fn missing_body_is_empty_string() {
        let raw = "From: a@x.com\r\nTo: info@chirpy.studio\r\nSubject: x\r\n\r\n";
        let parsed = parse(raw.as_bytes()).unwrap();
        assert!(parsed.text_body.trim().is_empty());
        assert!(parsed.html_body.is_none());
    }

    #[test]
    fn missing_to_yields_no_recipients() {
        let raw = "From: a@x.com\r\nSubject: x\r\n\r\nbody\r\n";
        let parsed = parse(raw.as_bytes()).unwrap();
        assert!(parsed.recipients.is_empty());
    }

    #[test]
    fn group_recipients_are_flattened() {
        let raw = "From: a@x.com\r\n\
            To: Lists: alerts@chirpy.studio, info@chirpy.studio;\r\n\
            Subject: x\r\n\r\nbody\r\n";
        let parsed = parse(raw.as_bytes()).unwrap();
        assert_eq!(
            parsed.recipients,
            vec!["alerts@chirpy.studio", "info@chirpy.studio"]
        );
    }

    #[test]
    fn empty_input_is_malformed() {
        assert!(parse(b"").is_err());
        assert!(parse(b"  \r\n\r\n").is_err());
    }

    #[test]
    fn sender_display_variants() {
        let named = Sender {
            name: Some("Bob".into()),
            address: None,
        };
        assert_eq!(named.to_string(), "Bob");
    }
}
