//! EIP-4361 message codec
//!
//! Wraps [`siwe::Message`], which owns the grammar and the canonical text
//! rendering. On top of it `parse` only accepts text that `Display` would
//! reproduce byte for byte, so the signed bytes and the structured fields
//! can never disagree.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, SecondsFormat, Utc};
use hex::FromHex;
use regex::Regex;
use thiserror::Error;

use super::address::is_valid_address;

static NONCE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new("^[A-Za-z0-9]{8,}$").unwrap());

/// Errors produced while parsing or building a message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MessageError {
    #[error("message is empty")]
    Empty,

    #[error("{0}")]
    Syntax(String),

    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("message is not in canonical form")]
    NotCanonical,
}

/// Render an instant the way issued messages carry it
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Check that `raw` is a valid RFC 3986 authority
pub fn is_valid_domain(raw: &str) -> bool {
    raw.parse::<http::uri::Authority>().is_ok()
}

/// Plain field values for building a [`SiweMessage`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageFields {
    pub domain: String,
    pub address: String,
    pub statement: Option<String>,
    pub uri: String,
    pub version: String,
    pub chain_id: u64,
    pub nonce: String,
    pub issued_at: DateTime<Utc>,
    pub expiration_time: Option<DateTime<Utc>>,
    pub not_before: Option<DateTime<Utc>>,
    pub request_id: Option<String>,
    pub resources: Vec<String>,
}

/// Validated sign-in message
///
/// Timestamps keep the text they were read from; the instants are decoded
/// once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiweMessage {
    inner: siwe::Message,
    issued_at: DateTime<Utc>,
    expiration_time: Option<DateTime<Utc>>,
    not_before: Option<DateTime<Utc>>,
}

impl SiweMessage {
    /// Parse a message from its canonical text form
    pub fn parse(text: &str) -> Result<Self, MessageError> {
        if text.is_empty() {
            return Err(MessageError::Empty);
        }

        let inner = siwe::Message::from_str(text).map_err(|e| MessageError::Syntax(e.to_string()))?;
        let message = Self::from_siwe(inner)?;

        if message.to_string() != text {
            return Err(MessageError::NotCanonical);
        }

        Ok(message)
    }

    fn from_siwe(inner: siwe::Message) -> Result<Self, MessageError> {
        if inner.chain_id == 0 {
            return Err(invalid("Chain ID", "must be a positive integer"));
        }
        if !NONCE_REGEX.is_match(&inner.nonce) {
            return Err(invalid("Nonce", "expected at least 8 alphanumeric characters"));
        }

        let issued_at = instant(&inner.issued_at, "Issued At")?;
        let expiration_time = inner
            .expiration_time
            .as_ref()
            .map(|t| instant(t, "Expiration Time"))
            .transpose()?;
        let not_before = inner
            .not_before
            .as_ref()
            .map(|t| instant(t, "Not Before"))
            .transpose()?;

        Ok(Self {
            inner,
            issued_at,
            expiration_time,
            not_before,
        })
    }

    pub fn domain(&self) -> &str {
        self.inner.domain.as_str()
    }

    /// Signer address in EIP-55 form
    pub fn address(&self) -> String {
        siwe::eip55(&self.inner.address)
    }

    pub fn statement(&self) -> Option<&str> {
        self.inner.statement.as_deref()
    }

    pub fn uri(&self) -> &str {
        self.inner.uri.as_str()
    }

    pub fn version(&self) -> String {
        (self.inner.version as u64).to_string()
    }

    pub fn chain_id(&self) -> u64 {
        self.inner.chain_id
    }

    pub fn nonce(&self) -> &str {
        &self.inner.nonce
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expiration_time(&self) -> Option<DateTime<Utc>> {
        self.expiration_time
    }

    pub fn not_before(&self) -> Option<DateTime<Utc>> {
        self.not_before
    }

    pub fn request_id(&self) -> Option<&str> {
        self.inner.request_id.as_deref()
    }

    pub fn resources(&self) -> Vec<&str> {
        self.inner.resources.iter().map(|r| r.as_str()).collect()
    }

    pub(crate) fn as_siwe(&self) -> &siwe::Message {
        &self.inner
    }
}

impl TryFrom<MessageFields> for SiweMessage {
    type Error = MessageError;

    fn try_from(fields: MessageFields) -> Result<Self, Self::Error> {
        let resources = fields
            .resources
            .iter()
            .map(|r| r.parse().map_err(|e| invalid("resource", e)))
            .collect::<Result<Vec<_>, _>>()?;

        let inner = siwe::Message {
            domain: fields
                .domain
                .parse::<http::uri::Authority>()
                .map_err(|e| invalid("domain", e))?,
            address: parse_address(&fields.address)?,
            statement: fields.statement,
            uri: fields.uri.parse().map_err(|e| invalid("URI", e))?,
            version: fields
                .version
                .parse::<siwe::Version>()
                .map_err(|e| invalid("Version", e))?,
            chain_id: fields.chain_id,
            nonce: fields.nonce,
            issued_at: timestamp(fields.issued_at, "Issued At")?,
            expiration_time: fields
                .expiration_time
                .map(|t| timestamp(t, "Expiration Time"))
                .transpose()?,
            not_before: fields
                .not_before
                .map(|t| timestamp(t, "Not Before"))
                .transpose()?,
            request_id: fields.request_id,
            resources,
        };

        // Free-text fields could still smuggle in line breaks
        let text = Self::from_siwe(inner)?.to_string();
        Self::parse(&text)
    }
}

impl FromStr for SiweMessage {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SiweMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

fn parse_address(raw: &str) -> Result<[u8; 20], MessageError> {
    if !is_valid_address(raw) {
        return Err(invalid("address", "not an EIP-55 address"));
    }

    <[u8; 20]>::from_hex(&raw[2..]).map_err(|e| invalid("address", e))
}

fn timestamp(instant: DateTime<Utc>, field: &'static str) -> Result<siwe::TimeStamp, MessageError> {
    format_timestamp(instant)
        .parse::<siwe::TimeStamp>()
        .map_err(|e| invalid(field, e))
}

fn instant(timestamp: &siwe::TimeStamp, field: &'static str) -> Result<DateTime<Utc>, MessageError> {
    DateTime::parse_from_rfc3339(&timestamp.to_string())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| invalid(field, e))
}

fn invalid(field: &'static str, reason: impl fmt::Display) -> MessageError {
    MessageError::InvalidField {
        field,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    const ADDRESS: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    fn issued_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn fields() -> MessageFields {
        MessageFields {
            domain: "app.example".to_string(),
            address: ADDRESS.to_string(),
            statement: Some("Sign in".to_string()),
            uri: "https://app.example/login".to_string(),
            version: "1".to_string(),
            chain_id: 1,
            nonce: "32891756abcdEFGH".to_string(),
            issued_at: issued_at(),
            expiration_time: Some(issued_at() + Duration::minutes(5)),
            not_before: None,
            request_id: None,
            resources: Vec::new(),
        }
    }

    fn sample() -> SiweMessage {
        SiweMessage::try_from(fields()).unwrap()
    }

    #[test]
    fn test_serialize_canonical_text() {
        let expected = "app.example wants you to sign in with your Ethereum account:\n\
0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed\n\
\n\
Sign in\n\
\n\
URI: https://app.example/login\n\
Version: 1\n\
Chain ID: 1\n\
Nonce: 32891756abcdEFGH\n\
Issued At: 2024-05-01T12:00:00.000Z\n\
Expiration Time: 2024-05-01T12:05:00.000Z";

        assert_eq!(sample().to_string(), expected);
        assert_eq!(sample().to_string(), sample().to_string());
    }

    #[test]
    fn test_round_trip_field_combinations() {
        let resources = vec![
            "ipfs://bafybeiemxf5abjwjbikoz4mc3a3dla6ual3jsgpdr4cjr3oz3evfyavhwq".to_string(),
            "https://example.com/my-web2-claim.json".to_string(),
        ];

        let cases: Vec<(&str, fn(&mut MessageFields))> = vec![
            ("all defaults", |_| {}),
            ("no statement", |f| f.statement = None),
            ("no expiration", |f| f.expiration_time = None),
            ("not before", |f| f.not_before = Some(f.issued_at)),
            ("request id", |f| f.request_id = Some("req-42".to_string())),
            ("single resource", |f| {
                f.resources = vec!["https://example.com/terms".to_string()]
            }),
            ("lowercase address", |f| f.address = ADDRESS.to_lowercase()),
            ("large chain id", |f| f.chain_id = u64::MAX),
            ("domain with port", |f| f.domain = "localhost:4361".to_string()),
        ];

        for (name, edit) in cases {
            let mut fields = fields();
            edit(&mut fields);
            let message = SiweMessage::try_from(fields).unwrap();
            let text = message.to_string();
            assert_eq!(SiweMessage::parse(&text).unwrap(), message, "{name}");
            assert_eq!(SiweMessage::parse(&text).unwrap().to_string(), text, "{name}");
        }

        let mut everything = fields();
        everything.statement = None;
        everything.expiration_time = None;
        everything.not_before = Some(issued_at());
        everything.request_id = Some("req-42".to_string());
        everything.resources = resources.clone();
        let message = SiweMessage::try_from(everything).unwrap();
        let text = message.to_string();

        assert!(text.contains(&format!("{ADDRESS}\n\n\nURI: ")));
        let parsed = SiweMessage::parse(&text).unwrap();
        assert_eq!(parsed.resources(), resources.iter().map(String::as_str).collect::<Vec<_>>());
        assert_eq!(parsed.request_id(), Some("req-42"));
        assert_eq!(parsed.not_before(), Some(issued_at()));
        assert_eq!(parsed.expiration_time(), None);
    }

    #[test]
    fn test_preserves_offset_timestamp_text() {
        let offsets = [
            ("2024-05-01T14:00:00+02:00", issued_at()),
            ("2024-05-01T07:30:00-04:30", issued_at()),
            ("2024-05-01T12:00:00.123456Z", issued_at() + Duration::microseconds(123_456)),
            ("2024-05-01T12:00:00Z", issued_at()),
        ];

        for (rendered, expected) in offsets {
            let text = sample()
                .to_string()
                .replace("2024-05-01T12:00:00.000Z", rendered);

            let parsed = SiweMessage::parse(&text).unwrap();
            assert_eq!(parsed.issued_at(), expected, "{rendered}");
            assert_eq!(parsed.to_string(), text, "{rendered}");
        }
    }

    #[test]
    fn test_accessors() {
        let message = sample();
        assert_eq!(message.domain(), "app.example");
        assert_eq!(message.address(), ADDRESS);
        assert_eq!(message.statement(), Some("Sign in"));
        assert_eq!(message.uri(), "https://app.example/login");
        assert_eq!(message.version(), "1");
        assert_eq!(message.chain_id(), 1);
        assert_eq!(message.nonce(), "32891756abcdEFGH");
        assert_eq!(message.issued_at(), issued_at());
        assert_eq!(
            message.expiration_time(),
            Some(issued_at() + Duration::minutes(5))
        );
    }

    #[test]
    fn test_rejects_bad_header() {
        let text = sample()
            .to_string()
            .replace("wants you to sign in", "wants you to log in");
        assert!(matches!(SiweMessage::parse(&text), Err(MessageError::Syntax(_))));
        assert_eq!(SiweMessage::parse(""), Err(MessageError::Empty));
    }

    #[test]
    fn test_rejects_missing_required_line() {
        let text = sample().to_string().replace("Version: 1\n", "");
        assert!(matches!(SiweMessage::parse(&text), Err(MessageError::Syntax(_))));
    }

    #[test]
    fn test_rejects_non_numeric_chain_id() {
        let text = sample().to_string().replace("Chain ID: 1", "Chain ID: one");
        assert!(matches!(SiweMessage::parse(&text), Err(MessageError::Syntax(_))));
    }

    #[test]
    fn test_rejects_non_canonical_chain_id() {
        for chain_id in ["+1", "01", "+01", "00001"] {
            let text = sample()
                .to_string()
                .replace("Chain ID: 1", &format!("Chain ID: {chain_id}"));
            assert_eq!(
                SiweMessage::parse(&text),
                Err(MessageError::NotCanonical),
                "{chain_id}"
            );
        }

        let text = sample().to_string().replace("Chain ID: 1", "Chain ID: 0");
        assert!(matches!(
            SiweMessage::parse(&text),
            Err(MessageError::InvalidField {
                field: "Chain ID",
                ..
            })
        ));

        let mut zero = fields();
        zero.chain_id = 0;
        assert!(SiweMessage::try_from(zero).is_err());
    }

    #[test]
    fn test_rejects_unsupported_version() {
        let text = sample().to_string().replace("Version: 1", "Version: 2");
        assert!(matches!(SiweMessage::parse(&text), Err(MessageError::Syntax(_))));

        let mut fields = fields();
        fields.version = "2".to_string();
        assert!(matches!(
            SiweMessage::try_from(fields),
            Err(MessageError::InvalidField { field: "Version", .. })
        ));
    }

    #[test]
    fn test_rejects_malformed_timestamp() {
        let text = sample()
            .to_string()
            .replace("2024-05-01T12:00:00.000Z", "yesterday");
        assert!(matches!(SiweMessage::parse(&text), Err(MessageError::Syntax(_))));
    }

    #[test]
    fn test_rejects_bad_address_and_nonce() {
        let text = sample().to_string().replace(ADDRESS, "0x1234");
        assert!(SiweMessage::parse(&text).is_err());

        let text = sample().to_string().replace(ADDRESS, &ADDRESS.to_lowercase());
        assert!(SiweMessage::parse(&text).is_err());

        let text = sample().to_string().replace("32891756abcdEFGH", "short");
        assert!(SiweMessage::parse(&text).is_err());

        let text = sample().to_string().replace("32891756abcdEFGH", "32891756-abcdEFGH");
        assert!(matches!(
            SiweMessage::parse(&text),
            Err(MessageError::InvalidField { field: "Nonce", .. })
        ));
    }

    #[test]
    fn test_rejects_non_blank_separator_lines() {
        let text = sample()
            .to_string()
            .replacen(&format!("{ADDRESS}\n\n"), &format!("{ADDRESS}\nnoise\n"), 1);
        assert!(SiweMessage::parse(&text).is_err());

        let text = sample()
            .to_string()
            .replace("Sign in\n\nURI", "Sign in\nnoise\nURI");
        assert_eq!(SiweMessage::parse(&text), Err(MessageError::NotCanonical));
    }

    #[test]
    fn test_rejects_trailing_content() {
        let text = format!("{}\n", sample());
        assert!(SiweMessage::parse(&text).is_err());

        let text = format!("{}\nExtra: field", sample());
        assert!(SiweMessage::parse(&text).is_err());
    }

    #[test]
    fn test_rejects_out_of_order_fields() {
        let text = sample()
            .to_string()
            .replace("Version: 1\nChain ID: 1", "Chain ID: 1\nVersion: 1");
        assert!(SiweMessage::parse(&text).is_err());
    }

    #[test]
    fn test_build_rejects_line_breaks() {
        let mut fields = fields();
        fields.statement = Some("Sign in\nURI: https://evil.example".to_string());
        assert!(SiweMessage::try_from(fields).is_err());

        let mut fields = self::fields();
        fields.request_id = Some("a\nb".to_string());
        assert!(SiweMessage::try_from(fields).is_err());
    }

    #[test]
    fn test_domain_validation() {
        assert!(is_valid_domain("app.example"));
        assert!(is_valid_domain("localhost:4361"));
        assert!(!is_valid_domain(""));
        assert!(!is_valid_domain("app example"));
    }
}
