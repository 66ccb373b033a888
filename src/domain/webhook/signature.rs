//! Webhook signature verification.
//!
//! The provider signs `"{timestamp}.{raw body}"` with HMAC-SHA256 and sends
//! `t=<timestamp>,v1=<hex signature>` in the signature header. Timestamps are
//! checked to bound replays of captured requests.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::provider_event::ProviderEvent;
use super::WebhookError;

/// Maximum allowed age for a signature (5 minutes).
const MAX_EVENT_AGE_SECS: i64 = 300;

/// Maximum allowed clock skew for future signatures (1 minute).
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Parsed components of the signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    /// Every `v1` entry; the provider sends several while rotating secrets.
    pub v1_signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    /// Parses `t=<timestamp>,v1=<signature>[,v1=<signature>...]`.
    pub fn parse(header: &str) -> Result<Self, WebhookError> {
        let mut timestamp: Option<i64> = None;
        let mut v1_signatures = Vec::new();

        for part in header.split(',') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or_else(|| WebhookError::ParseError("invalid header format".to_string()))?;

            match key {
                "t" => {
                    timestamp = Some(value.parse().map_err(|_| {
                        WebhookError::ParseError("invalid timestamp".to_string())
                    })?);
                }
                "v1" => {
                    v1_signatures.push(hex::decode(value).map_err(|_| {
                        WebhookError::ParseError("invalid v1 signature hex".to_string())
                    })?);
                }
                // v0 and unknown schemes are ignored
                _ => {}
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| WebhookError::ParseError("missing timestamp".to_string()))?;
        if v1_signatures.is_empty() {
            return Err(WebhookError::ParseError("missing v1 signature".to_string()));
        }

        Ok(SignatureHeader {
            timestamp,
            v1_signatures,
        })
    }
}

enum Mode {
    Signed(SecretString),
    /// Development only: accepts payloads without checking signatures.
    Unsigned,
    /// No secret configured: every event is refused.
    Refuse,
}

/// Authenticates webhook bodies and parses them into provider events.
pub struct WebhookVerifier {
    mode: Mode,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            mode: Mode::Signed(SecretString::new(secret.into())),
        }
    }

    /// Accepts unsigned events. Never use in production.
    pub fn insecure() -> Self {
        Self {
            mode: Mode::Unsigned,
        }
    }

    pub fn refusing() -> Self {
        Self { mode: Mode::Refuse }
    }

    /// Picks the mode from configuration. A configured secret always wins.
    pub fn from_config(secret: Option<&str>, allow_unsigned: bool) -> Self {
        match secret.map(str::trim).filter(|s| !s.is_empty()) {
            Some(secret) => Self::new(secret),
            None if allow_unsigned => Self::insecure(),
            None => Self::refusing(),
        }
    }

    pub fn is_insecure(&self) -> bool {
        matches!(self.mode, Mode::Unsigned)
    }

    /// Verifies the signature against the current clock and parses the event.
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
    ) -> Result<ProviderEvent, WebhookError> {
        self.verify_and_parse_at(payload, signature_header, chrono::Utc::now().timestamp())
    }

    /// Same as [`verify_and_parse`](Self::verify_and_parse) with an explicit `now`.
    pub fn verify_and_parse_at(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
        now: i64,
    ) -> Result<ProviderEvent, WebhookError> {
        match &self.mode {
            Mode::Refuse => return Err(WebhookError::SecretNotConfigured),
            Mode::Unsigned => {
                tracing::warn!("accepting webhook without signature verification");
            }
            Mode::Signed(secret) => {
                let header = signature_header.ok_or(WebhookError::MissingSignature)?;
                let header = SignatureHeader::parse(header)?;

                validate_timestamp(header.timestamp, now)?;

                let expected = compute_signature(secret.expose_secret(), header.timestamp, payload)?;
                if !header
                    .v1_signatures
                    .iter()
                    .any(|candidate| constant_time_compare(&expected, candidate))
                {
                    return Err(WebhookError::InvalidSignature);
                }
            }
        }

        serde_json::from_slice(payload).map_err(|e| WebhookError::ParseError(e.to_string()))
    }
}

fn validate_timestamp(timestamp: i64, now: i64) -> Result<(), WebhookError> {
    // `t=` is attacker-controlled until the HMAC checks out.
    let age = now
        .checked_sub(timestamp)
        .ok_or(WebhookError::InvalidTimestamp)?;

    if age > MAX_EVENT_AGE_SECS {
        return Err(WebhookError::TimestampOutOfRange);
    }
    if age < -MAX_CLOCK_SKEW_SECS {
        return Err(WebhookError::InvalidTimestamp);
    }
    Ok(())
}

fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> Result<Vec<u8>, WebhookError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Produces a valid signature header for `payload`, as the provider would.
///
/// Used by tests and by local tooling that replays captured events.
pub fn sign_payload(secret: &str, timestamp: i64, payload: &str) -> String {
    let signature = compute_signature(secret, timestamp, payload.as_bytes())
        .map(hex::encode)
        .unwrap_or_default();
    format!("t={},v1={}", timestamp, signature)
}
