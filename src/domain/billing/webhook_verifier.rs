//! Stripe webhook signature verification.
//!
//! HMAC-SHA256 over `"{timestamp}.{payload}"`, compared in constant time.
//! The timestamp window guards against replays.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::stripe_event::StripeEvent;
use super::webhook_errors::WebhookError;

/// Maximum allowed age for webhook events (5 minutes).
const MAX_EVENT_AGE_SECS: i64 = 300;

/// Maximum allowed clock skew for future events (1 minute).
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Parsed components from the Stripe-Signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    /// Every `v1` entry; Stripe sends several while a secret is being rolled.
    pub v1_signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    /// Parses `t=<timestamp>,v1=<signature>[,v1=<signature>...]`.
    ///
    /// Unknown keys (such as the legacy `v0`) are skipped.
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
                    let signature = hex::decode(value.trim()).map_err(|_| {
                        WebhookError::ParseError("invalid v1 signature hex".to_string())
                    })?;
                    v1_signatures.push(signature);
                }
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

/// Verifier for Stripe webhook signatures.
#[derive(Clone)]
pub struct StripeWebhookVerifier {
    secret: SecretString,
}

impl StripeWebhookVerifier {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Verifies the signature against the current clock, then parses the event.
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<StripeEvent, WebhookError> {
        self.verify_at(payload, signature_header, chrono::Utc::now().timestamp())?;
        parse_event(payload)
    }

    /// Checks the signature header as of `now` (Unix seconds).
    pub fn verify_at(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: i64,
    ) -> Result<(), WebhookError> {
        let header = SignatureHeader::parse(signature_header)?;

        let age = now - header.timestamp;
        if age > MAX_EVENT_AGE_SECS {
            return Err(WebhookError::TimestampOutOfRange);
        }
        if age < -MAX_CLOCK_SKEW_SECS {
            return Err(WebhookError::InvalidTimestamp);
        }

        let expected = compute_signature(self.secret.expose_secret(), header.timestamp, payload)?;
        let matched = header
            .v1_signatures
            .iter()
            .any(|candidate| constant_time_compare(&expected, candidate));

        if matched {
            Ok(())
        } else {
            tracing::warn!(timestamp = header.timestamp, "webhook signature mismatch");
            Err(WebhookError::InvalidSignature)
        }
    }
}

/// Parses an unsigned payload. Used when no signing secret is configured.
pub fn parse_event(payload: &[u8]) -> Result<StripeEvent, WebhookError> {
    serde_json::from_slice(payload).map_err(|e| WebhookError::ParseError(e.to_string()))
}

/// Builds a `Stripe-Signature` header value for `payload`.
///
/// Handy for fixtures and for replaying captured events locally.
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, WebhookError> {
    let signature = compute_signature(secret, timestamp, payload)?;
    Ok(format!("t={},v1={}", timestamp, hex::encode(signature)))
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

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "whsec_test_secret_12345";
    const NOW: i64 = 1_700_000_000;

    fn verifier() -> StripeWebhookVerifier {
        StripeWebhookVerifier::new(SecretString::new(TEST_SECRET.to_string()))
    }

    fn payload() -> &'static [u8] {
        br#"{"id":"evt_1","type":"customer.subscription.updated","data":{"object":{}}}"#
    }

    // ══════════════════════════════════════════════════════════════
    // SignatureHeader Parsing Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn parse_header_with_single_signature() {
        let header = SignatureHeader::parse("t=1700000000,v1=abcd").unwrap();
        assert_eq!(header.timestamp, NOW);
        assert_eq!(header.v1_signatures, vec![vec![0xab, 0xcd]]);
    }

    #[test]
    fn parse_header_keeps_every_v1_and_skips_v0() {
        let header = SignatureHeader::parse("t=1,v1=aa,v0=bb,v1=cc").unwrap();
        assert_eq!(header.v1_signatures, vec![vec![0xaa], vec![0xcc]]);
    }

    #[test]
    fn parse_header_errors() {
        assert!(matches!(SignatureHeader::parse(""), Err(WebhookError::ParseError(_))));
        assert!(matches!(SignatureHeader::parse("v1=aa"), Err(WebhookError::ParseError(_))));
        assert!(matches!(SignatureHeader::parse("t=1"), Err(WebhookError::ParseError(_))));
        assert!(matches!(SignatureHeader::parse("t=x,v1=aa"), Err(WebhookError::ParseError(_))));
        assert!(matches!(SignatureHeader::parse("t=1,v1=abc"), Err(WebhookError::ParseError(_))));
        assert!(matches!(SignatureHeader::parse("t=1,v1=zz"), Err(WebhookError::ParseError(_))));
    }

    // ══════════════════════════════════════════════════════════════
    // Verification Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn valid_signature_passes() {
        let header = sign_payload(TEST_SECRET, NOW, payload()).unwrap();
        assert!(verifier().verify_at(payload(), &header, NOW + 10).is_ok());
    }

    #[test]
    fn rolled_secret_passes_when_any_v1_matches() {
        let good = sign_payload(TEST_SECRET, NOW, payload()).unwrap();
        let good_sig = good.split_once("v1=").unwrap().1;
        let header = format!("t={},v1={},v1={}", NOW, "00".repeat(32), good_sig);
        assert!(verifier().verify_at(payload(), &header, NOW).is_ok());
    }

    #[test]
    fn wrong_secret_fails() {
        let header = sign_payload("whsec_other", NOW, payload()).unwrap();
        assert!(matches!(
            verifier().verify_at(payload(), &header, NOW),
            Err(WebhookError::InvalidSignature)
        ));
    }

    #[test]
    fn tampered_payload_fails() {
        let header = sign_payload(TEST_SECRET, NOW, payload()).unwrap();
        let tampered = br#"{"id":"evt_2","type":"customer.subscription.updated","data":{"object":{}}}"#;
        assert!(matches!(
            verifier().verify_at(tampered, &header, NOW),
            Err(WebhookError::InvalidSignature)
        ));
    }

    #[test]
    fn old_events_are_rejected() {
        let header = sign_payload(TEST_SECRET, NOW, payload()).unwrap();
        assert!(verifier().verify_at(payload(), &header, NOW + 300).is_ok());
        assert!(matches!(
            verifier().verify_at(payload(), &header, NOW + 301),
            Err(WebhookError::TimestampOutOfRange)
        ));
    }

    #[test]
    fn future_events_beyond_skew_are_rejected() {
        let header = sign_payload(TEST_SECRET, NOW, payload()).unwrap();
        assert!(verifier().verify_at(payload(), &header, NOW - 60).is_ok());
        assert!(matches!(
            verifier().verify_at(payload(), &header, NOW - 61),
            Err(WebhookError::InvalidTimestamp)
        ));
    }

    #[test]
    fn verify_and_parse_returns_event() {
        let now = chrono::Utc::now().timestamp();
        let header = sign_payload(TEST_SECRET, now, payload()).unwrap();
        let event = verifier().verify_and_parse(payload(), &header).unwrap();
        assert_eq!(event.id, "evt_1");
    }

    #[test]
    fn parse_event_rejects_malformed_json() {
        assert!(matches!(parse_event(b"not json"), Err(WebhookError::ParseError(_))));
    }

    #[test]
    fn non_hex_signature_is_a_parse_error() {
        assert!(matches!(
            SignatureHeader::parse("t=1700000000,v1=zz"),
            Err(WebhookError::ParseError(_))
        ));
    }
}
