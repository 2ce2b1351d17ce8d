// webhook.rs
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::VerificationError;
use crate::events::BillingEvent;

type HmacSha256 = Hmac<Sha256>;

/// Authenticates a raw webhook body and decodes it into a `BillingEvent`.
pub trait SignatureVerifier: Send + Sync {
    fn construct_event(
        &self,
        payload: &str,
        signature: &str,
        secret: &str,
    ) -> Result<BillingEvent, VerificationError>;
}

/// Stripe's `t=<unix>,v1=<hex>` signing scheme.
#[derive(Debug, Clone)]
pub struct StripeSignatureVerifier {
    tolerance_secs: i64,
}

impl StripeSignatureVerifier {
    pub fn new(tolerance_secs: i64) -> Self {
        Self { tolerance_secs }
    }

    pub fn verify_at(
        &self,
        payload: &str,
        signature: &str,
        secret: &str,
        now: i64,
    ) -> Result<(), VerificationError> {
        let (timestamp, signatures) = parse_header(signature)?;

        let age = now
            .checked_sub(timestamp)
            .ok_or(VerificationError::MalformedHeader)?;
        if self.tolerance_secs > 0 && age.unsigned_abs() > self.tolerance_secs.unsigned_abs() {
            return Err(VerificationError::TimestampOutOfTolerance { age });
        }

        let mac = signed_mac(secret, timestamp, payload)?;

        let matched = signatures
            .iter()
            .filter_map(|sig| hex::decode(sig).ok())
            .any(|bytes| mac.clone().verify_slice(&bytes).is_ok());

        if matched {
            Ok(())
        } else {
            Err(VerificationError::SignatureMismatch)
        }
    }
}

impl SignatureVerifier for StripeSignatureVerifier {
    fn construct_event(
        &self,
        payload: &str,
        signature: &str,
        secret: &str,
    ) -> Result<BillingEvent, VerificationError> {
        self.verify_at(payload, signature, secret, Utc::now().timestamp())?;
        Ok(BillingEvent::from_json(payload)?)
    }
}

/// HMAC-SHA256 keyed by `secret`, fed with `"{timestamp}.{payload}"`.
fn signed_mac(
    secret: &str,
    timestamp: i64,
    payload: &str,
) -> Result<HmacSha256, VerificationError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| VerificationError::InvalidSecret)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    Ok(mac)
}

/// Hex HMAC-SHA256 over `"{timestamp}.{payload}"`.
pub fn compute_signature(
    secret: &str,
    timestamp: i64,
    payload: &str,
) -> Result<String, VerificationError> {
    let mac = signed_mac(secret, timestamp, payload)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Builds a header value the way Stripe does, for a single v1 signature.
pub fn signature_header(
    secret: &str,
    timestamp: i64,
    payload: &str,
) -> Result<String, VerificationError> {
    Ok(format!(
        "t={},v1={}",
        timestamp,
        compute_signature(secret, timestamp, payload)?
    ))
}

fn parse_header(header: &str) -> Result<(i64, Vec<&str>), VerificationError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = Some(
                    value
                        .parse::<i64>()
                        .map_err(|_| VerificationError::MalformedHeader)?,
                );
            }
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    match timestamp {
        Some(t) if !signatures.is_empty() => Ok((t, signatures)),
        _ => Err(VerificationError::MalformedHeader),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const PAYLOAD: &str = r#"{"type":"ping","data":{"object":{}}}"#;

    #[test]
    fn accepts_valid_signature() {
        let verifier = StripeSignatureVerifier::new(300);
        let header = signature_header(SECRET, 1_700_000_000, PAYLOAD).unwrap();
        assert!(verifier
            .verify_at(PAYLOAD, &header, SECRET, 1_700_000_010)
            .is_ok());
    }

    #[test]
    fn accepts_any_of_several_v1_signatures() {
        let verifier = StripeSignatureVerifier::new(300);
        let good = compute_signature(SECRET, 1_700_000_000, PAYLOAD).unwrap();
        let header = format!("t=1700000000,v1=deadbeef,v0=ignored,v1={}", good);
        assert!(verifier
            .verify_at(PAYLOAD, &header, SECRET, 1_700_000_000)
            .is_ok());
    }

    #[test]
    fn rejects_wrong_secret() {
        let verifier = StripeSignatureVerifier::new(300);
        let header = signature_header("whsec_other", 1_700_000_000, PAYLOAD).unwrap();
        assert!(matches!(
            verifier.verify_at(PAYLOAD, &header, SECRET, 1_700_000_000),
            Err(VerificationError::SignatureMismatch)
        ));
    }

    #[test]
    fn rejects_modified_body() {
        let verifier = StripeSignatureVerifier::new(300);
        let header = signature_header(SECRET, 1_700_000_000, PAYLOAD).unwrap();
        let reserialized = r#"{"data":{"object":{}},"type":"ping"}"#;
        assert!(verifier
            .verify_at(reserialized, &header, SECRET, 1_700_000_000)
            .is_err());
    }

    #[test]
    fn rejects_stale_timestamp() {
        let verifier = StripeSignatureVerifier::new(300);
        let header = signature_header(SECRET, 1_700_000_000, PAYLOAD).unwrap();
        assert!(matches!(
            verifier.verify_at(PAYLOAD, &header, SECRET, 1_700_000_301),
            Err(VerificationError::TimestampOutOfTolerance { age: 301 })
        ));
    }

    #[test]
    fn extreme_timestamp_is_rejected_without_overflow() {
        let verifier = StripeSignatureVerifier::new(300);
        assert!(matches!(
            verifier.verify_at("{}", "t=-9223372036854775808,v1=00", SECRET, 1_700_000_000),
            Err(VerificationError::MalformedHeader)
        ));
        assert!(matches!(
            verifier.verify_at("{}", "t=9223372036854775807,v1=00", SECRET, 1_700_000_000),
            Err(VerificationError::TimestampOutOfTolerance { .. })
        ));
    }

    #[test]
    fn non_hex_signature_does_not_match() {
        let verifier = StripeSignatureVerifier::new(300);
        let header = "t=1700000000,v1=not-hex-at-all";
        assert!(matches!(
            verifier.verify_at(PAYLOAD, header, SECRET, 1_700_000_000),
            Err(VerificationError::SignatureMismatch)
        ));
    }

    #[test]
    fn zero_tolerance_skips_timestamp_check() {
        let verifier = StripeSignatureVerifier::new(0);
        let header = signature_header(SECRET, 1_000, PAYLOAD).unwrap();
        assert!(verifier
            .verify_at(PAYLOAD, &header, SECRET, 1_700_000_000)
            .is_ok());
    }

    #[test]
    fn rejects_malformed_header() {
        let verifier = StripeSignatureVerifier::new(300);
        for header in ["", "v1=abc", "t=abc,v1=abc", "t=1700000000"] {
            assert!(matches!(
                verifier.verify_at(PAYLOAD, header, SECRET, 1_700_000_000),
                Err(VerificationError::MalformedHeader)
            ));
        }
    }

    #[test]
    fn construct_event_decodes_after_verification() {
        let verifier = StripeSignatureVerifier::new(300);
        let header = signature_header(SECRET, Utc::now().timestamp(), PAYLOAD).unwrap();
        let event = verifier.construct_event(PAYLOAD, &header, SECRET).unwrap();
        assert_eq!(event, BillingEvent::Other("ping".to_string()));
    }

    #[test]
    fn construct_event_rejects_signed_garbage() {
        let verifier = StripeSignatureVerifier::new(300);
        let header = signature_header(SECRET, Utc::now().timestamp(), "garbage").unwrap();
        assert!(matches!(
            verifier.construct_event("garbage", &header, SECRET),
            Err(VerificationError::MalformedPayload(_))
        ));
    }
}
