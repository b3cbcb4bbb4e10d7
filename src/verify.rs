use anyhow::{Context, Result};
use ed25519_dalek::{Signature, VerifyingKey};

pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

/// Parse the hex-encoded application public key.
pub fn parse_public_key(hex_key: &str) -> Result<VerifyingKey> {
    let raw = hex::decode(hex_key.trim()).context("Public key is not valid hex")?;
    let bytes = <[u8; 32]>::try_from(raw.as_slice())
        .map_err(|_| anyhow::anyhow!("Public key must be 32 bytes, got {}", raw.len()))?;
    VerifyingKey::from_bytes(&bytes).context("Public key is not a valid Ed25519 point")
}

/// Check the detached signature Discord sends over `timestamp || body`.
///
/// Missing headers or a badly encoded signature count as a failed check.
pub fn verify(
    body: &[u8],
    signature: Option<&str>,
    timestamp: Option<&str>,
    public_key: &VerifyingKey,
) -> bool {
    let (Some(signature), Some(timestamp)) = (signature, timestamp) else {
        return false;
    };

    let Ok(sig_raw) = hex::decode(signature) else {
        return false;
    };
    let Ok(sig_bytes) = <[u8; 64]>::try_from(sig_raw.as_slice()) else {
        return false;
    };
    let sig = Signature::from_bytes(&sig_bytes);

    let mut message = Vec::with_capacity(timestamp.len() + body.len());
    message.extend_from_slice(timestamp.as_bytes());
    message.extend_from_slice(body);

    public_key.verify_strict(&message, &sig).is_ok()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    pub(crate) fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    pub(crate) fn sign(key: &SigningKey, timestamp: &str, body: &[u8]) -> String {
        let mut message = timestamp.as_bytes().to_vec();
        message.extend_from_slice(body);
        hex::encode(key.sign(&message).to_bytes())
    }

    #[test]
    fn test_valid_signature() {
        let key = signing_key();
        let body = br#"{"type":1}"#;
        let sig = sign(&key, "1700000000", body);

        assert!(verify(
            body,
            Some(&sig),
            Some("1700000000"),
            &key.verifying_key()
        ));
    }

    #[test]
    fn test_missing_headers_fail() {
        let key = signing_key();
        let body = br#"{"type":1}"#;
        let sig = sign(&key, "1700000000", body);
        let public = key.verifying_key();

        assert!(!verify(body, None, Some("1700000000"), &public));
        assert!(!verify(body, Some(&sig), None, &public));
        assert!(!verify(body, None, None, &public));
    }

    #[test]
    fn test_tampered_body_or_timestamp_fails() {
        let key = signing_key();
        let sig = sign(&key, "1700000000", br#"{"type":1}"#);
        let public = key.verifying_key();

        assert!(!verify(br#"{"type":2}"#, Some(&sig), Some("1700000000"), &public));
        assert!(!verify(br#"{"type":1}"#, Some(&sig), Some("1700000001"), &public));
    }

    #[test]
    fn test_malformed_signature_is_rejected_not_panicking() {
        let public = signing_key().verifying_key();
        let body = b"{}";

        assert!(!verify(body, Some("not-hex"), Some("1"), &public));
        assert!(!verify(body, Some("abcd"), Some("1"), &public));
        assert!(!verify(body, Some(""), Some("1"), &public));
    }

    #[test]
    fn test_parse_public_key() {
        let public = signing_key().verifying_key();
        let parsed = parse_public_key(&hex::encode(public.to_bytes())).unwrap();
        assert_eq!(parsed, public);

        assert!(parse_public_key("zz").is_err());
        assert!(parse_public_key("abcd").is_err());
    }
}
