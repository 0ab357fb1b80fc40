// src/webhook/auth.rs

use constant_time_eq::constant_time_eq;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::errors::{Result, StackpullError};

/// Header carrying the hex HMAC-SHA-256 of the request body.
pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA-256 of `body` keyed with `secret`.
pub fn sign(body: &[u8], secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC-SHA-256 accepts keys of any size");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Check `provided` against the signature of `body`.
///
/// An empty `secret` means the endpoint is open and nothing is computed.
/// `provided` may carry a `sha256=` prefix and any hex case.
pub fn verify(body: &[u8], provided: &str, secret: &str) -> bool {
    if secret.is_empty() {
        return true;
    }

    let provided = provided.trim();
    let provided = provided.strip_prefix("sha256=").unwrap_or(provided);
    let provided = provided.to_ascii_lowercase();

    let expected = sign(body, secret);
    constant_time_eq(expected.as_bytes(), provided.as_bytes())
}

/// Shared-secret authenticator for inbound trigger requests.
#[derive(Clone)]
pub struct WebhookAuth {
    secret: String,
}

impl std::fmt::Debug for WebhookAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookAuth")
            .field("open", &self.is_open())
            .finish()
    }
}

impl WebhookAuth {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// True when no secret is configured and every request is accepted.
    pub fn is_open(&self) -> bool {
        self.secret.is_empty()
    }

    pub fn check(&self, body: &[u8], signature: Option<&str>) -> Result<()> {
        if self.is_open() {
            return Ok(());
        }

        let Some(signature) = signature else {
            return Err(StackpullError::AuthError(format!(
                "missing {SIGNATURE_HEADER} header"
            )));
        };

        if verify(body, signature, &self.secret) {
            Ok(())
        } else {
            Err(StackpullError::AuthError("signature mismatch".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_matches_known_vector() {
        // RFC 4231, test case 2.
        let sig = sign(b"what do ya want for nothing?", "Jefe");
        assert_eq!(
            sig,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn flipped_byte_fails_verification() {
        let body = b"{\"repository\":\"web\"}".to_vec();
        let sig = sign(&body, "s3cret");
        assert!(verify(&body, &sig, "s3cret"));

        let mut tampered = body.clone();
        tampered[3] ^= 0x01;
        assert!(!verify(&tampered, &sig, "s3cret"));
    }

    #[test]
    fn empty_secret_always_verifies() {
        assert!(verify(b"anything", "", ""));
        assert!(verify(b"anything", "not-even-hex", ""));
    }

    #[test]
    fn accepts_prefixed_and_uppercase_signatures() {
        let sig = sign(b"payload", "k");
        assert!(verify(b"payload", &format!("sha256={sig}"), "k"));
        assert!(verify(b"payload", &sig.to_ascii_uppercase(), "k"));
        assert!(verify(b"payload", &format!("  {sig}\n"), "k"));
    }

    #[test]
    fn wrong_secret_or_truncated_signature_fails() {
        let sig = sign(b"payload", "k");
        assert!(!verify(b"payload", &sig, "other"));
        assert!(!verify(b"payload", &sig[..10], "k"));
    }

    #[test]
    fn check_reports_missing_header() {
        let auth = WebhookAuth::new("k");
        let err = auth.check(b"payload", None).unwrap_err();
        assert!(matches!(err, StackpullError::AuthError(_)));
        assert!(err.to_string().contains(SIGNATURE_HEADER));

        let open = WebhookAuth::new("");
        assert!(open.is_open());
        assert!(open.check(b"payload", None).is_ok());
    }
}
