use anyhow::{Result, anyhow};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_VERSION: &str = "v1";

/// Signs `"{timestamp}.{body}"` and returns the header value `v1=<hex>`.
pub fn sign_payload(secret: &str, timestamp: i64, body: &[u8]) -> Result<String> {
    let mac = keyed_mac(secret, timestamp, body)?;
    Ok(format!(
        "{SIGNATURE_VERSION}={}",
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Checks a `v1=<hex>` header against the payload in constant time.
pub fn verify_signature(secret: &str, timestamp: i64, body: &[u8], header: &str) -> bool {
    let Some(signature_hex) = header
        .trim()
        .strip_prefix(SIGNATURE_VERSION)
        .and_then(|rest| rest.strip_prefix('='))
    else {
        return false;
    };

    let Ok(signature) = hex::decode(signature_hex) else {
        return false;
    };

    keyed_mac(secret, timestamp, body)
        .is_ok_and(|mac| mac.verify_slice(&signature).is_ok())
}

fn keyed_mac(secret: &str, timestamp: i64, body: &[u8]) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|err| anyhow!("invalid webhook secret: {err}"))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    Ok(mac)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_merchant_secret";

    #[test]
    fn accepts_its_own_signature() {
        let body = br#"{"event":"payment.confirmed"}"#;
        let header = sign_payload(SECRET, 1_760_000_000, body).unwrap();
        assert!(header.starts_with("v1="));
        assert!(verify_signature(SECRET, 1_760_000_000, body, &header));
    }

    #[test]
    fn rejects_modified_body_timestamp_or_secret() {
        let body = br#"{"event":"payment.confirmed"}"#;
        let header = sign_payload(SECRET, 1_760_000_000, body).unwrap();

        assert!(!verify_signature(SECRET, 1_760_000_000, br#"{"event":"payment.rejected"}"#, &header));
        assert!(!verify_signature(SECRET, 1_760_000_001, body, &header));
        assert!(!verify_signature("other", 1_760_000_000, body, &header));
    }

    #[test]
    fn rejects_malformed_headers() {
        let body = b"{}";
        assert!(!verify_signature(SECRET, 1, body, ""));
        assert!(!verify_signature(SECRET, 1, body, "v2=abcd"));
        assert!(!verify_signature(SECRET, 1, body, "v1=not-hex"));
    }
}
