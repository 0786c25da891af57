use sha2::{Digest, Sha256};

/// Hex SHA-256 of an API credential, the form stored in `merchants.api_key_hash`.
pub fn hash_api_key(api_key: &str) -> String {
    hex::encode(Sha256::digest(api_key.as_bytes()))
}
