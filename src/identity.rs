use base64::{URL_SAFE_NO_PAD, decode_config, encode_config};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug)]
pub enum TokenError {
    MissingSecret,
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::MissingSecret => f.write_str("HMAC secret missing"),
        }
    }
}

/// Stable, non-PII storage key for a push endpoint: lowercase hex SHA-256.
///
/// The endpoint is already an opaque per-platform URL, so the hash carries no
/// personal data while still guaranteeing one record per distinct endpoint.
pub fn derive_key(endpoint: &str) -> String {
    let digest = Sha256::digest(endpoint.as_bytes());
    hex::encode(digest)
}

/// Bearer token authorizing mutations on the record derived from `endpoint`:
/// base64url (unpadded) HMAC-SHA256 over the endpoint with the server-wide
/// secret. Deterministic; rotation of the secret invalidates every token.
pub fn issue_token(secret: &str, endpoint: &str) -> Result<String, TokenError> {
    let mac = keyed_mac(secret, endpoint)?;
    Ok(encode_config(mac.finalize().into_bytes(), URL_SAFE_NO_PAD))
}

/// Recomputes the MAC for `endpoint` and checks `token` against it. The
/// comparison runs in constant time relative to the MAC length.
pub fn verify_token(secret: &str, endpoint: &str, token: &str) -> Result<bool, TokenError> {
    let mac = keyed_mac(secret, endpoint)?;
    let Ok(presented) = decode_config(token, URL_SAFE_NO_PAD) else {
        return Ok(false);
    };
    Ok(mac.verify_slice(&presented).is_ok())
}

fn keyed_mac(secret: &str, endpoint: &str) -> Result<HmacSha256, TokenError> {
    if secret.trim().is_empty() {
        return Err(TokenError::MissingSecret);
    }
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| TokenError::MissingSecret)?;
    mac.update(endpoint.as_bytes());
    Ok(mac)
}

pub fn generate_hmac_secret() -> String {
    let mut rng = OsRng;
    generate_hmac_secret_with_rng(&mut rng)
}

pub(crate) fn generate_hmac_secret_with_rng<R: RngCore + CryptoRng>(rng: &mut R) -> String {
    let mut bytes = [0u8; 32];
    rng.fill_bytes(&mut bytes);
    encode_config(bytes, URL_SAFE_NO_PAD)
}
