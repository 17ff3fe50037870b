//! AWS Signature Version 4 primitives
//!
//! Shared by the browser POST policy signer and the bucket policy request.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::core::error::AppError;

type HmacSha256 = Hmac<Sha256>;

pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";
pub const SERVICE: &str = "s3";

#[derive(Debug, Error)]
pub enum SigningError {
    #[error("HMAC key error: {0}")]
    InvalidKey(String),

    #[error("Invalid storage endpoint '{0}'")]
    InvalidEndpoint(String),

    #[error("Signature lifetime must be positive, got {0}s")]
    InvalidLifetime(i64),

    #[error("Expiry instant out of range")]
    ExpiryOutOfRange,
}

impl From<SigningError> for AppError {
    fn from(e: SigningError) -> Self {
        AppError::Internal(format!("Failed to sign upload policy: {}", e))
    }
}

/// HMAC-SHA256 helper
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, SigningError> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| SigningError::InvalidKey(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Hex-encoded SHA-256 digest
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// `YYYYMMDD` date stamp used in the credential scope
pub fn date_stamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d").to_string()
}

/// `YYYYMMDDTHHMMSSZ` request timestamp
pub fn amz_date(at: DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%SZ").to_string()
}

pub fn credential_scope(date_stamp: &str, region: &str) -> String {
    format!("{}/{}/{}/aws4_request", date_stamp, region, SERVICE)
}

/// Derive the per-day signing key: HMAC chain over date, region, service
pub fn signing_key(
    secret_key: &str,
    date_stamp: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, SigningError> {
    let k_date = hmac_sha256(
        format!("AWS4{}", secret_key).as_bytes(),
        date_stamp.as_bytes(),
    )?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

/// Hex signature of `string_to_sign` under the derived signing key
pub fn sign(signing_key: &[u8], string_to_sign: &str) -> Result<String, SigningError> {
    Ok(hex::encode(hmac_sha256(signing_key, string_to_sign.as_bytes())?))
}
