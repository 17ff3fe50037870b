//! Browser POST policy minting
//!
//! Produces the form fields a client needs to upload one object directly to
//! S3-compatible storage. The policy pins the exact object key and a
//! `content-length-range` ceiling and is signed with SigV4, so the storage
//! backend rejects any other key, a larger body, or a request after expiry.

use base64::prelude::*;
use chrono::{DateTime, Duration, Utc};
use reqwest::Url;
use serde_json::json;

use crate::core::config::StorageConfig;
use crate::modules::storage::sigv4::{self, SigningError, ALGORITHM, SERVICE};

/// Everything a client needs to perform the POST upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadAuthorization {
    pub access_key_id: String,
    /// Base64-encoded policy document
    pub policy: String,
    /// Hex SigV4 signature over `policy`
    pub signature: String,
    pub algorithm: String,
    pub credential: String,
    pub date: String,
    /// URL the form is posted to
    pub host: String,
    pub key: String,
    /// Expiry instant, epoch seconds
    pub expire: i64,
}

/// Signs POST policies with the service's storage credentials
pub struct PostPolicySigner {
    access_key: String,
    secret_key: String,
    region: String,
    bucket: String,
    host: String,
}

impl PostPolicySigner {
    pub fn new(config: &StorageConfig) -> Result<Self, SigningError> {
        let host = upload_host(&config.public_endpoint, &config.bucket, config.path_style)?;

        Ok(Self {
            access_key: config.access_key.clone(),
            secret_key: config.secret_key.clone(),
            region: config.region.clone(),
            bucket: config.bucket.clone(),
            host,
        })
    }

    /// Upload host handed to clients
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Public location of an object once stored
    pub fn access_url(&self, key: &str) -> String {
        format!("{}/{}", self.host, key)
    }

    /// Mint an authorization for exactly `key`, at most `max_file_size` bytes,
    /// valid until `now + lifetime`.
    pub fn mint(
        &self,
        key: &str,
        max_file_size: i64,
        lifetime: Duration,
        now: DateTime<Utc>,
    ) -> Result<UploadAuthorization, SigningError> {
        if lifetime <= Duration::zero() {
            return Err(SigningError::InvalidLifetime(lifetime.num_seconds()));
        }

        let expire = now
            .checked_add_signed(lifetime)
            .ok_or(SigningError::ExpiryOutOfRange)?
            .timestamp();
        let expires_at =
            DateTime::<Utc>::from_timestamp(expire, 0).ok_or(SigningError::ExpiryOutOfRange)?;

        let date_stamp = sigv4::date_stamp(now);
        let amz_date = sigv4::amz_date(now);
        let credential = format!(
            "{}/{}",
            self.access_key,
            sigv4::credential_scope(&date_stamp, &self.region)
        );

        let document = json!({
            "expiration": expires_at.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            "conditions": [
                { "bucket": self.bucket },
                ["content-length-range", 0, max_file_size],
                ["eq", "$key", key],
                { "x-amz-algorithm": ALGORITHM },
                { "x-amz-credential": credential },
                { "x-amz-date": amz_date },
            ]
        });

        let policy = BASE64_STANDARD.encode(document.to_string());
        let signing_key =
            sigv4::signing_key(&self.secret_key, &date_stamp, &self.region, SERVICE)?;
        let signature = sigv4::sign(&signing_key, &policy)?;

        Ok(UploadAuthorization {
            access_key_id: self.access_key.clone(),
            policy,
            signature,
            algorithm: ALGORITHM.to_string(),
            credential,
            date: amz_date,
            host: self.host.clone(),
            key: key.to_string(),
            expire,
        })
    }
}

/// `endpoint/bucket` for path-style access, `scheme://bucket.host` otherwise
fn upload_host(endpoint: &str, bucket: &str, path_style: bool) -> Result<String, SigningError> {
    let endpoint = endpoint.trim_end_matches('/');
    if path_style {
        return Ok(format!("{}/{}", endpoint, bucket));
    }

    let mut url =
        Url::parse(endpoint).map_err(|_| SigningError::InvalidEndpoint(endpoint.to_string()))?;
    let host = url
        .host_str()
        .ok_or_else(|| SigningError::InvalidEndpoint(endpoint.to_string()))?
        .to_string();
    url.set_host(Some(&format!("{}.{}", bucket, host)))
        .map_err(|_| SigningError::InvalidEndpoint(endpoint.to_string()))?;

    Ok(url.as_str().trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::Value;

    fn storage_config(path_style: bool) -> StorageConfig {
        StorageConfig {
            endpoint: "http://minio:9000".to_string(),
            public_endpoint: "https://storage.example.com".to_string(),
            access_key: "AKIDEXAMPLE".to_string(),
            secret_key: "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY".to_string(),
            bucket: "media".to_string(),
            region: "us-east-1".to_string(),
            path_style,
            ensure_bucket: false,
            public_read: false,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 8, 30, 0).unwrap()
    }

    fn decode_policy(policy: &str) -> Value {
        serde_json::from_slice(&BASE64_STANDARD.decode(policy).unwrap()).unwrap()
    }

    #[test]
    fn test_policy_binds_exact_key_and_size_ceiling() {
        let signer = PostPolicySigner::new(&storage_config(true)).unwrap();
        let auth = signer
            .mint(
                "uploads/2026/10/16/abc.pdf",
                10_000,
                Duration::seconds(3600),
                now(),
            )
            .unwrap();

        let policy = decode_policy(&auth.policy);
        let conditions = policy["conditions"].as_array().unwrap();

        assert!(conditions.contains(&json!(["content-length-range", 0, 10_000])));
        assert!(conditions.contains(&json!(["eq", "$key", "uploads/2026/10/16/abc.pdf"])));
        assert!(conditions.contains(&json!({ "bucket": "media" })));
        assert!(!conditions
            .iter()
            .any(|c| c.get(0) == Some(&json!("starts-with"))));
        assert_eq!(policy["expiration"], "2026-10-16T09:30:00.000Z");
    }

    #[test]
    fn test_expire_is_now_plus_lifetime() {
        let signer = PostPolicySigner::new(&storage_config(true)).unwrap();
        let auth = signer
            .mint("uploads/k", 1, Duration::seconds(900), now())
            .unwrap();

        assert_eq!(auth.expire, now().timestamp() + 900);
        assert_eq!(auth.date, "20261016T083000Z");
        assert_eq!(
            auth.credential,
            "AKIDEXAMPLE/20261016/us-east-1/s3/aws4_request"
        );
    }

    #[test]
    fn test_signature_is_sigv4_over_encoded_policy() {
        let config = storage_config(true);
        let signer = PostPolicySigner::new(&config).unwrap();
        let auth = signer
            .mint("uploads/k.png", 2048, Duration::seconds(60), now())
            .unwrap();

        let key = sigv4::signing_key(&config.secret_key, "20261016", "us-east-1", "s3").unwrap();
        assert_eq!(auth.signature, sigv4::sign(&key, &auth.policy).unwrap());
        assert!(!auth.signature.contains(&config.secret_key));
        assert!(!auth.policy.contains(&config.secret_key));
    }

    #[test]
    fn test_signature_changes_with_key_or_ceiling() {
        let signer = PostPolicySigner::new(&storage_config(true)).unwrap();
        let lifetime = Duration::seconds(60);

        let base = signer.mint("uploads/a.png", 100, lifetime, now()).unwrap();
        let other_key = signer.mint("uploads/b.png", 100, lifetime, now()).unwrap();
        let bigger = signer.mint("uploads/a.png", 101, lifetime, now()).unwrap();

        assert_ne!(base.signature, other_key.signature);
        assert_ne!(base.signature, bigger.signature);
    }

    #[test]
    fn test_rejects_non_positive_lifetime() {
        let signer = PostPolicySigner::new(&storage_config(true)).unwrap();
        let result = signer.mint("uploads/k", 1, Duration::zero(), now());
        assert!(matches!(result, Err(SigningError::InvalidLifetime(0))));
    }

    #[test]
    fn test_huge_lifetime_is_out_of_range() {
        let signer = PostPolicySigner::new(&storage_config(true)).unwrap();

        let result = signer.mint("uploads/k", 1, Duration::MAX, now());
        assert!(matches!(result, Err(SigningError::ExpiryOutOfRange)));

        let result = signer.mint(
            "uploads/k",
            1,
            Duration::seconds(9_000_000_000_000),
            now(),
        );
        assert!(matches!(result, Err(SigningError::ExpiryOutOfRange)));
    }

    #[test]
    fn test_upload_host_styles() {
        let path = PostPolicySigner::new(&storage_config(true)).unwrap();
        assert_eq!(path.host(), "https://storage.example.com/media");
        assert_eq!(
            path.access_url("uploads/2026/10/16/x.pdf"),
            "https://storage.example.com/media/uploads/2026/10/16/x.pdf"
        );

        let virtual_host = PostPolicySigner::new(&storage_config(false)).unwrap();
        assert_eq!(virtual_host.host(), "https://media.storage.example.com");
    }

    #[test]
    fn test_virtual_host_keeps_port() {
        let host = upload_host("http://localhost:9000", "media", false).unwrap();
        assert_eq!(host, "http://media.localhost:9000");
    }

    #[test]
    fn test_virtual_host_rejects_unparseable_endpoint() {
        assert!(matches!(
            upload_host("not a url", "media", false),
            Err(SigningError::InvalidEndpoint(_))
        ));
    }
}
