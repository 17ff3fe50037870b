//! Startup bootstrap for the upload bucket
//!
//! Clients write straight to storage, so the only server-side storage work is
//! making sure the bucket exists and, when configured, that objects under the
//! upload prefix are anonymously readable at their access URL.

use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use s3::creds::Credentials;
use s3::{Bucket, BucketConfiguration, Region};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::core::config::StorageConfig;
use crate::core::error::AppError;
use crate::modules::storage::sigv4::{self, ALGORITHM, SERVICE};

pub struct BucketClient {
    bucket_name: String,
    region: Region,
    credentials: Credentials,
    endpoint: String,
    access_key: String,
    secret_key: String,
    region_name: String,
    http_client: Client,
}

impl BucketClient {
    pub fn new(config: &StorageConfig) -> Result<Self, AppError> {
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| AppError::Internal(format!("Failed to create storage credentials: {}", e)))?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };

        let http_client = Client::builder()
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            bucket_name: config.bucket.clone(),
            region,
            credentials,
            endpoint: config.endpoint.clone(),
            access_key: config.access_key.clone(),
            secret_key: config.secret_key.clone(),
            region_name: config.region.clone(),
            http_client,
        })
    }

    pub fn bucket_name(&self) -> &str {
        &self.bucket_name
    }

    /// Ensure the bucket exists, create if not
    pub async fn ensure_bucket_exists(&self) -> Result<(), AppError> {
        match self.create_bucket().await {
            Ok(_) => {
                info!("Bucket '{}' created successfully", self.bucket_name);
                Ok(())
            }
            Err(e) => {
                let error_str = e.to_string();
                if error_str.contains("BucketAlreadyOwnedByYou")
                    || error_str.contains("BucketAlreadyExists")
                    || error_str.contains("already own it")
                {
                    debug!("Bucket '{}' already exists", self.bucket_name);
                } else {
                    warn!(
                        "Could not create bucket '{}': {}. Assuming it exists.",
                        self.bucket_name, e
                    );
                }
                Ok(())
            }
        }
    }

    async fn create_bucket(&self) -> Result<(), AppError> {
        Bucket::create_with_path_style(
            &self.bucket_name,
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await
        .map_err(|e| {
            AppError::Internal(format!(
                "Failed to create bucket '{}': {}",
                self.bucket_name, e
            ))
        })?;

        Ok(())
    }

    /// Allow anonymous reads of objects under `prefix`, so access URLs resolve.
    ///
    /// Failure is logged and tolerated; the policy can be applied out of band.
    pub async fn set_public_read_policy(&self, prefix: &str) -> Result<(), AppError> {
        let policy = public_read_policy(&self.bucket_name, prefix).to_string();

        match self.put_bucket_policy(&policy, Utc::now()).await {
            Ok(_) => {
                info!(
                    "Set public read policy for {}/{}/*",
                    self.bucket_name, prefix
                );
            }
            Err(e) => {
                warn!(
                    "Failed to set bucket policy for '{}': {}. \
                    You may need to set the policy manually using: \
                    mc anonymous set download <alias>/{}/{}",
                    self.bucket_name, e, self.bucket_name, prefix
                );
            }
        }
        Ok(())
    }

    /// PUT ?policy signed with an Authorization header
    async fn put_bucket_policy(&self, policy: &str, now: DateTime<Utc>) -> Result<(), AppError> {
        let request = self.sign_policy_request(policy, now)?;

        let response = self
            .http_client
            .put(&request.url)
            .header("Host", &request.host_header)
            .header("x-amz-date", &request.amz_date)
            .header("x-amz-content-sha256", &request.payload_hash)
            .header("Authorization", &request.authorization)
            .header("Content-Type", "application/json")
            .body(policy.to_string())
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to send policy request: {}", e)))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(AppError::Internal(format!(
                "Failed to set bucket policy: {} - {}",
                status, body
            )))
        }
    }

    fn sign_policy_request(
        &self,
        policy: &str,
        now: DateTime<Utc>,
    ) -> Result<SignedPolicyRequest, AppError> {
        let date_stamp = sigv4::date_stamp(now);
        let amz_date = sigv4::amz_date(now);

        let endpoint_url = Url::parse(&self.endpoint)
            .map_err(|e| AppError::Internal(format!("Invalid endpoint URL: {}", e)))?;
        let host = endpoint_url
            .host_str()
            .ok_or_else(|| AppError::Internal("Endpoint URL has no host".to_string()))?;
        let host_header = match endpoint_url.port() {
            Some(p) => format!("{}:{}", host, p),
            None => host.to_string(),
        };

        let url = format!("{}/{}?policy", self.endpoint, self.bucket_name);
        let payload_hash = sigv4::sha256_hex(policy.as_bytes());

        let canonical_uri = format!("/{}", self.bucket_name);
        let canonical_querystring = "policy=";
        let canonical_headers = format!(
            "host:{}\nx-amz-content-sha256:{}\nx-amz-date:{}\n",
            host_header, payload_hash, amz_date
        );
        let signed_headers = "host;x-amz-content-sha256;x-amz-date";

        let canonical_request = format!(
            "PUT\n{}\n{}\n{}\n{}\n{}",
            canonical_uri, canonical_querystring, canonical_headers, signed_headers, payload_hash
        );

        let credential_scope = sigv4::credential_scope(&date_stamp, &self.region_name);
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            amz_date,
            credential_scope,
            sigv4::sha256_hex(canonical_request.as_bytes())
        );

        let signing_key =
            sigv4::signing_key(&self.secret_key, &date_stamp, &self.region_name, SERVICE)?;
        let signature = sigv4::sign(&signing_key, &string_to_sign)?;

        let authorization = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, self.access_key, credential_scope, signed_headers, signature
        );

        Ok(SignedPolicyRequest {
            url,
            host_header,
            amz_date,
            payload_hash,
            authorization,
        })
    }
}

struct SignedPolicyRequest {
    url: String,
    host_header: String,
    amz_date: String,
    payload_hash: String,
    authorization: String,
}

/// Bucket policy granting anonymous `s3:GetObject` under `prefix`
pub fn public_read_policy(bucket: &str, prefix: &str) -> Value {
    json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Effect": "Allow",
                "Principal": {"AWS": "*"},
                "Action": ["s3:GetObject"],
                "Resource": [format!("arn:aws:s3:::{bucket}/{prefix}/*")]
            }
        ]
    })
}
