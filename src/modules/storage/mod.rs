//! Object storage integration
//!
//! SigV4 signing primitives, browser POST policy minting for direct uploads,
//! and the startup bucket bootstrap for any S3-compatible backend.

mod bucket_client;
mod post_policy;
pub mod sigv4;

pub use bucket_client::BucketClient;
pub use post_policy::{PostPolicySigner, UploadAuthorization};
