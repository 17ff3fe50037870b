//! Modules layer - adapters for external systems
//!
//! Holds the S3-compatible storage integration: SigV4 signing, POST policy
//! minting and the startup bucket bootstrap.

pub mod storage;
