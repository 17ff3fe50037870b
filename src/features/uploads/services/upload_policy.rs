use thiserror::Error;

use crate::core::config::UploadConfig;
use crate::core::error::AppError;
use crate::features::uploads::services::key_generator::extension_of;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("File size {size} exceeds the maximum of {max} bytes")]
    SizeLimitExceeded { size: i64, max: i64 },

    #[error("File type '{0}' is not allowed")]
    UnsupportedFileType(String),

    #[error("File size must not be negative")]
    InvalidFileSize,
}

impl From<PolicyError> for AppError {
    fn from(e: PolicyError) -> Self {
        AppError::Validation(e.to_string())
    }
}

/// Size ceiling and extension allow-list applied before anything is signed
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    max_file_size: i64,
    allowed_file_types: Vec<String>,
}

impl UploadPolicy {
    pub fn new(max_file_size: i64, allowed_file_types: Vec<String>) -> Self {
        Self {
            max_file_size,
            allowed_file_types,
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(config.max_file_size, config.allowed_file_types.clone())
    }

    pub fn max_file_size(&self) -> i64 {
        self.max_file_size
    }

    /// Check a declared size and optional extension against the limits.
    ///
    /// An empty allow-list admits every extension.
    pub fn validate(&self, size: i64, extension: Option<&str>) -> Result<(), PolicyError> {
        if size < 0 {
            return Err(PolicyError::InvalidFileSize);
        }
        if size > self.max_file_size {
            return Err(PolicyError::SizeLimitExceeded {
                size,
                max: self.max_file_size,
            });
        }

        match extension {
            Some(ext) if !self.is_allowed(ext) => {
                Err(PolicyError::UnsupportedFileType(ext.to_string()))
            }
            _ => Ok(()),
        }
    }

    /// Validate a whole issuance request.
    ///
    /// Besides the declared extension, an extension carried by `file_name`
    /// must be allowed too, since the storage key ends with it.
    pub fn validate_request(
        &self,
        size: i64,
        declared_extension: Option<&str>,
        file_name: &str,
    ) -> Result<(), PolicyError> {
        self.validate(size, declared_extension)?;
        self.validate(size, extension_of(file_name))
    }

    fn is_allowed(&self, extension: &str) -> bool {
        if self.allowed_file_types.is_empty() {
            return true;
        }
        let normalized = extension.trim().trim_start_matches('.').to_lowercase();
        self.allowed_file_types.iter().any(|t| *t == normalized)
    }
}
