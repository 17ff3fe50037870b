mod key_generator;
mod upload_policy;
mod upload_service;

pub use key_generator::{extension_of, KeyGenerator};
pub use upload_policy::UploadPolicy;
pub use upload_service::UploadService;
