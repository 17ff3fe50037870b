mod upload_record;

pub use upload_record::{NewUploadRecord, RecordUpdate, UploadRecord, UploadState};
