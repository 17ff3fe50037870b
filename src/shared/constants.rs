/// Default page size for pagination
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Maximum page size allowed
pub const MAX_PAGE_SIZE: i64 = 100;

// =============================================================================
// UPLOAD CALLBACK STATUS CODES
// =============================================================================

/// Callback `uploadStatus` reporting a completed upload
pub const CALLBACK_STATUS_SUCCESS: i32 = 1;

/// Callback `uploadStatus` reporting a failed upload
pub const CALLBACK_STATUS_FAILED: i32 = 2;
