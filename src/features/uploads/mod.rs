//! Direct-to-storage uploads.
//!
//! A client asks for an authorization, posts the file straight to the bucket
//! with it, then reports the outcome. Each authorization is backed by one
//! upload record that moves from `pending` to `success` or `failed` once.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | POST | `/api/uploads/signature` | Issue upload authorization |
//! | POST | `/api/uploads/callback` | Report upload outcome |

pub mod dtos;
pub mod handlers;
pub mod routes;
pub mod services;

pub use routes::routes;
pub use services::UploadService;
