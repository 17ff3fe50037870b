//! Upload records: the metadata store and its read/housekeeping endpoints.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/api/files` | List records (filter, sort, paginate) |
//! | GET | `/api/files/statistics` | Record counts per state |
//! | GET | `/api/files/{id}` | Single record |
//! | DELETE | `/api/files/{id}` | Delete one record |
//! | DELETE | `/api/files/batch` | Delete several records, all or nothing |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;

pub use routes::routes;
pub use services::FileService;
