//! HTTP shell for the car rental service.
//!
//! Everything a handler needs that is not rental business logic lives here:
//!
//! - [`AppError`]: the single error type handlers return. It renders the
//!   `{"success": false, "error": ..., "code": ...}` envelope every client of
//!   the API already understands.
//! - [`BearerToken`], the extractor for the raw `Authorization: Bearer`
//!   credential.
//! - [`correlation_id_layer`], which stamps every request with an id, opens a
//!   tracing span for it and echoes the id back in the response.
//!
//! # Request flow
//!
//! 1. **Correlation layer** assigns the request id and opens the span
//! 2. **Extractors** pull the caller's credential out of the request parts
//! 3. **Handler** calls into the rental services
//! 4. **`AppError`** turns any failure into a structured JSON response

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod middleware;

pub use error::AppError;
pub use extractors::BearerToken;
pub use middleware::{correlation_id_layer, CORRELATION_ID_HEADER};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
