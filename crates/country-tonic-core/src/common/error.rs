//! Error types for the country service.
//!
//! This module defines the central `Error` enum, which captures every failure a
//! single `CreateCountry` call can report. It implements `From<Error>` for
//! `tonic::Status` so handlers can propagate with `?` and clients receive an
//! `Internal` status carrying the underlying cause.
//!
//! ## Error Cases
//! - `Persistence`: The insert into the document store failed (store
//!   unreachable, write error, ...).
//! - `InvalidIdentifier`: The store returned a generated identifier that is not
//!   an `ObjectId`.
//! - `Abandoned`: The service shut down while the insert was still running.

use tonic::Status;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the country service.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// Inserting the record into the store failed.
    #[error("failed to insert one to database: {context}")]
    Persistence { context: String },

    /// The store-generated identifier had an unexpected shape.
    #[error("failed to create objectID: {context}")]
    InvalidIdentifier { context: String },

    /// Shutdown cut the call off before the store answered. The insert may or
    /// may not have been applied.
    #[error("call abandoned during shutdown")]
    Abandoned,
}

impl Error {
    pub fn persistence(context: impl core::fmt::Display) -> Self {
        Self::Persistence {
            context: context.to_string(),
        }
    }
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::Persistence { .. } | Error::InvalidIdentifier { .. } | Error::Abandoned => {
                Status::internal(err.to_string())
            }
        }
    }
}
