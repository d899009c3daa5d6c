//! Shared protocol, storage and error types.
//!
//! - [`proto`] - generated wire types and service stubs.
//! - [`types`] - the persisted [`CountryRecord`](types::CountryRecord).
//! - [`error`] - the per-request [`Error`] type.

pub mod error;
pub mod types;

pub use error::{Error, Result};

/// gRPC service and message definitions generated from `proto/country.proto`.
///
/// ## Service
///
/// - `CountryService/CreateCountry` - persists one [`Country`](proto::Country)
///   and returns it with the store-assigned `id`.
///
/// ## Messages
///
/// - [`CreateCountryRequest`](proto::CreateCountryRequest) - wraps the country
///   to create. Its `id` is ignored.
/// - [`CreateCountryResponse`](proto::CreateCountryResponse) - wraps the
///   created country. Its `id` is always a non-empty hex string.
pub mod proto {
    tonic::include_proto!("proto");
}
