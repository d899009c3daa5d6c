//! Server-side components of the country gRPC service.
//!
//! ## Submodules
//!
//! - [`config`] - CLI/environment configuration and validation.
//! - [`lifecycle`] - process state machine: store connection, listener
//!   bring-up, signal wait and ordered teardown.
//! - [`service`] - the `CountryService` gRPC handler.
//! - [`store`] - the persistence seam and its MongoDB and in-memory backends.
//! - [`telemetry`] - logging and optional OpenTelemetry export.

pub mod config;
pub mod lifecycle;
pub mod service;
pub mod store;
pub mod telemetry;
