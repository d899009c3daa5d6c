//! gRPC service implementation for creating country records.
//!
//! This module defines [`CountryHandler`], the concrete implementation of the
//! [`CountryService`] gRPC service defined in the protobuf specification. It
//! exposes a single unary endpoint that persists one country per call.
//!
//! ## Responsibilities
//!
//! - Map the inbound [`Country`] to a [`CountryRecord`] without an identifier.
//! - Insert the record through the injected [`CountryStore`].
//! - Interpret the store-generated identifier and shape the response.
//!
//! The response echoes the four descriptive fields of the request rather than
//! re-reading the stored document.
//!
//! Every call is tracked by [`InFlightCalls`] so shutdown can cut off calls
//! that outlive the drain window and wait until none of them touches the store
//! any more.

use crate::server::{
    store::CountryStore,
    telemetry::{increment_countries_created, increment_errors, increment_requests, record_request_duration},
};
use country_tonic_core::{
    Error,
    proto::{Country, CreateCountryRequest, CreateCountryResponse, country_service_server::CountryService},
    types::{CountryRecord, object_id_hex},
};
use std::sync::Arc;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tonic::{Request, Response, Status};

/// Calls currently inside [`CountryHandler::create`].
#[derive(Clone, Default)]
pub struct InFlightCalls {
    abandon: CancellationToken,
    tracker: TaskTracker,
}

impl InFlightCalls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tracker.len()
    }

    /// Makes every running and future call fail with [`Error::Abandoned`] and
    /// waits until no call is left. Once this returns nothing uses the store.
    pub async fn cut_off(&self) {
        self.abandon.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}

/// gRPC handler for the `CountryService`.
///
/// Holds a shared handle to the store; cloning the handler clones the handle,
/// not the connection.
#[derive(Clone)]
pub struct CountryHandler {
    store: Arc<dyn CountryStore>,
    in_flight: InFlightCalls,
}

impl CountryHandler {
    pub fn new(store: Arc<dyn CountryStore>) -> Self {
        Self::with_in_flight(store, InFlightCalls::new())
    }

    pub fn with_in_flight(store: Arc<dyn CountryStore>, in_flight: InFlightCalls) -> Self {
        Self { store, in_flight }
    }

    /// Persists `country` and returns it with the store-assigned identifier.
    ///
    /// # Errors
    ///
    /// - [`Error::Persistence`] if the insert fails.
    /// - [`Error::InvalidIdentifier`] if the store reports an identifier that
    ///   is not an `ObjectId`.
    /// - [`Error::Abandoned`] if shutdown cut the call off before the insert
    ///   finished.
    pub async fn create(&self, country: Country) -> Result<Country, Error> {
        let _call = self.in_flight.tracker.token();
        let record = CountryRecord::from(&country);

        let inserted_id = tokio::select! {
            biased;
            () = self.in_flight.abandon.cancelled() => return Err(Error::Abandoned),
            inserted = self.store.insert_one(record) => {
                inserted.map_err(|e| Error::persistence(format_args!("{e:#}")))?
            }
        };

        let id = object_id_hex(&inserted_id)?;

        Ok(Country { id, ..country })
    }
}

#[tonic::async_trait]
impl CountryService for CountryHandler {
    /// Handles a unary `CreateCountry` call.
    ///
    /// A request without a `country` is treated as a country whose fields are
    /// all empty.
    #[tracing::instrument(
        skip_all,
        fields(code = req.get_ref().country.as_ref().map(|c| c.code.as_str()).unwrap_or_default())
    )]
    async fn create_country(
        &self,
        req: Request<CreateCountryRequest>,
    ) -> Result<Response<CreateCountryResponse>, Status> {
        let start = std::time::Instant::now();
        increment_requests();

        let country = req.into_inner().country.unwrap_or_default();

        match self.create(country).await {
            Ok(country) => {
                tracing::debug!(id = %country.id, "Country created");
                increment_countries_created();
                record_request_duration(start.elapsed().as_millis() as f64);
                Ok(Response::new(CreateCountryResponse {
                    country: Some(country),
                }))
            }
            Err(e) => {
                tracing::warn!("CreateCountry failed: {e}");
                increment_errors();
                Err(e.into())
            }
        }
    }
}
