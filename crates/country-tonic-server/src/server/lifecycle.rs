//! Process lifecycle for the country service.
//!
//! The process moves through a fixed sequence of [`Phase`]s:
//!
//! ```text
//! Initializing -> Connecting -> Listening -> ShuttingDown -> Stopped
//! ```
//!
//! - **Connecting**: the store connection is established within a bounded
//!   timeout. Failure is fatal.
//! - **Listening**: the listener is bound and the gRPC server runs on its own
//!   task while the caller's task waits for the shutdown signal. A bind failure
//!   is fatal; the store is disconnected before returning.
//! - **ShuttingDown**: strictly ordered, best-effort teardown. The server is
//!   told to stop accepting calls, then the listener is closed, then the store
//!   is disconnected. A failing step is logged and the next one still runs.
//! - **Stopped**: terminal. There is no restart path.
//!
//! ## In-flight calls
//!
//! Stopping the server lets calls that were already accepted run to
//! completion for up to the configured shutdown timeout. Calls still running
//! after that are cut off through [`InFlightCalls`]: their pending insert is
//! dropped, the client receives an `Internal` status and the store may or may
//! not have applied the write. The store is disconnected only once no call is
//! left inside the handler.

use crate::server::{
    service::handler::{CountryHandler, InFlightCalls},
    store::CountryStore,
};
use anyhow::{Context, anyhow};
use core::{future::Future, time::Duration};
use country_tonic_core::proto::country_service_server::CountryServiceServer;
use futures::Stream;
use std::{net::SocketAddr, sync::Arc};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpListener,
    task::JoinHandle,
};
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::{
    codec::CompressionEncoding,
    transport::{Server, server::Connected},
};

/// States of the service process, in the only order they can occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Initializing,
    Connecting,
    Listening,
    ShuttingDown,
    Stopped,
}

/// Drives the process from [`Phase::Initializing`] to [`Phase::Stopped`].
#[derive(Debug)]
pub struct Lifecycle {
    phase: Phase,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub const fn new() -> Self {
        Self {
            phase: Phase::Initializing,
        }
    }

    pub const fn phase(&self) -> Phase {
        self.phase
    }

    fn advance(&mut self, next: Phase) {
        debug_assert!(next > self.phase, "{:?} -> {next:?}", self.phase);
        tracing::debug!("Lifecycle {:?} -> {next:?}", self.phase);
        self.phase = next;
    }

    /// Runs `connect` with an upper bound of `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection attempt fails or does not finish in
    /// time. The caller is expected to terminate the process.
    pub async fn connect<S, F>(&mut self, timeout: Duration, connect: F) -> anyhow::Result<Arc<S>>
    where
        F: Future<Output = anyhow::Result<S>>,
    {
        self.advance(Phase::Connecting);

        let store = tokio::time::timeout(timeout, connect)
            .await
            .map_err(|_| anyhow!("store connection timed out after {timeout:?}"))??;

        Ok(Arc::new(store))
    }

    /// Binds the listener, serves `CountryService` on a spawned task and waits
    /// for `signal`, then tears everything down in order.
    ///
    /// Returns once [`Phase::Stopped`] is reached.
    ///
    /// # Errors
    ///
    /// - The listener could not be bound. The store has been disconnected.
    /// - The server task ended before `signal` fired. Teardown has still run.
    pub async fn serve<F>(
        &mut self,
        store: Arc<dyn CountryStore>,
        addr: SocketAddr,
        shutdown_timeout: Duration,
        signal: F,
    ) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
    {
        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                self.advance(Phase::ShuttingDown);
                disconnect_store(store.as_ref()).await;
                self.advance(Phase::Stopped);
                return Err(e).with_context(|| format!("failed to bind listener on {addr}"));
            }
        };

        self.serve_with_listener(store, listener, shutdown_timeout, signal)
            .await
    }

    /// Same as [`serve`](Self::serve) with an already bound listener.
    pub async fn serve_with_listener<F>(
        &mut self,
        store: Arc<dyn CountryStore>,
        listener: TcpListener,
        shutdown_timeout: Duration,
        signal: F,
    ) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
    {
        let local_addr = listener.local_addr()?;
        let stop = CancellationToken::new();
        let in_flight = InFlightCalls::new();
        let handler = CountryHandler::with_in_flight(Arc::clone(&store), in_flight.clone());

        let mut server: JoinHandle<Result<(), tonic::transport::Error>> =
            tokio::spawn(run_server_with_incoming(
                handler,
                TcpListenerStream::new(listener),
                stop.clone(),
            ));

        self.advance(Phase::Listening);
        tracing::info!("Country service listening on {local_addr}");

        let early_exit = tokio::select! {
            () = signal => None,
            joined = &mut server => Some(joined),
        };

        self.advance(Phase::ShuttingDown);

        // 1. Stop accepting calls and let in-flight ones drain
        tracing::info!("Stopping the server");
        stop.cancel();
        let died_early = early_exit.is_some();
        let server_result = match early_exit {
            Some(joined) => {
                tracing::error!("Server exited before a shutdown signal was received");
                flatten(joined)
            }
            None => drain(&mut server, &in_flight, shutdown_timeout).await,
        };
        if let Err(e) = &server_result {
            tracing::error!("Error while stopping the server: {e:#}");
        }
        // Connection tasks outlive the accept loop, so calls are cut off here
        in_flight.cut_off().await;

        // 2. The incoming stream owns the listener and is gone with the task
        tracing::info!("Closing the listener on {local_addr}");

        // 3. Release the store connection
        tracing::info!("Closing the store connection");
        disconnect_store(store.as_ref()).await;

        self.advance(Phase::Stopped);
        tracing::info!("Country service stopped");

        // Errors seen while stopping a healthy server were logged above; only a
        // server that died on its own is reported to the caller.
        if died_early {
            return Err(server_result
                .err()
                .unwrap_or_else(|| anyhow!("server stopped before a shutdown signal")));
        }
        Ok(())
    }
}

/// Waits up to `timeout` for the server task to finish. Otherwise the calls
/// still running are cut off and the accept loop is aborted.
async fn drain(
    server: &mut JoinHandle<Result<(), tonic::transport::Error>>,
    in_flight: &InFlightCalls,
    timeout: Duration,
) -> anyhow::Result<()> {
    match tokio::time::timeout(timeout, &mut *server).await {
        Ok(joined) => {
            tracing::debug!("All in-flight calls drained");
            flatten(joined)
        }
        Err(_) => {
            tracing::warn!(
                "Drain timed out after {timeout:?}, abandoning {} in-flight calls",
                in_flight.len()
            );
            in_flight.cut_off().await;
            server.abort();
            match server.await {
                Err(e) if e.is_cancelled() => Ok(()),
                joined => flatten(joined),
            }
        }
    }
}

fn flatten(
    joined: Result<Result<(), tonic::transport::Error>, tokio::task::JoinError>,
) -> anyhow::Result<()> {
    joined
        .context("server task failed")?
        .context("server returned an error")
}

async fn disconnect_store(store: &dyn CountryStore) {
    if let Err(e) = store.disconnect().await {
        tracing::error!("Error closing the store connection: {e:#}");
    }
}

async fn run_server_with_incoming<I, IO, IE>(
    handler: CountryHandler,
    incoming: I,
    stop: CancellationToken,
) -> Result<(), tonic::transport::Error>
where
    I: Stream<Item = Result<IO, IE>>,
    IO: AsyncRead + AsyncWrite + Connected + Unpin + Send + 'static,
    IE: Into<tower::BoxError>,
{
    Server::builder()
        .http2_adaptive_window(Some(true))
        .add_service(build_country_service(handler))
        .serve_with_incoming_shutdown(incoming, stop.cancelled_owned())
        .await
}

fn build_country_service(handler: CountryHandler) -> CountryServiceServer<CountryHandler> {
    CountryServiceServer::new(handler)
        .send_compressed(CompressionEncoding::Zstd)
        .send_compressed(CompressionEncoding::Gzip)
        .send_compressed(CompressionEncoding::Deflate)
        .accept_compressed(CompressionEncoding::Zstd)
        .accept_compressed(CompressionEncoding::Gzip)
        .accept_compressed(CompressionEncoding::Deflate)
}
