//! MongoDB-backed [`CountryStore`].
//!
//! Inserts go to a typed `Collection<CountryRecord>`; the generated `_id` is
//! handed back untouched so the handler decides how to interpret it.

use super::CountryStore;
use anyhow::{Context, anyhow};
use core::time::Duration;
use country_tonic_core::{bson::Bson, types::CountryRecord};
use mongodb::{Client, Collection, bson::doc, options::ClientOptions};
use std::future::IntoFuture;

/// [`CountryStore`] backed by a MongoDB collection.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    collection: Collection<CountryRecord>,
}

impl MongoStore {
    /// Builds a client for `uri` and verifies the deployment answers a `ping`
    /// within `timeout`.
    ///
    /// The driver connects lazily, so the ping is what makes an unreachable
    /// store fail here rather than on the first insert.
    pub async fn connect(
        uri: &str,
        database: &str,
        collection: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let mut options = ClientOptions::parse(uri)
            .await
            .context("invalid MongoDB connection string")?;
        options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);

        let client = Client::with_options(options).context("failed to build MongoDB client")?;
        let database = client.database(database);

        tokio::time::timeout(timeout, database.run_command(doc! { "ping": 1 }).into_future())
            .await
            .map_err(|_| anyhow!("no response from MongoDB within {timeout:?}"))?
            .context("MongoDB ping failed")?;

        tracing::info!(
            "Connected to MongoDB database `{}`, collection `{}`",
            database.name(),
            collection
        );

        Ok(Self {
            collection: database.collection(collection),
            client,
        })
    }
}

#[tonic::async_trait]
impl CountryStore for MongoStore {
    async fn insert_one(&self, record: CountryRecord) -> anyhow::Result<Bson> {
        let result = self.collection.insert_one(record).await?;
        Ok(result.inserted_id)
    }

    async fn disconnect(&self) -> anyhow::Result<()> {
        self.client.clone().shutdown().await;
        Ok(())
    }
}
