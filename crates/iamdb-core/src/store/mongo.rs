use async_trait::async_trait;
use bson::doc;
use futures::TryStreamExt;
use iamdb_models::EnrichedMovie;
use mongodb::options::{ClientOptions, ReplaceOptions};
use mongodb::{Client, Collection};
use tracing::{debug, info};

use super::{MovieStore, StoredMovie};
use crate::error::{PersistenceError, UpsertError};

/// Movie collection in a MongoDB database.
///
/// Built once per run from the resolved connection URI and passed down.
pub struct MongoStore {
    collection: Collection<StoredMovie>,
    namespace: String,
}

impl MongoStore {
    pub async fn connect(
        uri: &str,
        database: &str,
        collection: &str,
    ) -> Result<Self, PersistenceError> {
        let mut options = ClientOptions::parse(uri).await?;
        options.app_name = Some("iamdb".to_string());
        let client = Client::with_options(options)?;

        let namespace = format!("{}.{}", database, collection);
        info!("Using MongoDB collection {}", namespace);

        Ok(Self {
            collection: client.database(database).collection(collection),
            namespace,
        })
    }
}

#[async_trait]
impl MovieStore for MongoStore {
    fn describe(&self) -> String {
        self.namespace.clone()
    }

    async fn upsert(&self, movie: &EnrichedMovie) -> Result<(), UpsertError> {
        let stored = StoredMovie::from_movie(movie)?.touched();
        let options = ReplaceOptions::builder().upsert(true).build();

        let result = self
            .collection
            .replace_one(doc! { "_id": stored.external_id.as_str() }, &stored, options)
            .await
            .map_err(PersistenceError::from)?;

        debug!(
            id = %stored.external_id,
            matched = result.matched_count,
            upserted = result.upserted_id.is_some(),
            "Replaced document"
        );
        Ok(())
    }

    async fn fetch_all(&self) -> Result<Vec<EnrichedMovie>, PersistenceError> {
        let cursor = self.collection.find(None, None).await?;
        let stored: Vec<StoredMovie> = cursor.try_collect().await?;
        debug!("Fetched {} documents from {}", stored.len(), self.namespace);
        Ok(stored.into_iter().map(EnrichedMovie::from).collect())
    }
}
