//! MongoDB client and collection wrapper
//!
//! Every collection AgriGuard reads carries a top-level `is_active` flag;
//! reads only ever see active documents and deletes only clear the flag.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::{
    options::{IndexOptions, UpdateModifications},
    results::UpdateResult,
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::{error, info};

use crate::db::schemas::Metadata;
use crate::types::AgriError;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Connect and ping, giving up after `timeout`
    pub async fn new(uri: &str, db_name: &str, timeout: Duration) -> Result<Self, AgriError> {
        info!("Connecting to MongoDB at {}", uri);

        let mongo = Self::lazy(uri, db_name, timeout).await?;
        mongo.ping().await?;

        info!("Connected to MongoDB database '{}'", db_name);
        Ok(mongo)
    }

    /// Build a client without talking to the server
    pub async fn lazy(uri: &str, db_name: &str, timeout: Duration) -> Result<Self, AgriError> {
        let client = Client::with_uri_str(with_timeouts(uri, timeout))
            .await
            .map_err(|e| AgriError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    pub async fn ping(&self) -> Result<(), AgriError> {
        self.client
            .database(&self.db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| AgriError::Database(format!("MongoDB ping failed: {}", e)))?;
        Ok(())
    }

    /// Get a typed collection, creating its indexes
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, AgriError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    /// Get a typed collection without touching its indexes
    pub fn collection_unindexed<T>(&self, name: &str) -> MongoCollection<T>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes,
    {
        MongoCollection {
            inner: self.client.database(&self.db_name).collection::<T>(name),
        }
    }

    /// Get the raw MongoDB client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get the database name
    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

/// Bound server selection and connect by `timeout`
fn with_timeouts(uri: &str, timeout: Duration) -> String {
    let millis = timeout.as_millis();
    let options = format!(
        "serverSelectionTimeoutMS={}&connectTimeoutMS={}",
        millis, millis
    );

    if uri.contains('?') {
        return format!("{}&{}", uri, options);
    }

    // options must follow the "/" that ends the host list
    let hosts = uri.split_once("://").map_or(uri, |(_, rest)| rest);
    if hosts.contains('/') {
        format!("{}?{}", uri, options)
    } else {
        format!("{}/?{}", uri, options)
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes,
{
    /// Create a new collection and apply indexes
    pub async fn new(
        client: &Client,
        db_name: &str,
        collection_name: &str,
    ) -> Result<Self, AgriError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.ensure_indexes().await?;

        Ok(mongo_collection)
    }

    /// Create the schema's indexes; existing identical indexes are a no-op
    pub async fn ensure_indexes(&self) -> Result<(), AgriError> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| AgriError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Find one active document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, AgriError> {
        let mut full_filter = filter;
        full_filter.insert("is_active", true);

        self.inner
            .find_one(full_filter)
            .await
            .map_err(|e| AgriError::Database(format!("Find failed: {}", e)))
    }

    /// Find all active documents matching a filter
    ///
    /// Documents that fail to decode are logged and skipped.
    pub async fn find_many(&self, filter: Document) -> Result<Vec<T>, AgriError> {
        use futures_util::StreamExt;

        let mut full_filter = filter;
        full_filter.insert("is_active", true);

        let cursor = self
            .inner
            .find(full_filter)
            .await
            .map_err(|e| AgriError::Database(format!("Find failed: {}", e)))?;

        let results: Vec<T> = cursor
            .filter_map(|doc| async {
                match doc {
                    Ok(d) => Some(d),
                    Err(e) => {
                        error!("Error reading document: {}", e);
                        None
                    }
                }
            })
            .collect()
            .await;

        Ok(results)
    }

    /// Update one document
    pub async fn update_one(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<UpdateResult, AgriError> {
        self.inner
            .update_one(filter, update.into())
            .await
            .map_err(|e| AgriError::Database(format!("Update failed: {}", e)))
    }

    /// Deactivate a document instead of removing it
    pub async fn soft_delete(&self, filter: Document) -> Result<UpdateResult, AgriError> {
        let update = doc! {
            "$set": {
                "is_active": false,
                "metadata.deleted_at": DateTime::now(),
                "metadata.updated_at": DateTime::now(),
            }
        };

        self.update_one(filter, update).await
    }

    /// Get the underlying collection for advanced operations
    pub fn inner(&self) -> &Collection<T> {
        &self.inner
    }
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
{
    /// Insert a document, setting metadata timestamps
    pub async fn insert_one(&self, mut item: T) -> Result<ObjectId, AgriError> {
        let metadata = item.mut_metadata();
        metadata.created_at = Some(DateTime::now());
        metadata.updated_at = Some(DateTime::now());

        let result = self
            .inner
            .insert_one(item)
            .await
            .map_err(|e| AgriError::Database(format!("Insert failed: {}", e)))?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| AgriError::Database("Failed to get inserted ID".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeouts_appended_to_uri() {
        let t = Duration::from_millis(1500);
        assert_eq!(
            with_timeouts("mongodb://localhost:27017", t),
            "mongodb://localhost:27017/?serverSelectionTimeoutMS=1500&connectTimeoutMS=1500"
        );
        assert_eq!(
            with_timeouts("mongodb://db:27017/agriguard_db", t),
            "mongodb://db:27017/agriguard_db?serverSelectionTimeoutMS=1500&connectTimeoutMS=1500"
        );
        assert_eq!(
            with_timeouts("mongodb://db/?replicaSet=rs0", t),
            "mongodb://db/?replicaSet=rs0&serverSelectionTimeoutMS=1500&connectTimeoutMS=1500"
        );
    }
}
