//! MongoDB persistence: client wrapper and document schemas

pub mod mongo;
pub mod schemas;

pub use mongo::{IntoIndexes, MongoClient, MongoCollection, MutMetadata};
pub use schemas::{
    DiseaseDoc, Metadata, PredictionDoc, UserDoc, DISEASE_COLLECTION, PREDICTION_COLLECTION,
    USER_COLLECTION,
};
