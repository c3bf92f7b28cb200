//! Database schemas for AgriGuard
//!
//! MongoDB document structures for disease knowledge, user accounts and
//! prediction history.

mod disease;
mod metadata;
mod prediction;
mod user;

pub use disease::{DiseaseDoc, DocImpact, Localized, DISEASE_COLLECTION};
pub use metadata::Metadata;
pub use prediction::{PredictionDoc, PREDICTION_COLLECTION};
pub use user::{
    FarmerInfo, NotificationSettings, Preferences, PublicUser, Subscription, UserDoc,
    UserProfile, UserStats, EDITABLE_FARMER_FIELDS, EDITABLE_PREFERENCE_FIELDS,
    EDITABLE_PROFILE_FIELDS, USER_COLLECTION,
};
