//! User document schema
//!
//! Farmer accounts: credentials, profile and farming context.

use bson::{doc, oid::ObjectId, Document};
use chrono::{DateTime, Utc};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// Profile fields a user may change themselves
pub const EDITABLE_PROFILE_FIELDS: &[&str] = &[
    "first_name",
    "last_name",
    "phone",
    "avatar_url",
    "language",
    "country",
    "region",
    "city",
];

pub const EDITABLE_FARMER_FIELDS: &[&str] = &[
    "experience_years",
    "farm_size_hectares",
    "primary_crops",
    "farming_type",
    "certifications",
];

pub const EDITABLE_PREFERENCE_FIELDS: &[&str] = &["notification_settings", "language", "timezone"];

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserProfile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub city: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct FarmerInfo {
    #[serde(default)]
    pub experience_years: u32,
    #[serde(default)]
    pub farm_size_hectares: f64,
    #[serde(default)]
    pub primary_crops: Vec<String>,
    #[serde(default = "default_farming_type")]
    pub farming_type: String,
    #[serde(default)]
    pub certifications: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Subscription {
    pub plan: String,
    pub start_date: DateTime<Utc>,
    pub is_active: bool,
}

impl Default for Subscription {
    fn default() -> Self {
        Self {
            plan: "free".to_string(),
            start_date: Utc::now(),
            is_active: true,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct NotificationSettings {
    pub email: bool,
    pub sms: bool,
    pub push: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            email: true,
            sms: false,
            push: true,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Preferences {
    #[serde(default)]
    pub notification_settings: NotificationSettings,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            notification_settings: NotificationSettings::default(),
            language: default_language(),
            timezone: default_timezone(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserStats {
    #[serde(default)]
    pub total_predictions: u64,
    #[serde(default)]
    pub last_activity: Option<DateTime<Utc>>,
}

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Public user identifier (UUID), carried in tokens
    pub user_id: String,

    /// Argon2 password hash
    pub password_hash: String,

    pub profile: UserProfile,

    #[serde(default)]
    pub farmer_info: FarmerInfo,

    #[serde(default)]
    pub subscription: Subscription,

    #[serde(default)]
    pub preferences: Preferences,

    #[serde(default)]
    pub stats: UserStats,

    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// What a user sees about their own account
#[derive(Serialize, Debug)]
pub struct PublicUser<'a> {
    pub user_id: &'a str,
    pub profile: &'a UserProfile,
    pub farmer_info: &'a FarmerInfo,
    pub subscription: &'a Subscription,
    pub preferences: &'a Preferences,
    pub stats: &'a UserStats,
}

fn default_language() -> String {
    "fr".to_string()
}

fn default_country() -> String {
    "CM".to_string()
}

fn default_timezone() -> String {
    "Africa/Douala".to_string()
}

fn default_farming_type() -> String {
    "traditional".to_string()
}

fn default_true() -> bool {
    true
}

impl UserDoc {
    /// Create a new active user document
    pub fn new(
        user_id: String,
        password_hash: String,
        profile: UserProfile,
        farmer_info: FarmerInfo,
    ) -> Self {
        let preferences = Preferences {
            language: profile.language.clone(),
            ..Preferences::default()
        };
        Self {
            _id: None,
            metadata: Metadata::new(),
            user_id,
            password_hash,
            profile,
            farmer_info,
            subscription: Subscription::default(),
            preferences,
            stats: UserStats::default(),
            is_active: true,
        }
    }

    pub fn public(&self) -> PublicUser<'_> {
        PublicUser {
            user_id: &self.user_id,
            profile: &self.profile,
            farmer_info: &self.farmer_info,
            subscription: &self.subscription,
            preferences: &self.preferences,
            stats: &self.stats,
        }
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "user_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("user_id_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "profile.email": 1 },
                Some(
                    IndexOptions::builder()
                        .name("email_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_view_hides_password_hash() {
        let user = UserDoc::new(
            "u-1".into(),
            "$argon2id$secret".into(),
            UserProfile {
                first_name: "Awa".into(),
                last_name: "Ngono".into(),
                email: "awa@example.cm".into(),
                language: "en".into(),
                ..Default::default()
            },
            FarmerInfo::default(),
        );
        let json = serde_json::to_value(user.public()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["profile"]["email"], "awa@example.cm");
        assert_eq!(json["preferences"]["language"], "en");
        assert_eq!(json["subscription"]["plan"], "free");
    }
}
