use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::gift::GiftOffer;
use crate::locale::Language;
use crate::profile::Profile;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to reach the record store: {0}")]
    Request(#[from] reqwest::Error),
    #[error("record store answered {status}: {body}")]
    Status { status: reqwest::StatusCode, body: String },
}

/// One completed search, as written to the record store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GiftSearchRecord {
    pub recipient_name: String,
    pub age: u32,
    pub gender: Option<String>,
    pub interests: Vec<String>,
    pub budget_min: u32,
    pub budget_max: u32,
    pub photo_urls: Vec<String>,
    pub generated_gifts: Vec<GiftOffer>,
    pub created_at: DateTime<Utc>,
}

impl GiftSearchRecord {
    pub fn new(profile: &Profile, language: Language, generated_gifts: Vec<GiftOffer>) -> Self {
        Self {
            recipient_name: profile.recipient_name.clone(),
            age: language.age_years(&profile.age),
            gender: profile.gender.map(|g| g.as_str().to_string()),
            interests: profile.interests.clone(),
            budget_min: profile.budget_min,
            budget_max: profile.budget_max,
            photo_urls: profile.photos.clone(),
            generated_gifts,
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait GiftSearchStore: Send + Sync {
    async fn save(&self, record: &GiftSearchRecord) -> Result<(), StoreError>;
}

/// POSTs each record as JSON to a create-record endpoint.
#[derive(Debug, Clone)]
pub struct HttpRecordStore {
    client: Client,
    url: String,
}

impl HttpRecordStore {
    pub fn new(url: String) -> Self {
        Self { client: Client::new(), url }
    }
}

#[async_trait]
impl GiftSearchStore for HttpRecordStore {
    #[instrument(skip(self, record), fields(recipient = %record.recipient_name))]
    async fn save(&self, record: &GiftSearchRecord) -> Result<(), StoreError> {
        let response = self.client.post(&self.url).json(record).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(%status, %body, "Record store rejected gift search");
            return Err(StoreError::Status { status, body });
        }
        info!(gifts = record.generated_gifts.len(), "Gift search saved");
        Ok(())
    }
}

/// Keeps searches in the log only.
#[derive(Debug, Clone, Default)]
pub struct LogStore;

#[async_trait]
impl GiftSearchStore for LogStore {
    async fn save(&self, record: &GiftSearchRecord) -> Result<(), StoreError> {
        info!(
            recipient = %record.recipient_name,
            gifts = record.generated_gifts.len(),
            "Gift search completed (no record store configured)"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Gender;

    #[test]
    fn test_record_from_profile() {
        let mut profile = Profile {
            recipient_name: "Anna".to_string(),
            age: "twenty five".to_string(),
            gender: Some(Gender::Female),
            ..Profile::default()
        };
        profile.add_interest("Music");

        let record = GiftSearchRecord::new(&profile, Language::English, Vec::new());

        assert_eq!(record.age, 25);
        assert_eq!(record.gender.as_deref(), Some("female"));
        assert_eq!(record.interests, vec!["Music"]);
        assert_eq!((record.budget_min, record.budget_max), (2000, 10000));
        assert!(record.generated_gifts.is_empty());
    }
}
