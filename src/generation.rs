use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::{debug, error, instrument};

use crate::config::AppConfig;
use crate::gift::{GiftCategory, GiftOffer, Marketplace};
use crate::locale::Language;
use crate::profile::{Gender, Profile};

/// Number of ideas requested per call.
pub const IDEAS_PER_REQUEST: usize = 5;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("failed to reach the inference endpoint: {0}")]
    Request(#[from] reqwest::Error),
    #[error("inference endpoint answered {status}: {body}")]
    Status { status: reqwest::StatusCode, body: String },
    #[error("inference response is not a chat completion: {0}")]
    Envelope(#[source] serde_json::Error),
    #[error("inference response carries no message content")]
    MissingContent,
    #[error("model output is not the expected gift payload: {0}")]
    Payload(#[source] serde_json::Error),
}

/// Anything that can turn a profile into gift ideas.
#[async_trait]
pub trait GiftGenerator: Send + Sync {
    async fn generate(&self, profile: &Profile, language: Language) -> Result<Vec<GiftOffer>, GenerationError>;
}

// Chat-completion request/response shapes (OpenAI-compatible).
#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
}

#[derive(Serialize, Deserialize, Debug)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize, Debug)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize, Debug)]
struct GiftPayload {
    #[serde(default, deserialize_with = "null_as_empty")]
    gifts: Vec<GiftOffer>,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<GiftOffer>, D::Error> {
    Ok(Option::<Vec<GiftOffer>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Renders the profile into the instruction sent to the model.
pub fn build_prompt(profile: &Profile, language: Language) -> String {
    let gender = match profile.gender {
        Some(Gender::Male) => "male",
        Some(Gender::Female) => "female",
        None => "not specified",
    };
    let photos_note = if profile.photos.is_empty() {
        String::new()
    } else {
        format!(
            "The user also attached {} photo(s) of the recipient's hobbies; take them into account.\n",
            profile.photos.len()
        )
    };
    let categories = GiftCategory::ALL
        .iter()
        .map(|category| category.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let links = [Marketplace::Ozon, Marketplace::Wildberries, Marketplace::YandexMarket]
        .iter()
        .map(|m| format!("  - {}: {}", m.link_field(), m.search_url_pattern()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a gift expert. Suggest {count} gift ideas based on this profile:\n\n\
        Name: {name}\n\
        Age: {age}\n\
        Gender: {gender}\n\
        Interests: {interests}\n\
        Budget: from {min} to {max} rubles\n\
        {photos_note}\n\
        For each gift provide:\n\
        - name\n\
        - description: why it is a good choice\n\
        - price_range: approximate price in rubles\n\
        - category: one of {categories}\n\
        - available_in_marketplaces (boolean): false for gift certificates, experiences, services \
        or anything else that cannot be bought on a marketplace\n\
        - if available_in_marketplaces is true, add search links:\n\
        {links}\n\n\
        Pick diverse, creative and personal ideas. Write all text in {language}.\n\
        Answer with a single JSON object: {{\"gifts\": [...]}}.",
        count = IDEAS_PER_REQUEST,
        name = profile.recipient_name,
        age = profile.age,
        gender = gender,
        interests = profile.interests.join(", "),
        min = profile.budget_min,
        max = profile.budget_max,
        photos_note = photos_note,
        categories = categories,
        links = links,
        language = language.prompt_name(),
    )
}

/// Unwraps the chat-completion envelope, then parses the JSON the model was
/// told to produce.
pub fn parse_completion(body: &str) -> Result<Vec<GiftOffer>, GenerationError> {
    let envelope: ChatCompletionResponse = serde_json::from_str(body).map_err(GenerationError::Envelope)?;
    let content = envelope
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(GenerationError::MissingContent)?;
    let payload: GiftPayload = serde_json::from_str(&content).map_err(GenerationError::Payload)?;
    Ok(payload.gifts)
}

/// HTTP client for an OpenAI-compatible chat-completion endpoint.
#[derive(Debug, Clone)]
pub struct GiftClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    referer: String,
}

impl GiftClient {
    pub fn new(endpoint: String, api_key: String, model: String, referer: String) -> Self {
        Self { client: Client::new(), endpoint, api_key, model, referer }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.inference_url.clone(),
            config.api_key.clone(),
            config.model.clone(),
            config.public_origin.clone(),
        )
    }
}

#[async_trait]
impl GiftGenerator for GiftClient {
    #[instrument(skip(self, profile), fields(recipient = %profile.recipient_name, model = %self.model))]
    async fn generate(&self, profile: &Profile, language: Language) -> Result<Vec<GiftOffer>, GenerationError> {
        let prompt = build_prompt(profile, language);
        debug!(?prompt, "Constructed gift prompt");

        let request_payload = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user".to_string(), content: Some(prompt) }],
            response_format: ResponseFormat { kind: "json_object" },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", &self.referer)
            .json(&request_payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(%status, %body, "Inference request failed");
            return Err(GenerationError::Status { status, body });
        }

        let body = response.text().await?;
        let offers = parse_completion(&body)?;
        debug!(count = offers.len(), "Parsed gift offers");
        Ok(offers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn profile() -> Profile {
        let mut profile = Profile {
            recipient_name: "Anna".to_string(),
            age: "25".to_string(),
            gender: Some(Gender::Female),
            ..Profile::default()
        };
        profile.add_interest("Music");
        profile.add_interest("Travel");
        profile
    }

    fn completion(content: &str) -> String {
        json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] }).to_string()
    }

    #[test]
    fn test_prompt_mentions_profile() {
        let prompt = build_prompt(&profile(), Language::English);
        assert!(prompt.contains("Name: Anna"));
        assert!(prompt.contains("Age: 25"));
        assert!(prompt.contains("Gender: female"));
        assert!(prompt.contains("Interests: Music, Travel"));
        assert!(prompt.contains("from 2000 to 10000"));
        assert!(prompt.contains("Suggest 5 gift ideas"));
        assert!(prompt.contains("ozon_link: https://www.ozon.ru/search/?text="));
        assert!(prompt.contains("luxury, music"));
        assert!(prompt.contains("{\"gifts\": [...]}"));
        assert!(!prompt.contains("photo(s)"));
    }

    #[test]
    fn test_prompt_notes_photos_and_language() {
        let mut p = profile();
        p.add_photos(vec!["/uploads/1.png".to_string()]);
        let prompt = build_prompt(&p, Language::Russian);
        assert!(prompt.contains("attached 1 photo(s)"));
        assert!(prompt.contains("Write all text in Russian"));
    }

    #[test]
    fn test_parse_completion() {
        let body = completion(r#"{"gifts":[{"name":"Vinyl","category":"music"},{"name":"Trip","category":"travel","available_in_marketplaces":false}]}"#);
        let offers = parse_completion(&body).unwrap();
        assert_eq!(offers.len(), 2);
        assert_eq!(offers[0].category, GiftCategory::Music);
        assert!(!offers[1].available_in_marketplaces);
    }

    #[test]
    fn test_parse_completion_without_gifts_key() {
        let offers = parse_completion(&completion("{}")).unwrap();
        assert!(offers.is_empty());
    }

    #[test]
    fn test_parse_completion_with_null_gifts() {
        let offers = parse_completion(&completion(r#"{"gifts": null}"#)).unwrap();
        assert!(offers.is_empty());
    }

    #[test]
    fn test_parse_failures() {
        assert!(matches!(parse_completion("not json"), Err(GenerationError::Envelope(_))));
        assert!(matches!(parse_completion(r#"{"choices":[]}"#), Err(GenerationError::MissingContent)));
        assert!(matches!(
            parse_completion(r#"{"error":{"message":"quota"}}"#),
            Err(GenerationError::Envelope(_))
        ));
        assert!(matches!(
            parse_completion(&completion("Here are some ideas: a watch")),
            Err(GenerationError::Payload(_))
        ));
    }
}
