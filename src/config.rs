use std::path::PathBuf;

use crate::constants;
use crate::conversation::Pacing;
use crate::locale::Language;

/// Everything the server and the terminal chat need to know about their
/// surroundings. Built once at startup and handed down explicitly.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub inference_url: String,
    pub model: String,
    pub api_key: String,
    pub public_origin: String,
    /// `None` keeps searches in the log only.
    pub store_url: Option<String>,
    pub upload_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub static_dir: PathBuf,
    pub language: Language,
    pub pacing: Pacing,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let store_url = if constants::STORE_URL.trim().is_empty() {
            None
        } else {
            Some(constants::STORE_URL.clone())
        };

        Self {
            inference_url: constants::INFERENCE_URL.clone(),
            model: constants::GIFT_MODEL.clone(),
            api_key: constants::OPENROUTER_API_KEY.clone(),
            public_origin: constants::PUBLIC_ORIGIN.clone(),
            store_url,
            upload_dir: PathBuf::from(constants::UPLOAD_DIR.as_str()),
            templates_dir: PathBuf::from(constants::TEMPLATES_DIR.as_str()),
            static_dir: PathBuf::from(constants::STATIC_DIR.as_str()),
            language: Language::default(),
            pacing: Pacing::default(),
        }
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }
}
