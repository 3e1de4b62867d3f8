// Environment-backed defaults. `AppConfig` (see config.rs) gathers these into
// an explicit value that is passed around instead of read ad hoc.

use std::env;

lazy_static::lazy_static! {
    pub static ref INFERENCE_URL: String = env::var("IDEA4GIFT_INFERENCE_URL")
        .unwrap_or_else(|_| "https://openrouter.ai/api/v1/chat/completions".to_string());
    pub static ref GIFT_MODEL: String = env::var("IDEA4GIFT_MODEL")
        .unwrap_or_else(|_| "deepseek/deepseek-r1-distill-qwen-32b".to_string());
    pub static ref OPENROUTER_API_KEY: String = env::var("OPENROUTER_API_KEY").unwrap_or_default();
    // Sent as HTTP-Referer so the inference provider can attribute requests to this site.
    pub static ref PUBLIC_ORIGIN: String = env::var("IDEA4GIFT_PUBLIC_ORIGIN")
        .unwrap_or_else(|_| "http://localhost:9900".to_string());
    // Empty means "log only": searches are not persisted anywhere.
    pub static ref STORE_URL: String = env::var("IDEA4GIFT_STORE_URL").unwrap_or_default();
    pub static ref UPLOAD_DIR: String = env::var("IDEA4GIFT_UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string());
    pub static ref TEMPLATES_DIR: String = env::var("IDEA4GIFT_TEMPLATES_DIR").unwrap_or_else(|_| "templates".to_string());
    pub static ref STATIC_DIR: String = env::var("IDEA4GIFT_STATIC_DIR").unwrap_or_else(|_| "static".to_string());
}

pub const DEFAULT_PORT: u16 = 9900;
