//! Conversational gift recommendations.
//!
//! A chat-style wizard collects who the gift is for, asks a chat-completion
//! model for ideas and renders them as cards linking to marketplaces. The
//! library holds the wizard, the model client and the persistence/upload seams;
//! the binary serves them over HTTP or in the terminal.

pub mod chat;
pub mod config;
pub mod constants;
pub mod conversation;
pub mod generation;
pub mod gift;
pub mod locale;
pub mod presentation;
pub mod profile;
pub mod session;
pub mod store;
pub mod uploads;
pub mod web_server;

pub use config::AppConfig;
pub use conversation::{Conversation, ConversationError, GenerationRequest, Input, Outcome, Pacing, Step};
pub use generation::{GenerationError, GiftClient, GiftGenerator};
pub use gift::{GiftCategory, GiftOffer};
pub use locale::Language;
pub use profile::{ChatEntry, Gender, Profile};
