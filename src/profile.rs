use serde::{Deserialize, Serialize};

use crate::gift::GiftOffer;

/// Allowed budget steps, ascending.
pub const BUDGET_SCALE: [u32; 12] = [
    500, 1000, 2000, 3000, 5000, 7000, 10000, 15000, 20000, 30000, 50000, 100000,
];
pub const DEFAULT_BUDGET_MIN: u32 = 2000;
pub const DEFAULT_BUDGET_MAX: u32 = 10000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

/// Snaps a requested amount to the first scale step at or above it, or the
/// top step when it is larger than every step.
pub fn snap_to_scale(value: u32) -> u32 {
    BUDGET_SCALE
        .iter()
        .copied()
        .find(|step| *step >= value)
        .unwrap_or(BUDGET_SCALE[BUDGET_SCALE.len() - 1])
}

/// Recipient attributes collected across the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub recipient_name: String,
    pub age: String,
    pub gender: Option<Gender>,
    pub interests: Vec<String>,
    pub photos: Vec<String>,
    pub budget_min: u32,
    pub budget_max: u32,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            recipient_name: String::new(),
            age: String::new(),
            gender: None,
            interests: Vec::new(),
            photos: Vec::new(),
            budget_min: DEFAULT_BUDGET_MIN,
            budget_max: DEFAULT_BUDGET_MAX,
        }
    }
}

impl Profile {
    /// Adds a tag unless it is blank or already present (case-insensitive).
    /// Returns whether the set changed.
    pub fn add_interest(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() {
            return false;
        }
        let lowered = tag.to_lowercase();
        if self.interests.iter().any(|existing| existing.to_lowercase() == lowered) {
            return false;
        }
        self.interests.push(tag.to_string());
        true
    }

    pub fn remove_interest(&mut self, tag: &str) -> bool {
        let lowered = tag.trim().to_lowercase();
        let before = self.interests.len();
        self.interests.retain(|existing| existing.to_lowercase() != lowered);
        self.interests.len() != before
    }

    pub fn add_photos(&mut self, urls: impl IntoIterator<Item = String>) {
        self.photos.extend(urls);
    }

    pub fn remove_photo(&mut self, index: usize) -> Option<String> {
        (index < self.photos.len()).then(|| self.photos.remove(index))
    }

    /// Moves the lower bound; drags the upper bound along if it would cross.
    pub fn set_budget_min(&mut self, value: u32) {
        self.budget_min = snap_to_scale(value);
        if self.budget_max < self.budget_min {
            self.budget_max = self.budget_min;
        }
    }

    /// Moves the upper bound; drags the lower bound along if it would cross.
    pub fn set_budget_max(&mut self, value: u32) {
        self.budget_max = snap_to_scale(value);
        if self.budget_min > self.budget_max {
            self.budget_min = self.budget_max;
        }
    }
}

/// One chat bubble.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub text: String,
    pub is_bot: bool,
}

impl ChatEntry {
    pub fn bot(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_bot: true }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_bot: false }
    }
}

/// Append-only log of chat bubbles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Transcript {
    entries: Vec<ChatEntry>,
}

impl Transcript {
    pub fn push_bot(&mut self, text: impl Into<String>) {
        self.entries.push(ChatEntry::bot(text));
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.entries.push(ChatEntry::user(text));
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&ChatEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything a conversation accumulates: who the gift is for, what was said,
/// and what has been suggested so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileStore {
    pub profile: Profile,
    pub transcript: Transcript,
    pub offers: Vec<GiftOffer>,
}
