//! View models for the page. Nothing here decides anything; it only reshapes
//! conversation state into what the templates and the browser script draw.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conversation::{Conversation, Step};
use crate::gift::GiftOffer;
use crate::locale::{format_price, Language};
use crate::profile::{ChatEntry, Profile, BUDGET_SCALE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// Per-session display settings, passed explicitly into rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SessionContext {
    pub theme: Theme,
    pub language: Language,
}

/// Outcome of the best-effort write after a successful generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveStatus {
    #[default]
    Idle,
    Pending,
    Saved,
    Failed,
}

const CARD_ACCENTS: [&str; 5] = [
    "from-emerald-500 to-teal-500",
    "from-teal-500 to-green-500",
    "from-green-500 to-emerald-600",
    "from-emerald-600 to-teal-600",
    "from-teal-600 to-green-700",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketplaceLinkView {
    pub name: &'static str,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GiftCardView {
    pub name: String,
    pub description: String,
    pub price: String,
    pub icon: &'static str,
    pub accent: &'static str,
    pub links: Vec<MarketplaceLinkView>,
    /// Shown instead of marketplace buttons when there is nothing to link.
    pub find_yourself: Option<&'static str>,
}

pub fn gift_card(offer: &GiftOffer, index: usize, language: Language) -> GiftCardView {
    let links: Vec<_> = offer
        .marketplace_links()
        .into_iter()
        .map(|link| MarketplaceLinkView { name: link.marketplace.label(), url: link.url })
        .collect();
    let find_yourself = links.is_empty().then(|| language.find_yourself());

    GiftCardView {
        name: offer.name.clone(),
        description: offer.description.clone(),
        price: offer.price_range.clone(),
        icon: offer.category.icon(),
        accent: CARD_ACCENTS[index % CARD_ACCENTS.len()],
        links,
        find_yourself,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BudgetView {
    pub scale: Vec<u32>,
    pub min: u32,
    pub max: u32,
    pub min_label: String,
    pub max_label: String,
}

impl BudgetView {
    pub fn of(profile: &Profile) -> Self {
        Self {
            scale: BUDGET_SCALE.to_vec(),
            min: profile.budget_min,
            max: profile.budget_max,
            min_label: format_price(profile.budget_min),
            max_label: format_price(profile.budget_max),
        }
    }
}

/// Which controls are live for the current step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actions {
    pub text_input: bool,
    pub gender_choice: bool,
    pub continue_interests: bool,
    pub continue_photos: bool,
    pub photos_label: &'static str,
    pub find_gifts: bool,
    pub more_ideas: bool,
    pub reset: bool,
}

impl Actions {
    pub fn of(conversation: &Conversation) -> Self {
        let step = conversation.step();
        Self {
            text_input: matches!(step, Step::Name | Step::Age),
            gender_choice: step == Step::Gender,
            continue_interests: conversation.can_continue_interests(),
            continue_photos: conversation.can_continue_photos(),
            photos_label: conversation.language().photos_action(conversation.profile().photos.len()),
            find_gifts: step == Step::Budget,
            more_ideas: step == Step::Results && !conversation.offers().is_empty(),
            reset: step != Step::Greeting,
        }
    }
}

/// Everything the browser needs to redraw a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub step: Step,
    pub transcript: Vec<ChatEntry>,
    pub profile: Profile,
    pub cards: Vec<GiftCardView>,
    pub budget: BudgetView,
    pub actions: Actions,
    pub interest_suggestions: Vec<&'static str>,
    pub uploads_in_flight: usize,
    pub typing_ms: u64,
    pub context: SessionContext,
    pub save_status: SaveStatus,
}

pub fn snapshot(
    id: Uuid,
    conversation: &Conversation,
    context: SessionContext,
    save_status: SaveStatus,
    now: Instant,
) -> SessionSnapshot {
    let language = conversation.language();
    SessionSnapshot {
        id,
        step: conversation.step(),
        transcript: conversation.transcript().entries().to_vec(),
        profile: conversation.profile().clone(),
        cards: conversation
            .offers()
            .iter()
            .enumerate()
            .map(|(index, offer)| gift_card(offer, index, language))
            .collect(),
        budget: BudgetView::of(conversation.profile()),
        actions: Actions::of(conversation),
        interest_suggestions: language.interest_suggestions().to_vec(),
        uploads_in_flight: conversation.uploads_in_flight(),
        typing_ms: conversation.typing_remaining(now).as_millis() as u64,
        context,
        save_status,
    }
}
