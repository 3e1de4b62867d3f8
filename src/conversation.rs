//! The gift wizard as a finite-state sequencer.
//!
//! `Greeting -> Name -> Age -> Gender -> Interests -> Photos -> Budget ->
//! Generating -> Results`, with `Results -> Generating` for supplemental
//! requests. Every accepted input appends to the transcript and may move the
//! conversation forward; rejected input leaves the step and the profile alone.
//!
//! Bot replies come with a dwell time (the "typing" pause). Until it elapses
//! the next user input is refused with [`ConversationError::StillTyping`].
//! The generation call itself happens outside: entering `Generating` hands out
//! a [`GenerationRequest`] and the caller reports back through
//! [`Conversation::finish_generation`].

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::generation::GenerationError;
use crate::gift::GiftOffer;
use crate::locale::Language;
use crate::profile::{Gender, Profile, ProfileStore, Transcript};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Greeting,
    Name,
    Age,
    Gender,
    Interests,
    Photos,
    Budget,
    Generating,
    Results,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Greeting => "greeting",
            Step::Name => "name",
            Step::Age => "age",
            Step::Gender => "gender",
            Step::Interests => "interests",
            Step::Photos => "photos",
            Step::Budget => "budget",
            Step::Generating => "generating",
            Step::Results => "results",
        };
        f.write_str(name)
    }
}

/// How long the bot "types" before the next input is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub greeting: Duration,
    pub name_reply: Duration,
    pub reply: Duration,
    pub correction: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            greeting: Duration::from_millis(500),
            name_reply: Duration::from_millis(800),
            reply: Duration::from_millis(600),
            correction: Duration::from_millis(400),
        }
    }
}

impl Pacing {
    /// No dwell at all. Used by the terminal chat and by tests.
    pub fn instant() -> Self {
        Self {
            greeting: Duration::ZERO,
            name_reply: Duration::ZERO,
            reply: Duration::ZERO,
            correction: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Text(String),
    SelectGender(Gender),
    AddInterest(String),
    RemoveInterest(String),
    ContinueInterests,
    /// A photo batch has begun; it must be matched by one `UploadFinished`.
    UploadStarted,
    UploadFinished(Result<Vec<String>, String>),
    RemovePhoto(usize),
    ContinuePhotos,
    SetBudgetMin(u32),
    SetBudgetMax(u32),
    FindGifts,
    MoreIdeas,
}

impl Input {
    pub fn kind(&self) -> &'static str {
        match self {
            Input::Text(_) => "text",
            Input::SelectGender(_) => "select_gender",
            Input::AddInterest(_) => "add_interest",
            Input::RemoveInterest(_) => "remove_interest",
            Input::ContinueInterests => "continue_interests",
            Input::UploadStarted => "upload_started",
            Input::UploadFinished(_) => "upload_finished",
            Input::RemovePhoto(_) => "remove_photo",
            Input::ContinuePhotos => "continue_photos",
            Input::SetBudgetMin(_) => "set_budget_min",
            Input::SetBudgetMax(_) => "set_budget_max",
            Input::FindGifts => "find_gifts",
            Input::MoreIdeas => "more_ideas",
        }
    }

    // Upload completions are reported by the server, not typed by the user.
    fn waits_for_typing(&self) -> bool {
        !matches!(self, Input::UploadFinished(_))
    }
}

/// Snapshot of everything the generation client needs, detached from the
/// conversation so the call can run without holding it.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub ticket: u64,
    pub profile: Profile,
    pub language: Language,
    pub supplemental: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Moved to a new step.
    Advanced(Step),
    /// Profile edited in place, same step.
    Updated,
    /// Input refused with a corrective bot message, same step.
    Corrected,
    /// Entered `Generating`; the caller must run the request and report back.
    Generate(GenerationRequest),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConversationError {
    #[error("{input} is not accepted in the {step} step")]
    UnexpectedInput { step: Step, input: &'static str },
    #[error("input must not be empty")]
    EmptyInput,
    #[error("at least one interest is required")]
    NoInterests,
    #[error("{0} photo upload batch(es) still in flight")]
    UploadsPending(usize),
    #[error("no photo at position {0}")]
    NoSuchPhoto(usize),
    #[error("still typing, retry in {0:?}")]
    StillTyping(Duration),
    #[error("generation {ticket} is not the pending request")]
    StaleGeneration { ticket: u64 },
}

pub struct Conversation {
    language: Language,
    pacing: Pacing,
    step: Step,
    store: ProfileStore,
    uploads_in_flight: usize,
    pending_ticket: Option<u64>,
    completed_ticket: Option<u64>,
    next_ticket: u64,
    ready_at: Option<Instant>,
}

impl Conversation {
    pub fn new(language: Language, pacing: Pacing) -> Self {
        Self {
            language,
            pacing,
            step: Step::Greeting,
            store: ProfileStore::default(),
            uploads_in_flight: 0,
            pending_ticket: None,
            completed_ticket: None,
            next_ticket: 1,
            ready_at: None,
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn profile(&self) -> &Profile {
        &self.store.profile
    }

    pub fn transcript(&self) -> &Transcript {
        &self.store.transcript
    }

    pub fn offers(&self) -> &[GiftOffer] {
        &self.store.offers
    }

    pub fn uploads_in_flight(&self) -> usize {
        self.uploads_in_flight
    }

    pub fn pending_ticket(&self) -> Option<u64> {
        self.pending_ticket
    }

    /// Ticket of the request whose offers were merged most recently.
    pub fn completed_ticket(&self) -> Option<u64> {
        self.completed_ticket
    }

    pub fn can_continue_interests(&self) -> bool {
        self.step == Step::Interests && !self.store.profile.interests.is_empty()
    }

    pub fn can_continue_photos(&self) -> bool {
        self.step == Step::Photos && self.uploads_in_flight == 0
    }

    pub fn typing_remaining(&self, now: Instant) -> Duration {
        self.ready_at
            .map(|ready_at| ready_at.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }

    pub fn greet(&mut self) -> Result<Step, ConversationError> {
        self.greet_at(Instant::now())
    }

    /// Says hello and opens the name step.
    pub fn greet_at(&mut self, now: Instant) -> Result<Step, ConversationError> {
        if self.step != Step::Greeting {
            return Err(ConversationError::UnexpectedInput { step: self.step, input: "greet" });
        }
        self.store.transcript.push_bot(self.language.greeting());
        self.advance(Step::Name, now, self.pacing.greeting);
        Ok(self.step)
    }

    /// Drops everything collected so far, including any pending generation.
    pub fn clear(&mut self) {
        self.store = ProfileStore::default();
        self.step = Step::Greeting;
        self.uploads_in_flight = 0;
        self.pending_ticket = None;
        self.completed_ticket = None;
        self.ready_at = None;
    }

    pub fn reset(&mut self) -> Result<Step, ConversationError> {
        self.reset_at(Instant::now())
    }

    pub fn reset_at(&mut self, now: Instant) -> Result<Step, ConversationError> {
        info!("Resetting conversation");
        self.clear();
        self.greet_at(now)
    }

    pub fn apply(&mut self, input: Input) -> Result<Outcome, ConversationError> {
        self.apply_at(input, Instant::now())
    }

    pub fn apply_at(&mut self, input: Input, now: Instant) -> Result<Outcome, ConversationError> {
        if input.waits_for_typing() {
            let remaining = self.typing_remaining(now);
            if !remaining.is_zero() {
                return Err(ConversationError::StillTyping(remaining));
            }
        }

        debug!(step = %self.step, input = input.kind(), "Applying conversation input");

        match (self.step, input) {
            (Step::Name, Input::Text(text)) => self.accept_name(&text, now),
            (Step::Age, Input::Text(text)) => self.accept_age(&text, now),
            (Step::Gender, Input::SelectGender(gender)) => {
                self.store.profile.gender = Some(gender);
                self.store.transcript.push_user(self.language.gender_label(gender));
                self.store.transcript.push_bot(self.language.interests_prompt());
                Ok(self.advance(Step::Interests, now, self.pacing.reply))
            }
            (Step::Interests, Input::AddInterest(tag)) => {
                if tag.trim().is_empty() {
                    return Err(ConversationError::EmptyInput);
                }
                self.store.profile.add_interest(&tag);
                Ok(Outcome::Updated)
            }
            (Step::Interests, Input::RemoveInterest(tag)) => {
                self.store.profile.remove_interest(&tag);
                Ok(Outcome::Updated)
            }
            (Step::Interests, Input::ContinueInterests) => {
                if self.store.profile.interests.is_empty() {
                    return Err(ConversationError::NoInterests);
                }
                let summary = self.language.interests_summary(&self.store.profile.interests);
                self.store.transcript.push_user(summary);
                self.store.transcript.push_bot(self.language.photos_prompt());
                Ok(self.advance(Step::Photos, now, self.pacing.reply))
            }
            (Step::Photos, Input::UploadStarted) => {
                debug!(in_flight = self.uploads_in_flight + 1, "Photo upload batch started");
                self.uploads_in_flight += 1;
                Ok(Outcome::Updated)
            }
            (Step::Photos, Input::UploadFinished(result)) if self.uploads_in_flight > 0 => {
                self.uploads_in_flight -= 1;
                match result {
                    Ok(urls) => {
                        debug!(count = urls.len(), "Photo upload batch finished");
                        self.store.profile.add_photos(urls);
                    }
                    Err(reason) => warn!(%reason, "Photo upload batch failed, no photos added"),
                }
                Ok(Outcome::Updated)
            }
            (Step::Photos, Input::RemovePhoto(index)) => self
                .store
                .profile
                .remove_photo(index)
                .map(|_| Outcome::Updated)
                .ok_or(ConversationError::NoSuchPhoto(index)),
            (Step::Photos, Input::ContinuePhotos) => {
                if self.uploads_in_flight > 0 {
                    return Err(ConversationError::UploadsPending(self.uploads_in_flight));
                }
                let summary = self.language.photos_summary(self.store.profile.photos.len());
                self.store.transcript.push_user(summary);
                self.store.transcript.push_bot(self.language.budget_prompt());
                Ok(self.advance(Step::Budget, now, self.pacing.reply))
            }
            (Step::Budget, Input::SetBudgetMin(value)) => {
                self.store.profile.set_budget_min(value);
                Ok(Outcome::Updated)
            }
            (Step::Budget, Input::SetBudgetMax(value)) => {
                self.store.profile.set_budget_max(value);
                Ok(Outcome::Updated)
            }
            (Step::Budget, Input::FindGifts) => {
                let profile = &self.store.profile;
                let summary = self.language.budget_summary(profile.budget_min, profile.budget_max);
                self.store.transcript.push_user(summary);
                self.store.transcript.push_bot(self.language.generating());
                Ok(Outcome::Generate(self.begin_generation(false, now)))
            }
            (Step::Results, Input::MoreIdeas) => {
                self.store.transcript.push_bot(self.language.generating_more());
                Ok(Outcome::Generate(self.begin_generation(true, now)))
            }
            (step, input) => Err(ConversationError::UnexpectedInput { step, input: input.kind() }),
        }
    }

    pub fn finish_generation(
        &mut self,
        ticket: u64,
        result: Result<Vec<GiftOffer>, GenerationError>,
    ) -> Result<Step, ConversationError> {
        self.finish_generation_at(ticket, result, Instant::now())
    }

    /// Merges the outcome of a generation request. Offers are appended on
    /// success; on failure the conversation goes back to the budget step.
    pub fn finish_generation_at(
        &mut self,
        ticket: u64,
        result: Result<Vec<GiftOffer>, GenerationError>,
        now: Instant,
    ) -> Result<Step, ConversationError> {
        if self.step != Step::Generating || self.pending_ticket != Some(ticket) {
            return Err(ConversationError::StaleGeneration { ticket });
        }
        self.pending_ticket = None;

        match result {
            Ok(offers) => {
                let supplemental = !self.store.offers.is_empty();
                let line = self.language.generation_done(
                    offers.len(),
                    &self.store.profile.recipient_name,
                    supplemental,
                );
                info!(ticket, count = offers.len(), "Gift generation finished");
                self.store.offers.extend(offers);
                self.completed_ticket = Some(ticket);
                self.store.transcript.push_bot(line);
                self.advance(Step::Results, now, self.pacing.reply);
            }
            Err(e) => {
                warn!(ticket, error = %e, "Gift generation failed");
                self.store.transcript.push_bot(self.language.generation_failed());
                self.advance(Step::Budget, now, self.pacing.reply);
            }
        }
        Ok(self.step)
    }

    fn accept_name(&mut self, text: &str, now: Instant) -> Result<Outcome, ConversationError> {
        let name = text.trim();
        if name.is_empty() {
            return Err(ConversationError::EmptyInput);
        }
        self.store.profile.recipient_name = name.to_string();
        self.store.transcript.push_user(name);
        self.store.transcript.push_bot(self.language.name_ack(name));
        Ok(self.advance(Step::Age, now, self.pacing.name_reply))
    }

    fn accept_age(&mut self, text: &str, now: Instant) -> Result<Outcome, ConversationError> {
        let age = text.trim();
        if age.is_empty() {
            return Err(ConversationError::EmptyInput);
        }

        let all_digits = age.chars().all(|c| c.is_ascii_digit());
        if !all_digits && !self.language.contains_number_word(age) {
            debug!(%age, "Age rejected");
            self.store.transcript.push_bot(self.language.age_correction());
            self.ready_at = Some(now + self.pacing.correction);
            return Ok(Outcome::Corrected);
        }

        self.store.profile.age = age.to_string();
        self.store.transcript.push_user(age);
        self.store.transcript.push_bot(self.language.gender_prompt());
        Ok(self.advance(Step::Gender, now, self.pacing.reply))
    }

    fn begin_generation(&mut self, supplemental: bool, now: Instant) -> GenerationRequest {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.pending_ticket = Some(ticket);
        self.advance(Step::Generating, now, self.pacing.reply);
        info!(ticket, supplemental, "Gift generation requested");

        GenerationRequest {
            ticket,
            profile: self.store.profile.clone(),
            language: self.language,
            supplemental,
        }
    }

    fn advance(&mut self, step: Step, now: Instant, dwell: Duration) -> Outcome {
        self.step = step;
        self.ready_at = Some(now + dwell);
        Outcome::Advanced(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gift::GiftCategory;

    fn offer(name: &str) -> GiftOffer {
        GiftOffer {
            name: name.to_string(),
            description: "A thoughtful choice".to_string(),
            price_range: "3 000 ₽".to_string(),
            category: GiftCategory::Music,
            available_in_marketplaces: true,
            ozon_link: None,
            wildberries_link: None,
            yandex_market_link: None,
        }
    }

    fn greeted() -> Conversation {
        let mut conversation = Conversation::new(Language::English, Pacing::instant());
        conversation.greet().unwrap();
        conversation
    }

    /// Walks the wizard up to the budget step.
    fn at_budget() -> Conversation {
        let mut c = greeted();
        c.apply(Input::Text("Anna".into())).unwrap();
        c.apply(Input::Text("25".into())).unwrap();
        c.apply(Input::SelectGender(Gender::Female)).unwrap();
        c.apply(Input::AddInterest("Music".into())).unwrap();
        c.apply(Input::ContinueInterests).unwrap();
        c.apply(Input::ContinuePhotos).unwrap();
        assert_eq!(c.step(), Step::Budget);
        c
    }

    fn request_of(outcome: Outcome) -> GenerationRequest {
        match outcome {
            Outcome::Generate(request) => request,
            other => panic!("expected a generation request, got {:?}", other),
        }
    }

    #[test]
    fn test_greeting_opens_name_step() {
        let mut conversation = Conversation::new(Language::English, Pacing::instant());
        assert_eq!(conversation.step(), Step::Greeting);
        assert!(conversation.transcript().is_empty());

        assert_eq!(conversation.greet().unwrap(), Step::Name);
        assert_eq!(conversation.transcript().len(), 1);
        assert!(conversation.transcript().entries()[0].is_bot);
        assert!(conversation.greet().is_err());
    }

    #[test]
    fn test_name_is_recorded_and_acknowledged() {
        let mut c = greeted();
        let outcome = c.apply(Input::Text("Anna".into())).unwrap();

        assert_eq!(outcome, Outcome::Advanced(Step::Age));
        assert_eq!(c.profile().recipient_name, "Anna");
        let entries = c.transcript().entries();
        assert_eq!(entries[1].text, "Anna");
        assert!(!entries[1].is_bot);
        assert!(entries[2].is_bot);
        assert!(entries[2].text.contains("Anna"));
    }

    #[test]
    fn test_empty_name_is_ignored() {
        let mut c = greeted();
        assert_eq!(c.apply(Input::Text("   ".into())), Err(ConversationError::EmptyInput));
        assert_eq!(c.step(), Step::Name);
        assert_eq!(c.transcript().len(), 1);
    }

    #[test]
    fn test_age_accepts_digits_and_number_words() {
        for answer in ["25", "twenty", "Twenty five", "  7 "] {
            let mut c = greeted();
            c.apply(Input::Text("Anna".into())).unwrap();
            let outcome = c.apply(Input::Text(answer.into())).unwrap();
            assert_eq!(outcome, Outcome::Advanced(Step::Gender), "answer {:?}", answer);
            assert_eq!(c.profile().age, answer.trim());
        }
    }

    #[test]
    fn test_age_rejection_keeps_state() {
        for answer in ["abc", "25 years", "-3"] {
            let mut c = greeted();
            c.apply(Input::Text("Anna".into())).unwrap();
            let before = c.transcript().len();

            let outcome = c.apply(Input::Text(answer.into())).unwrap();

            assert_eq!(outcome, Outcome::Corrected, "answer {:?}", answer);
            assert_eq!(c.step(), Step::Age);
            assert!(c.profile().age.is_empty());
            assert_eq!(c.transcript().len(), before + 1);
            let last = c.transcript().last().unwrap();
            assert!(last.is_bot);
            assert_eq!(last.text, Language::English.age_correction());
        }
    }

    #[test]
    fn test_russian_number_words() {
        let mut c = Conversation::new(Language::Russian, Pacing::instant());
        c.greet().unwrap();
        c.apply(Input::Text("Анна".into())).unwrap();
        assert_eq!(c.apply(Input::Text("двадцать пять".into())).unwrap(), Outcome::Advanced(Step::Gender));
    }

    #[test]
    fn test_interests_gate() {
        let mut c = greeted();
        c.apply(Input::Text("Anna".into())).unwrap();
        c.apply(Input::Text("30".into())).unwrap();
        c.apply(Input::SelectGender(Gender::Female)).unwrap();

        assert_eq!(c.step(), Step::Interests);
        assert!(!c.can_continue_interests());
        assert_eq!(c.apply(Input::ContinueInterests), Err(ConversationError::NoInterests));

        c.apply(Input::AddInterest("Music".into())).unwrap();
        c.apply(Input::AddInterest("Travel".into())).unwrap();
        assert!(c.can_continue_interests());

        c.apply(Input::RemoveInterest("Travel".into())).unwrap();
        c.apply(Input::ContinueInterests).unwrap();
        assert_eq!(c.step(), Step::Photos);
        let user_line = &c.transcript().entries()[c.transcript().len() - 2];
        assert_eq!(user_line.text, "Interests: Music");
    }

    #[test]
    fn test_photos_blocked_while_uploading() {
        let mut c = greeted();
        c.apply(Input::Text("Anna".into())).unwrap();
        c.apply(Input::Text("30".into())).unwrap();
        c.apply(Input::SelectGender(Gender::Female)).unwrap();
        c.apply(Input::AddInterest("Art".into())).unwrap();
        c.apply(Input::ContinueInterests).unwrap();

        c.apply(Input::UploadStarted).unwrap();
        assert!(!c.can_continue_photos());
        assert_eq!(c.apply(Input::ContinuePhotos), Err(ConversationError::UploadsPending(1)));

        c.apply(Input::UploadFinished(Ok(vec!["/uploads/a.png".into(), "/uploads/b.png".into()])))
            .unwrap();
        c.apply(Input::UploadStarted).unwrap();
        c.apply(Input::UploadFinished(Err("disk full".into()))).unwrap();
        assert_eq!(c.profile().photos.len(), 2);

        c.apply(Input::RemovePhoto(0)).unwrap();
        assert_eq!(c.apply(Input::RemovePhoto(3)), Err(ConversationError::NoSuchPhoto(3)));

        assert!(c.can_continue_photos());
        c.apply(Input::ContinuePhotos).unwrap();
        assert_eq!(c.step(), Step::Budget);
        let user_line = &c.transcript().entries()[c.transcript().len() - 2];
        assert_eq!(user_line.text, "Photos uploaded: 1");
    }

    #[test]
    fn test_skipping_photos() {
        let c = at_budget();
        let user_line = &c.transcript().entries()[c.transcript().len() - 2];
        assert_eq!(user_line.text, "Skipping photo upload");
        assert!(c.profile().photos.is_empty());
    }

    #[test]
    fn test_find_gifts_then_results() {
        let mut c = at_budget();
        c.apply(Input::SetBudgetMin(2000)).unwrap();
        c.apply(Input::SetBudgetMax(10000)).unwrap();

        let request = request_of(c.apply(Input::FindGifts).unwrap());
        assert_eq!(c.step(), Step::Generating);
        assert!(!request.supplemental);
        assert_eq!(request.profile.recipient_name, "Anna");

        let budget_line = &c.transcript().entries()[c.transcript().len() - 2];
        assert_eq!(budget_line.text, "Budget: 2\u{a0}000 ₽ — 10\u{a0}000 ₽");
        assert!(!budget_line.is_bot);

        let offers = vec![offer("Vinyl"), offer("Concert tickets")];
        assert_eq!(c.finish_generation(request.ticket, Ok(offers.clone())).unwrap(), Step::Results);
        assert_eq!(c.offers(), offers.as_slice());
        assert_eq!(c.transcript().last().unwrap().text, "Done! Found 2 gift ideas for Anna 🎉");
    }

    #[test]
    fn test_generating_accepts_no_input() {
        let mut c = at_budget();
        c.apply(Input::FindGifts).unwrap();

        for input in [Input::FindGifts, Input::MoreIdeas, Input::Text("hello".into()), Input::SetBudgetMin(500)] {
            assert!(matches!(
                c.apply(input),
                Err(ConversationError::UnexpectedInput { step: Step::Generating, .. })
            ));
        }
    }

    #[test]
    fn test_generation_failure_returns_to_budget() {
        let mut c = at_budget();
        let request = request_of(c.apply(Input::FindGifts).unwrap());

        let step = c.finish_generation(request.ticket, Err(GenerationError::MissingContent)).unwrap();

        assert_eq!(step, Step::Budget);
        assert!(c.offers().is_empty());
        assert_eq!(c.transcript().last().unwrap().text, Language::English.generation_failed());

        // The user can retry straight away.
        assert!(matches!(c.apply(Input::FindGifts).unwrap(), Outcome::Generate(_)));
    }

    #[test]
    fn test_more_ideas_appends() {
        let mut c = at_budget();
        let first = request_of(c.apply(Input::FindGifts).unwrap());
        c.finish_generation(first.ticket, Ok(vec![offer("A"), offer("B")])).unwrap();

        let second = request_of(c.apply(Input::MoreIdeas).unwrap());
        assert!(second.supplemental);
        assert_ne!(first.ticket, second.ticket);
        c.finish_generation(second.ticket, Ok(vec![offer("A"), offer("C")])).unwrap();

        let names: Vec<_> = c.offers().iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "A", "C"]);
        assert_eq!(c.step(), Step::Results);
        assert!(c.transcript().last().unwrap().text.contains("2 new gift ideas"));
    }

    #[test]
    fn test_stale_generation_is_discarded() {
        let mut c = at_budget();
        let request = request_of(c.apply(Input::FindGifts).unwrap());
        c.reset().unwrap();

        let result = c.finish_generation(request.ticket, Ok(vec![offer("Late")]));

        assert_eq!(result, Err(ConversationError::StaleGeneration { ticket: request.ticket }));
        assert!(c.offers().is_empty());
        assert_eq!(c.step(), Step::Name);
    }

    #[test]
    fn test_completed_ticket_follows_latest_search() {
        let mut c = at_budget();
        let first = request_of(c.apply(Input::FindGifts).unwrap());
        c.finish_generation(first.ticket, Ok(vec![offer("A")])).unwrap();
        assert_eq!(c.completed_ticket(), Some(first.ticket));

        c.reset().unwrap();
        assert_eq!(c.completed_ticket(), None);

        c.apply(Input::Text("Boris".into())).unwrap();
        c.apply(Input::Text("40".into())).unwrap();
        c.apply(Input::SelectGender(Gender::Male)).unwrap();
        c.apply(Input::AddInterest("Sport".into())).unwrap();
        c.apply(Input::ContinueInterests).unwrap();
        c.apply(Input::ContinuePhotos).unwrap();
        let second = request_of(c.apply(Input::FindGifts).unwrap());
        assert!(second.ticket > first.ticket);

        c.finish_generation(second.ticket, Err(GenerationError::MissingContent)).unwrap();
        assert_eq!(c.completed_ticket(), None);
    }

    #[test]
    fn test_clear_and_reset() {
        let mut c = at_budget();
        let request = request_of(c.apply(Input::FindGifts).unwrap());
        c.finish_generation(request.ticket, Ok(vec![offer("A")])).unwrap();

        c.clear();
        assert!(c.transcript().is_empty());
        assert_eq!(c.profile(), &Profile::default());
        assert!(c.offers().is_empty());
        assert_eq!(c.step(), Step::Greeting);

        assert_eq!(c.reset().unwrap(), Step::Name);
        assert_eq!(c.transcript().len(), 1);
        assert_eq!(c.transcript().entries()[0].text, Language::English.greeting());
        assert_eq!(c.profile(), &Profile::default());
    }

    #[test]
    fn test_dwell_blocks_early_input() {
        let start = Instant::now();
        let mut c = Conversation::new(Language::English, Pacing::default());
        c.greet_at(start).unwrap();

        let early = c.apply_at(Input::Text("Anna".into()), start + Duration::from_millis(100));
        assert_eq!(early, Err(ConversationError::StillTyping(Duration::from_millis(400))));
        assert_eq!(c.step(), Step::Name);

        let later = start + Duration::from_millis(500);
        c.apply_at(Input::Text("Anna".into()), later).unwrap();
        assert_eq!(c.typing_remaining(later), Duration::from_millis(800));

        let after_reply = later + Duration::from_millis(800);
        c.apply_at(Input::Text("abc".into()), after_reply).unwrap();
        assert_eq!(c.typing_remaining(after_reply), Duration::from_millis(400));
    }

    #[test]
    fn test_out_of_order_inputs_rejected() {
        let mut c = greeted();
        assert_eq!(
            c.apply(Input::FindGifts),
            Err(ConversationError::UnexpectedInput { step: Step::Name, input: "find_gifts" })
        );
        assert_eq!(
            c.apply(Input::UploadFinished(Ok(vec![]))),
            Err(ConversationError::UnexpectedInput { step: Step::Name, input: "upload_finished" })
        );
    }
}
