// Terminal front end for the gift wizard. Drives the same conversation
// controller as the web UI, reading answers line by line.

use std::path::Path;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

use crate::conversation::{Conversation, ConversationError, GenerationRequest, Input, Outcome, Pacing, Step};
use crate::generation::GiftGenerator;
use crate::locale::{format_price, Language};
use crate::presentation::gift_card;
use crate::profile::{Gender, BUDGET_SCALE};
use crate::store::{GiftSearchRecord, GiftSearchStore};
use crate::uploads::{upload_all, PhotoFile, PhotoStore};

/// Collaborators the terminal chat talks to.
pub struct ChatServices<'a> {
    pub generator: &'a dyn GiftGenerator,
    pub store: &'a dyn GiftSearchStore,
    pub photos: &'a dyn PhotoStore,
}

struct Terminal<R, W> {
    reader: R,
    writer: W,
    printed: usize,
}

impl<R: AsyncBufRead + Unpin, W: AsyncWrite + Unpin> Terminal<R, W> {
    async fn say(&mut self, text: &str) -> Result<()> {
        self.writer.write_all(text.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Prints bot lines added since the last call. User lines were typed by
    /// the user and are not echoed.
    async fn catch_up(&mut self, conversation: &Conversation) -> Result<()> {
        let entries = conversation.transcript().entries();
        let fresh: Vec<String> = entries[self.printed.min(entries.len())..]
            .iter()
            .filter(|entry| entry.is_bot)
            .map(|entry| format!("🎁 {}", entry.text))
            .collect();
        self.printed = entries.len();
        for line in fresh {
            self.say(&line).await?;
        }
        Ok(())
    }

    /// `None` on end of input.
    async fn ask(&mut self, prompt: &str) -> Result<Option<String>> {
        self.writer.write_all(prompt.as_bytes()).await?;
        self.writer.flush().await?;
        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

fn parse_gender(answer: &str) -> Option<Gender> {
    match answer.to_lowercase().as_str() {
        "1" | "m" | "male" | "м" | "мужчина" => Some(Gender::Male),
        "2" | "f" | "female" | "ж" | "женщина" => Some(Gender::Female),
        _ => None,
    }
}

fn parse_budget(answer: &str) -> Option<(u32, u32)> {
    let mut parts = answer
        .split(|c: char| c.is_whitespace() || c == '-' || c == ',')
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<u32>());
    match (parts.next(), parts.next(), parts.next()) {
        (Some(Ok(min)), Some(Ok(max)), None) => Some((min, max)),
        _ => None,
    }
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()).map(str::to_lowercase).as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

async fn read_photos(answer: &str) -> Result<Vec<PhotoFile>> {
    let mut files = Vec::new();
    for raw in answer.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let path = Path::new(raw);
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        files.push(PhotoFile {
            filename: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| raw.to_string()),
            content_type: content_type_for(path).to_string(),
            bytes,
        });
    }
    Ok(files)
}

async fn run_generation<R, W>(
    term: &mut Terminal<R, W>,
    conversation: &mut Conversation,
    services: &ChatServices<'_>,
    request: GenerationRequest,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    term.catch_up(conversation).await?;
    let already_shown = conversation.offers().len();

    let result = services.generator.generate(&request.profile, request.language).await;
    let offers = result.as_ref().ok().cloned();
    conversation.finish_generation(request.ticket, result)?;
    term.catch_up(conversation).await?;

    let Some(offers) = offers else { return Ok(()) };
    for (index, offer) in conversation.offers().iter().enumerate().skip(already_shown) {
        let card = gift_card(offer, index, conversation.language());
        term.say(&format!("\n{}. {} ({})\n   {}", index + 1, card.name, card.price, card.description))
            .await?;
        match card.find_yourself {
            Some(notice) => term.say(&format!("   {}", notice)).await?,
            None => {
                for link in card.links {
                    term.say(&format!("   {}: {}", link.name, link.url)).await?;
                }
            }
        }
    }

    let record = GiftSearchRecord::new(&request.profile, request.language, offers);
    if let Err(e) = services.store.save(&record).await {
        warn!(error = %e, "Failed to save gift search");
    }
    Ok(())
}

/// Runs the wizard until the input ends or the user quits.
pub async fn run_gift_chat<R, W>(
    language: Language,
    services: ChatServices<'_>,
    reader: R,
    writer: W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!("Starting terminal gift chat...");
    let mut term = Terminal { reader, writer, printed: 0 };
    let mut conversation = Conversation::new(language, Pacing::instant());
    conversation.greet()?;

    loop {
        term.catch_up(&conversation).await?;

        let step = conversation.step();
        let prompt = match step {
            Step::Name | Step::Age => "> ".to_string(),
            Step::Gender => format!(
                "[1] {}  [2] {}\n> ",
                language.gender_label(Gender::Male),
                language.gender_label(Gender::Female)
            ),
            Step::Interests => format!(
                "({}; comma separated)\n> ",
                language.interest_suggestions().join(", ")
            ),
            Step::Photos => "(image paths, comma separated; empty to skip)\n> ".to_string(),
            Step::Budget => format!(
                "(min max from {}; empty for {} - {})\n> ",
                BUDGET_SCALE.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", "),
                format_price(conversation.profile().budget_min),
                format_price(conversation.profile().budget_max),
            ),
            Step::Results => "[more] more ideas  [reset] start over  [quit] exit\n> ".to_string(),
            Step::Greeting | Step::Generating => {
                anyhow::bail!("terminal chat reached unexpected step {}", step)
            }
        };

        let Some(answer) = term.ask(&prompt).await? else { break };
        if answer.eq_ignore_ascii_case("quit") || answer.eq_ignore_ascii_case("exit") {
            break;
        }
        if answer.eq_ignore_ascii_case("reset") {
            conversation.reset()?;
            term.printed = 0;
            continue;
        }

        let outcome = match step {
            Step::Name | Step::Age => conversation.apply(Input::Text(answer)),
            Step::Gender => match parse_gender(&answer) {
                Some(gender) => conversation.apply(Input::SelectGender(gender)),
                None => continue,
            },
            Step::Interests => {
                for tag in answer.split(',').filter(|tag| !tag.trim().is_empty()) {
                    conversation.apply(Input::AddInterest(tag.to_string()))?;
                }
                conversation.apply(Input::ContinueInterests)
            }
            Step::Photos => {
                if !answer.is_empty() {
                    let files = match read_photos(&answer).await {
                        Ok(files) => files,
                        Err(e) => {
                            term.say(&format!("{:#}", e)).await?;
                            continue;
                        }
                    };
                    conversation.apply(Input::UploadStarted)?;
                    let uploaded = upload_all(services.photos, &files).await.map_err(|e| e.to_string());
                    let failure = uploaded.as_ref().err().cloned();
                    conversation.apply(Input::UploadFinished(uploaded))?;
                    // A failed batch adds nothing; ask for the photos again.
                    if let Some(reason) = failure {
                        term.say(&reason).await?;
                        continue;
                    }
                }
                conversation.apply(Input::ContinuePhotos)
            }
            Step::Budget => {
                if let Some((min, max)) = parse_budget(&answer) {
                    conversation.apply(Input::SetBudgetMin(min))?;
                    conversation.apply(Input::SetBudgetMax(max))?;
                } else if !answer.is_empty() {
                    continue;
                }
                conversation.apply(Input::FindGifts)
            }
            Step::Results if answer.eq_ignore_ascii_case("more") => conversation.apply(Input::MoreIdeas),
            Step::Results => continue,
            Step::Greeting | Step::Generating => unreachable!("rejected above"),
        };

        match outcome {
            Ok(Outcome::Generate(request)) => {
                run_generation(&mut term, &mut conversation, &services, request).await?;
            }
            Ok(_) => {}
            Err(ConversationError::EmptyInput) | Err(ConversationError::NoInterests) => {}
            Err(e) => return Err(e).context("Conversation rejected input"),
        }
    }

    info!("Terminal gift chat finished.");
    Ok(())
}
