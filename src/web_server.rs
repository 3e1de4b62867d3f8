use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        DefaultBodyLimit, Multipart, Path, State,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    serve, Json, Router,
};
use minijinja::{path_loader, Environment};
use minijinja_autoreload::AutoReloader;
use serde::Deserialize;
use thiserror::Error;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::conversation::{ConversationError, GenerationRequest, Input, Outcome};
use crate::generation::{GiftClient, GiftGenerator};
use crate::locale::Language;
use crate::presentation::{SaveStatus, SessionSnapshot};
use crate::profile::Gender;
use crate::session::{SessionRegistry, SharedSession};
use crate::store::{GiftSearchRecord, GiftSearchStore, HttpRecordStore, LogStore};
use crate::uploads::{discard_all, upload_all, LocalPhotoStore, PhotoFile, PhotoStore};

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Actions the browser may send. Upload progress is reported by the photo
/// endpoint, not through here.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", content = "value", rename_all = "snake_case")]
pub enum ClientAction {
    Text(String),
    SelectGender(Gender),
    AddInterest(String),
    RemoveInterest(String),
    ContinueInterests,
    RemovePhoto(usize),
    ContinuePhotos,
    SetBudgetMin(u32),
    SetBudgetMax(u32),
    FindGifts,
    MoreIdeas,
}

impl From<ClientAction> for Input {
    fn from(action: ClientAction) -> Self {
        match action {
            ClientAction::Text(text) => Input::Text(text),
            ClientAction::SelectGender(gender) => Input::SelectGender(gender),
            ClientAction::AddInterest(tag) => Input::AddInterest(tag),
            ClientAction::RemoveInterest(tag) => Input::RemoveInterest(tag),
            ClientAction::ContinueInterests => Input::ContinueInterests,
            ClientAction::RemovePhoto(index) => Input::RemovePhoto(index),
            ClientAction::ContinuePhotos => Input::ContinuePhotos,
            ClientAction::SetBudgetMin(value) => Input::SetBudgetMin(value),
            ClientAction::SetBudgetMax(value) => Input::SetBudgetMax(value),
            ClientAction::FindGifts => Input::FindGifts,
            ClientAction::MoreIdeas => Input::MoreIdeas,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct NewSession {
    pub language: Option<Language>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("session {0} not found")]
    SessionNotFound(Uuid),
    #[error(transparent)]
    Conversation(#[from] ConversationError),
    #[error("invalid upload: {0}")]
    BadUpload(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadUpload(_) => StatusCode::BAD_REQUEST,
            ApiError::Conversation(e) => match e {
                ConversationError::EmptyInput
                | ConversationError::NoInterests
                | ConversationError::NoSuchPhoto(_) => StatusCode::UNPROCESSABLE_ENTITY,
                ConversationError::StillTyping(_) => StatusCode::TOO_MANY_REQUESTS,
                ConversationError::UnexpectedInput { .. }
                | ConversationError::UploadsPending(_)
                | ConversationError::StaleGeneration { .. } => StatusCode::CONFLICT,
            },
        };
        let retry_after_ms = match &self {
            ApiError::Conversation(ConversationError::StillTyping(remaining)) => Some(remaining.as_millis() as u64),
            _ => None,
        };
        let body = serde_json::json!({ "error": self.to_string(), "retry_after_ms": retry_after_ms });
        (status, Json(body)).into_response()
    }
}

// Shared application state
#[derive(Clone)]
pub struct AppState {
    templates: Arc<AutoReloader>,
    sessions: Arc<SessionRegistry>,
    generator: Arc<dyn GiftGenerator>,
    store: Arc<dyn GiftSearchStore>,
    photos: Arc<dyn PhotoStore>,
    config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        generator: Arc<dyn GiftGenerator>,
        store: Arc<dyn GiftSearchStore>,
        photos: Arc<dyn PhotoStore>,
    ) -> Self {
        Self {
            templates: Arc::new(create_minijinja_env(config.templates_dir.clone())),
            sessions: Arc::new(SessionRegistry::new(config.language, config.pacing)),
            generator,
            store,
            photos,
            config: Arc::new(config),
        }
    }

    /// Wires the real inference client, record store and upload directory.
    pub fn from_config(config: AppConfig) -> Self {
        let generator: Arc<dyn GiftGenerator> = Arc::new(GiftClient::from_config(&config));
        let store: Arc<dyn GiftSearchStore> = match &config.store_url {
            Some(url) => Arc::new(HttpRecordStore::new(url.clone())),
            None => Arc::new(LogStore),
        };
        let photos: Arc<dyn PhotoStore> = Arc::new(LocalPhotoStore::new(config.upload_dir.clone(), "/uploads"));
        Self::new(config, generator, store, photos)
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }
}

// Minijinja Environment setup
fn create_minijinja_env(templates_dir: PathBuf) -> AutoReloader {
    AutoReloader::new(move |notifier| {
        let mut env = Environment::new();
        env.set_loader(path_loader(templates_dir.clone()));
        notifier.watch_path(&templates_dir, true);
        Ok(env)
    })
}

async fn index_handler(State(state): State<AppState>) -> Result<Html<String>, Html<String>> {
    state
        .templates
        .acquire_env()
        .and_then(|env| {
            env.get_template("index.html").and_then(|tmpl| {
                let language = state.config.language;
                tmpl.render(minijinja::context! {
                    title => "Idea4Gift",
                    language => language.code(),
                    find_yourself => language.find_yourself(),
                })
            })
        })
        .map(Html)
        .map_err(|e| {
            error!("Failed to get or render template: {}", e);
            Html(format!("Internal Server Error: {}", e))
        })
}

async fn lookup(state: &AppState, id: Uuid) -> Result<SharedSession, ApiError> {
    state.sessions.get(id).await.ok_or(ApiError::SessionNotFound(id))
}

async fn create_session_handler(
    State(state): State<AppState>,
    body: Option<Json<NewSession>>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let language = body.and_then(|Json(new)| new.language);
    let session = state.sessions.create(language).await?;
    let snapshot = session.lock().await.snapshot();
    Ok(Json(snapshot))
}

async fn get_session_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let session = lookup(&state, id).await?;
    let snapshot = session.lock().await.snapshot();
    Ok(Json(snapshot))
}

async fn action_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(action): Json<ClientAction>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let session = lookup(&state, id).await?;
    let mut guard = session.lock().await;
    if let Outcome::Generate(request) = guard.conversation.apply(action.into())? {
        guard.save_status = SaveStatus::Idle;
        spawn_generation(state.clone(), session.clone(), request);
    }
    Ok(Json(guard.publish()))
}

async fn reset_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let session = lookup(&state, id).await?;
    let mut guard = session.lock().await;
    guard.reset()?;
    Ok(Json(guard.publish()))
}

async fn theme_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let session = lookup(&state, id).await?;
    let mut guard = session.lock().await;
    guard.toggle_theme();
    Ok(Json(guard.publish()))
}

async fn read_photo_fields(multipart: &mut Multipart) -> Result<Vec<PhotoFile>, ApiError> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadUpload(e.to_string()))?
    {
        let filename = field.file_name().unwrap_or("photo").to_string();
        let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();
        let bytes = field.bytes().await.map_err(|e| ApiError::BadUpload(e.to_string()))?;
        files.push(PhotoFile { filename, content_type, bytes: bytes.to_vec() });
    }
    if files.is_empty() {
        return Err(ApiError::BadUpload("no files in request".to_string()));
    }
    Ok(files)
}

async fn photos_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let session = lookup(&state, id).await?;

    // Mark the batch before the body is read so "continue" stays blocked
    // while a large upload is still streaming in.
    {
        let mut guard = session.lock().await;
        guard.conversation.apply(Input::UploadStarted)?;
        guard.publish();
    }

    // The session stays unlocked while the body is read and the files are written.
    let files = match read_photo_fields(&mut multipart).await {
        Ok(files) => files,
        Err(e) => {
            let mut guard = session.lock().await;
            if let Err(finish_err) = guard.conversation.apply(Input::UploadFinished(Err(e.to_string()))) {
                debug!(session = %id, error = %finish_err, "Upload mark already cleared");
            }
            guard.publish();
            return Err(e);
        }
    };
    let result = upload_all(state.photos.as_ref(), &files).await.map_err(|e| e.to_string());
    let stored = result.as_ref().ok().cloned();

    let mut guard = session.lock().await;
    match guard.conversation.apply(Input::UploadFinished(result)) {
        Ok(_) => Ok(Json(guard.publish())),
        Err(e) => {
            drop(guard);
            if let Some(urls) = stored {
                warn!(session = %id, files = urls.len(), "Conversation moved on during upload, discarding photos");
                discard_all(state.photos.as_ref(), &urls).await;
            }
            Err(e.into())
        }
    }
}

/// Runs one generation request off the session lock, merges the result, then
/// performs the best-effort record write.
fn spawn_generation(state: AppState, session: SharedSession, request: GenerationRequest) {
    tokio::spawn(async move {
        let result = state.generator.generate(&request.profile, request.language).await;
        let offers = result.as_ref().ok().cloned();

        {
            let mut guard = session.lock().await;
            if let Err(e) = guard.conversation.finish_generation(request.ticket, result) {
                warn!(session = %guard.id, error = %e, "Discarding generation result");
                return;
            }
            if offers.is_some() {
                guard.save_status = SaveStatus::Pending;
            }
            guard.publish();
        }

        let Some(offers) = offers else { return };
        let record = GiftSearchRecord::new(&request.profile, request.language, offers);
        let status = match state.store.save(&record).await {
            Ok(()) => SaveStatus::Saved,
            Err(e) => {
                warn!(error = %e, "Failed to save gift search; offers are kept");
                SaveStatus::Failed
            }
        };

        let mut guard = session.lock().await;
        if guard.finish_save(request.ticket, status) {
            guard.publish();
        }
    });
}

// WebSocket upgrade handler
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let session = lookup(&state, id).await?;
    info!(session = %id, "WebSocket connection upgrade requested");
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, session)))
}

// Streams snapshots of one session to one client.
async fn handle_socket(mut socket: WebSocket, session: SharedSession) {
    let (mut updates, initial) = {
        let guard = session.lock().await;
        (guard.subscribe(), guard.snapshot())
    };

    if let Ok(json_msg) = serde_json::to_string(&initial) {
        if socket.send(Message::Text(json_msg)).await.is_err() {
            warn!("Failed to send initial snapshot to new WebSocket client");
            return;
        }
    }

    loop {
        tokio::select! {
            update = updates.recv() => {
                match update {
                    Ok(snapshot) => {
                        let Ok(json_msg) = serde_json::to_string(&snapshot) else {
                            error!("Failed to serialize session snapshot");
                            continue;
                        };
                        if socket.send(Message::Text(json_msg)).await.is_err() {
                            warn!("WebSocket client disconnected or send error. Closing connection.");
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "WebSocket client lagged behind session updates");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }

            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => {
                        info!("WebSocket client disconnected");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("WebSocket receive error: {}", e);
                        break;
                    }
                }
            }
        }
    }
    info!("WebSocket connection closed");
}

pub fn build_router(state: AppState) -> Router {
    let static_files_service = ServeDir::new(&state.config.static_dir).not_found_service(tower::service_fn(
        |_req: axum::extract::Request| async {
            let mut response = hyper::Response::new(axum::body::Body::from("Not Found"));
            *response.status_mut() = hyper::StatusCode::NOT_FOUND;
            Ok::<_, std::convert::Infallible>(response)
        },
    ));
    let uploads_service = ServeDir::new(&state.config.upload_dir);

    Router::new()
        .route("/", get(index_handler))
        .route("/api/sessions", post(create_session_handler))
        .route("/api/sessions/:id", get(get_session_handler))
        .route("/api/sessions/:id/actions", post(action_handler))
        .route("/api/sessions/:id/reset", post(reset_handler))
        .route("/api/sessions/:id/theme", post(theme_handler))
        .route(
            "/api/sessions/:id/photos",
            post(photos_handler).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/sessions/:id/ws", get(ws_handler))
        .nest_service("/static", static_files_service)
        .nest_service("/uploads", uploads_service)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn start_web_server(config: AppConfig, port: u16) -> Result<()> {
    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("Failed to create upload directory {}", config.upload_dir.display()))?;

    let app = build_router(AppState::from_config(config));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Web server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind to address {}", addr))?;

    serve(listener, app.into_make_service())
        .await
        .context("Web server failed")?;

    Ok(())
}
