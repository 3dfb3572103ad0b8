//! Session API — one chat session per browser tab.
//!
//! Endpoints:
//!
//! - `GET    /api/topics`                       — Selectable topics
//! - `POST   /api/sessions`                     — Create a session
//! - `GET    /api/sessions/{id}`                — Transcript and attachments
//! - `DELETE /api/sessions/{id}`                — End a session
//! - `POST   /api/sessions/{id}/attachments`    — Upload one file (multipart)
//! - `POST   /api/sessions/{id}/chat`           — Run a turn, JSON reply
//! - `POST   /api/sessions/{id}/chat/stream`    — Run a turn, SSE reply
//! - `POST   /api/sessions/{id}/clear`          — Clear conversation
//! - `POST   /api/sessions/{id}/new-context`    — Drop attachments only
//! - `PUT    /api/sessions/{id}/topic`          — Select a topic
//!
//! Every session-scoped request `try_lock`s the session. While a turn is
//! running the session answers `409 Conflict` instead of queuing.

use axum::{
    Router,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Json,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, mpsc};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use filechat_agent::TurnOutcome;
use filechat_core::attachment::{ACCEPTED_EXTENSIONS, Attachment, is_accepted_upload};
use filechat_core::error::SessionError;
use filechat_core::message::Message;
use filechat_core::provider::Usage;
use filechat_core::session::SessionState;

use crate::{GatewayState, SessionSlot, SharedState};

/// Multipart field that carries the uploaded file.
const UPLOAD_FIELD: &str = "file";

/// Capacity of the per-turn SSE event channel.
const STREAM_BUFFER: usize = 64;

/// Build the session API router. Nest this under "/api" in the main router.
pub fn api_router(state: SharedState) -> Router {
    Router::new()
        .route("/topics", get(topics_handler))
        .route("/sessions", post(create_session_handler))
        .route(
            "/sessions/{id}",
            get(get_session_handler).delete(delete_session_handler),
        )
        .route("/sessions/{id}/attachments", post(upload_handler))
        .route("/sessions/{id}/chat", post(chat_handler))
        .route("/sessions/{id}/chat/stream", post(chat_stream_handler))
        .route("/sessions/{id}/clear", post(clear_handler))
        .route("/sessions/{id}/new-context", post(new_context_handler))
        .route("/sessions/{id}/topic", put(topic_handler))
        .with_state(state)
}

// ── DTOs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

#[derive(Debug, Serialize, Deserialize)]
pub struct TopicsResponse {
    pub topics: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageDto {
    pub role: String,
    pub content: String,
    pub images: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AttachmentDto {
    pub name: String,
    pub kind: String,
    pub size: usize,
    pub uploaded_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub id: String,
    pub topic: Option<String>,
    pub messages: Vec<MessageDto>,
    pub attachments: Vec<AttachmentDto>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
    /// `None` when the message was empty and nothing happened.
    pub reply: Option<String>,
    pub failed: bool,
    pub usage: Option<Usage>,
    pub message_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct TopicRequest {
    pub topic: Option<String>,
}

impl From<&Message> for MessageDto {
    fn from(m: &Message) -> Self {
        Self {
            role: m.role.as_str().to_string(),
            content: m.text(),
            images: m.content.image_count(),
        }
    }
}

impl From<&Attachment> for AttachmentDto {
    fn from(a: &Attachment) -> Self {
        Self {
            name: a.name.clone(),
            kind: if a.is_image() { "image" } else { "text" }.into(),
            size: a.payload_len(),
            uploaded_at: a.uploaded_at.to_rfc3339(),
        }
    }
}

impl From<&SessionState> for SessionResponse {
    fn from(s: &SessionState) -> Self {
        Self {
            id: s.id.to_string(),
            topic: s.topic.clone(),
            messages: s.messages.iter().map(MessageDto::from).collect(),
            attachments: s.attachments.iter().map(AttachmentDto::from).collect(),
            created_at: s.created_at.to_rfc3339(),
            updated_at: s.updated_at.to_rfc3339(),
        }
    }
}

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Map a session-level failure onto its HTTP status.
fn session_error(e: SessionError) -> ApiError {
    let status = match &e {
        SessionError::NotFound(_) => StatusCode::NOT_FOUND,
        SessionError::Busy(_) => StatusCode::CONFLICT,
        SessionError::UnsupportedUpload { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        SessionError::InvalidUpload(_) => StatusCode::BAD_REQUEST,
    };
    error(status, e.to_string())
}

// ── Session lookup ────────────────────────────────────────────────────────

async fn find_session(
    state: &GatewayState,
    id: &str,
) -> Result<Arc<Mutex<SessionState>>, ApiError> {
    state
        .sessions
        .read()
        .await
        .get(id)
        .map(|slot| slot.session.clone())
        .ok_or_else(|| session_error(SessionError::NotFound(id.to_string())))
}

fn try_lock<'a>(
    session: &'a Mutex<SessionState>,
    id: &str,
) -> Result<MutexGuard<'a, SessionState>, ApiError> {
    session.try_lock().map_err(|_| {
        debug!(session = %id, "Session busy, rejecting request");
        session_error(SessionError::Busy(id.to_string()))
    })
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn topics_handler(State(state): State<SharedState>) -> Json<TopicsResponse> {
    Json(TopicsResponse {
        topics: state.config.assistant.topics.clone(),
    })
}

async fn create_session_handler(
    State(state): State<SharedState>,
) -> (StatusCode, Json<SessionResponse>) {
    let session = SessionState::new();
    let id = session.id.to_string();
    let response = SessionResponse::from(&session);

    let mut sessions = state.sessions.write().await;

    // Evict oldest session if at capacity
    if sessions.len() >= state.config.gateway.max_sessions {
        if let Some(oldest_key) = sessions
            .iter()
            .min_by_key(|(_, slot)| slot.created_at)
            .map(|(k, _)| k.clone())
        {
            sessions.remove(&oldest_key);
            debug!(session = %oldest_key, "Evicted oldest session");
        }
    }

    sessions.insert(id.clone(), SessionSlot::new(session));
    info!(session = %id, active = sessions.len(), "Session created");

    (StatusCode::CREATED, Json(response))
}

async fn get_session_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = find_session(&state, &id).await?;
    let guard = try_lock(&session, &id)?;
    Ok(Json(SessionResponse::from(&*guard)))
}

async fn delete_session_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    match state.sessions.write().await.remove(&id) {
        Some(_) => {
            info!(session = %id, "Session ended");
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(session_error(SessionError::NotFound(id))),
    }
}

async fn upload_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<AttachmentDto>), ApiError> {
    let session = find_session(&state, &id).await?;

    let (name, bytes) = loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| error(e.status(), e.body_text()))?
            .ok_or_else(|| {
                session_error(SessionError::InvalidUpload(format!(
                    "missing '{UPLOAD_FIELD}' field"
                )))
            })?;

        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let name = field
            .file_name()
            .map(str::to_string)
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| {
                session_error(SessionError::InvalidUpload("missing file name".into()))
            })?;

        if !is_accepted_upload(&name) {
            warn!(session = %id, file = %name, "Rejected upload with unsupported type");
            return Err(session_error(SessionError::UnsupportedUpload {
                name,
                accepted: ACCEPTED_EXTENSIONS.join(", "),
            }));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| error(e.status(), e.body_text()))?;
        break (name, bytes);
    };

    let mut guard = try_lock(&session, &id)?;
    let attachment = guard.add_attachment(name, &bytes);
    info!(
        session = %id,
        file = %attachment.name,
        kind = ?attachment.kind,
        bytes = bytes.len(),
        "Attachment added"
    );

    Ok((StatusCode::CREATED, Json(AttachmentDto::from(attachment))))
}

/// `POST /api/sessions/{id}/chat` — run a turn, answer with the stored reply.
///
/// The turn runs in its own task holding the session lock, so a client that
/// disconnects mid-call still leaves a paired user/assistant transcript.
async fn chat_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let session = find_session(&state, &id).await?;
    let mut guard = session.try_lock_owned().map_err(|_| {
        debug!(session = %id, "Session busy, rejecting request");
        session_error(SessionError::Busy(id.clone()))
    })?;

    let runner = state.runner.clone();
    let turn = tokio::spawn(async move {
        let outcome = runner.run_turn(&mut guard, &payload.message).await;
        (outcome, guard.messages.len())
    });
    let (outcome, message_count) = turn.await.map_err(|e| {
        warn!(session = %id, error = %e, "Chat turn task failed");
        error(StatusCode::INTERNAL_SERVER_ERROR, format!("Chat turn failed: {e}"))
    })?;

    let usage = match &outcome {
        TurnOutcome::Replied { usage, .. } => usage.clone(),
        _ => None,
    };
    Ok(Json(ChatResponse {
        session_id: id,
        reply: outcome.reply().map(str::to_string),
        failed: outcome.is_failure(),
        usage,
        message_count,
    }))
}

/// `POST /api/sessions/{id}/chat/stream` — run a turn, stream `chunk`,
/// `error` and `done` events.
///
/// The session stays locked until the spawned turn has stored its reply,
/// even if the client disconnects first.
async fn chat_stream_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<ChatRequest>,
) -> Result<Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>>, ApiError> {
    let session = find_session(&state, &id).await?;
    let mut guard = session.try_lock_owned().map_err(|_| {
        debug!(session = %id, "Session busy, rejecting stream request");
        session_error(SessionError::Busy(id.clone()))
    })?;

    let (tx, rx) = mpsc::channel(STREAM_BUFFER);
    let runner = state.runner.clone();
    tokio::spawn(async move {
        runner
            .run_turn_stream(&mut guard, &payload.message, tx.clone())
            .await;
        // Unlock before the stream ends so the client can act on `done`.
        drop(guard);
        drop(tx);
    });

    let stream = ReceiverStream::new(rx).map(|event| {
        let event_type = event.event_type();
        let data = serde_json::to_string(&event).unwrap_or_default();
        Ok(SseEvent::default().event(event_type).data(data))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

async fn clear_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = find_session(&state, &id).await?;
    let mut guard = try_lock(&session, &id)?;
    guard.clear_conversation();
    info!(session = %id, "Conversation cleared");
    Ok(Json(SessionResponse::from(&*guard)))
}

async fn new_context_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = find_session(&state, &id).await?;
    let mut guard = try_lock(&session, &id)?;
    guard.clear_attachments_only();
    info!(session = %id, "Attachments cleared, transcript kept");
    Ok(Json(SessionResponse::from(&*guard)))
}

async fn topic_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<TopicRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let topic = payload
        .topic
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    if let Some(topic) = &topic {
        if !state.config.assistant.topics.iter().any(|t| t == topic) {
            return Err(error(
                StatusCode::BAD_REQUEST,
                format!(
                    "Unknown topic: '{topic}'. Use one of: {}",
                    state.config.assistant.topics.join(", ")
                ),
            ));
        }
    }

    let session = find_session(&state, &id).await?;
    let mut guard = try_lock(&session, &id)?;
    guard.set_topic(topic);
    info!(session = %id, topic = ?guard.topic, "Topic selected");
    Ok(Json(SessionResponse::from(&*guard)))
}
