use axum::{
    Router,
    routing::{get, post, delete},
    response::IntoResponse,
    http::StatusCode,
    extract::{Path, Query, State, Multipart},
    Json,
};
use crate::models::{CreateSessionResponse, EventsQuery, ParseRequest, SessionMeta, StoredEvent};
use crate::storage::{SessionStorage, StorageError, ingest_summary};
use event_parser::{
    validate_messages, MessageFilter, MessageParser, ParseOptions, ParseOutcome, ReaderRegistry,
};
use std::io::Cursor;
use std::sync::Arc;
use tracing::{info, debug, error, instrument};

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<SessionStorage>,
    pub parser: MessageParser,
}

pub fn create_routes(storage: SessionStorage) -> Router {
    let state = AppState {
        storage: Arc::new(storage),
        parser: MessageParser::new(),
    };

    Router::new()
        .route("/health", get(health_check))
        .route("/events/parse", post(parse_event))
        .route("/sessions", post(create_session))
        .route("/sessions/:id", delete(delete_session))
        .route("/sessions/:id/meta", get(get_meta))
        .route("/sessions/:id/events", get(list_events))
        .route("/sessions/:id/events/:row", get(get_event))
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

fn not_found(e: StorageError) -> (StatusCode, String) {
    match e {
        StorageError::InvalidSession(_) => (StatusCode::NOT_FOUND, e.to_string()),
        StorageError::Io(ref io) if io.kind() == std::io::ErrorKind::NotFound => {
            (StatusCode::NOT_FOUND, format!("Session not found: {}", e))
        }
        _ => {
            error!("Storage failure: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

#[instrument(skip(state, request))]
async fn parse_event(
    State(state): State<AppState>,
    Json(request): Json<ParseRequest>,
) -> Json<ParseOutcome> {
    let outcome = state.parser.parse_message(&request.message, &request.options);
    state.parser.write_logs(&outcome.diagnostics);
    Json(outcome)
}

fn json_field<T: serde::de::DeserializeOwned>(name: &str, text: &str) -> Result<T, (StatusCode, String)> {
    serde_json::from_str(text).map_err(|e| {
        error!("Invalid '{}' field: {}", name, e);
        (StatusCode::BAD_REQUEST, format!("Invalid '{}' field: {}", name, e))
    })
}

#[instrument(skip(state, multipart))]
async fn create_session(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<CreateSessionResponse>, (StatusCode, String)> {
    info!("Received capture upload request");

    let mut file_data = Vec::new();
    let mut filename = String::new();
    let mut options = ParseOptions::default();
    let mut filter = MessageFilter::default();

    while let Some(field) = multipart.next_field().await
        .map_err(|e| {
            error!("Multipart error: {}", e);
            (StatusCode::BAD_REQUEST, format!("Multipart error: {}", e))
        })?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                filename = field.file_name().unwrap_or("unknown").to_string();
                let data = field.bytes().await
                    .map_err(|e| {
                        error!("Failed to read capture data: {}", e);
                        (StatusCode::BAD_REQUEST, format!("Failed to read file: {}", e))
                    })?;
                file_data = data.to_vec();
                info!("Capture '{}' received: {} bytes", filename, file_data.len());
            }
            "options" | "filter" => {
                let text = field.text().await
                    .map_err(|e| (StatusCode::BAD_REQUEST, format!("Failed to read '{}': {}", name, e)))?;
                if name == "options" {
                    options = json_field(&name, &text)?;
                } else {
                    filter = json_field(&name, &text)?;
                }
            }
            other => debug!("Ignoring multipart field '{}'", other),
        }
    }

    if file_data.is_empty() {
        error!("No capture provided in request");
        return Err((StatusCode::BAD_REQUEST, "No file provided".to_string()));
    }

    let registry = ReaderRegistry::new();
    let messages = registry.read_with_hint(Box::new(Cursor::new(file_data)), &filename)
        .map_err(|e| {
            error!("Failed to read capture '{}': {}", filename, e);
            (StatusCode::BAD_REQUEST, format!("Capture error: {}", e))
        })?;
    info!("Read {} messages from '{}'", messages.len(), filename);

    let summary = validate_messages(&state.parser, messages, &options, &filter);

    let session_id = state.storage.create_session()
        .map_err(|e| {
            error!("Failed to create session: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to create session: {}", e))
        })?;

    let meta = ingest_summary(&state.storage, &session_id, &filename, &summary)
        .map_err(|e| {
            error!("Ingest failed for session {}: {}", session_id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Ingest failed: {}", e))
        })?;

    info!("Session {} created: {}", session_id, meta.report);
    Ok(Json(CreateSessionResponse { session_id, meta }))
}

async fn get_meta(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionMeta>, (StatusCode, String)> {
    let meta = state.storage.read_meta(&session_id).map_err(not_found)?;
    Ok(Json(meta))
}

#[instrument(skip(state))]
async fn list_events(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<Vec<StoredEvent>>, (StatusCode, String)> {
    let events = state.storage.read_events(&session_id).map_err(not_found)?;
    let total = events.len();

    let events: Vec<StoredEvent> = events.into_iter()
        .filter(|event| query.matches(&event.outcome))
        .collect();
    debug!("Returning {} of {} events", events.len(), total);

    Ok(Json(events))
}

async fn get_event(
    State(state): State<AppState>,
    Path((session_id, row)): Path<(String, u32)>,
) -> Result<Json<ParseOutcome>, (StatusCode, String)> {
    let outcome = state.storage.read_outcome(&session_id, row).map_err(not_found)?;
    Ok(Json(outcome))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    state.storage.delete_session(&session_id).map_err(not_found)?;
    Ok(StatusCode::NO_CONTENT)
}
