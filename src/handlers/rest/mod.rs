use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_macros::debug_handler;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use std::sync::Arc;

use crate::{
    dto::{CreateNoteRequest, CreateNoteResponse, NoteResponse},
    service::NoteService,
};

#[derive(OpenApi)]
#[openapi(
    paths(create_note, list_notes),
    components(schemas(CreateNoteRequest, CreateNoteResponse, NoteResponse)),
    tags(
        (name = "notes", description = "Notes API")
    )
)]
pub struct ApiDoc;

pub fn router(service: Arc<NoteService>) -> Router {
    Router::new()
        .route(
            "/insert",
            post(create_note).layer(DefaultBodyLimit::disable()),
        )
        .route("/select", get(list_notes))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .with_state(service)
        .layer(TraceLayer::new_for_http())
}

#[utoipa::path(
    post,
    path = "/insert",
    request_body = CreateNoteRequest,
    responses(
        (status = 201, description = "Note created successfully", body = CreateNoteResponse),
        (status = 400, description = "Malformed request body"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn create_note(
    State(service): State<Arc<NoteService>>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Response {
    let payload = match payload {
        Ok(Json(value)) => match CreateNoteRequest::from_json(value) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("rejected note payload: {}", e);
                return (StatusCode::BAD_REQUEST, "Bad request").into_response();
            }
        },
        Err(e) => {
            tracing::warn!("rejected note payload: {}", e.body_text());
            return (StatusCode::BAD_REQUEST, "Bad request").into_response();
        }
    };

    match service.create_note(payload).await {
        Ok(note) => (StatusCode::CREATED, Json(note)).into_response(),
        Err(e) => {
            tracing::error!("failed to create note entry: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/select",
    responses(
        (status = 200, description = "List of all notes", body = Vec<NoteResponse>),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn list_notes(State(service): State<Arc<NoteService>>) -> Response {
    match service.list_notes().await {
        Ok(notes) => (StatusCode::OK, Json(notes)).into_response(),
        Err(e) => {
            tracing::error!("failed to get note entries: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}
