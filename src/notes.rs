use axum::{
    Json, Router, debug_handler,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{delete, get},
};
use serde::Deserialize;
use tower_sessions::Session;
use uuid::Uuid;

use crate::models::Note;
use crate::session::session_account;
use crate::store::Store;
use crate::{AppResult, AppState, reject};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/notes", get(list_notes).post(add_note))
        .route("/notes/{id}", delete(remove_note))
}

#[derive(Debug, Deserialize)]
pub(crate) struct NewNote {
    title: String,
    content: String,
}

#[debug_handler]
pub(crate) async fn list_notes(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Response> {
    let Some(account) = session_account(&session, state.store.as_ref()).await? else {
        return Ok(Redirect::to("/login").into_response());
    };
    let notes = state.store.notes_for(account.id).await?;
    Ok(Json(notes).into_response())
}

#[debug_handler]
pub(crate) async fn add_note(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<NewNote>,
) -> AppResult<Response> {
    let Some(account) = session_account(&session, state.store.as_ref()).await? else {
        return Ok(Redirect::to("/login").into_response());
    };
    if form.title.trim().is_empty() || form.content.trim().is_empty() {
        return Ok(reject(
            StatusCode::UNPROCESSABLE_ENTITY,
            "title and content are required",
        ));
    }
    let note = Note::new(account.id, form.title.trim().to_owned(), form.content);
    state.store.insert_note(&note).await?;
    Ok((StatusCode::CREATED, Json(note)).into_response())
}

#[debug_handler]
pub(crate) async fn remove_note(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let Some(account) = session_account(&session, state.store.as_ref()).await? else {
        return Ok(Redirect::to("/login").into_response());
    };
    state.store.delete_note(account.id, id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
