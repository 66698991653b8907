pub mod countdown;

use axum::{
    Json, Router, debug_handler,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{delete, get},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tower_sessions::Session;
use uuid::Uuid;

use crate::models::{NotificationKind, ScheduleEntry, WeekDay};
use crate::notifications::notify;
use crate::session::session_account;
use crate::store::Store;
use crate::{AppResult, AppState, reject};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/schedule", get(list_entries).post(add_entry))
        .route("/schedule/{id}", delete(remove_entry))
}

#[derive(Debug, Deserialize)]
pub(crate) struct NewEntry {
    title: String,
    description: Option<String>,
    instructor: Option<String>,
    room: Option<String>,
    groups: Option<String>,
    day: WeekDay,
    hour: u8,
    duration: Option<f32>,
    #[serde(default)]
    category: String,
    #[serde(default)]
    notification: bool,
}

#[debug_handler]
pub(crate) async fn list_entries(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Response> {
    let Some(account) = session_account(&session, state.store.as_ref()).await? else {
        return Ok(Redirect::to("/login").into_response());
    };
    let entries = state.store.entries_for(account.id).await?;
    Ok(Json(entries).into_response())
}

#[debug_handler]
pub(crate) async fn add_entry(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<NewEntry>,
) -> AppResult<Response> {
    let Some(account) = session_account(&session, state.store.as_ref()).await? else {
        return Ok(Redirect::to("/login").into_response());
    };
    if form.title.trim().is_empty() {
        return Ok(reject(StatusCode::UNPROCESSABLE_ENTITY, "title is required"));
    }
    if form.hour > 23 {
        return Ok(reject(
            StatusCode::UNPROCESSABLE_ENTITY,
            "hour must be 0..=23",
        ));
    }

    let entry = ScheduleEntry {
        id: Uuid::now_v7(),
        owner_id: account.id,
        title: form.title.trim().to_owned(),
        description: form.description,
        instructor: form.instructor,
        room: form.room,
        groups: form.groups,
        day: form.day,
        hour: form.hour,
        duration: form.duration,
        category: form.category,
        notification: form.notification,
    };
    if let Err(err) = state.store.insert_entry(&entry).await {
        notify(
            state.store.as_ref(),
            account.id,
            format!("Could not save event: {err}"),
            NotificationKind::Alert,
        )
        .await;
        return Err(err.into());
    }
    notify(
        state.store.as_ref(),
        account.id,
        format!("New event: {}", entry.title),
        NotificationKind::Info,
    )
    .await;
    Ok((StatusCode::CREATED, Json(entry)).into_response())
}

#[debug_handler]
pub(crate) async fn remove_entry(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let Some(account) = session_account(&session, state.store.as_ref()).await? else {
        return Ok(Redirect::to("/login").into_response());
    };
    state.store.delete_entry(account.id, id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[derive(Debug, Serialize)]
struct NextEvent {
    id: Uuid,
    title: String,
    at: String,
    in_text: String,
}

#[derive(Debug, Serialize)]
struct DashboardSummary {
    events: usize,
    notes: usize,
    next_event: Option<NextEvent>,
}

/// Counts plus the next-occurrence countdown, computed on demand; callers
/// poll (the original refreshed once a minute).
#[debug_handler]
pub(crate) async fn dashboard(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Response> {
    let Some(account) = session_account(&session, state.store.as_ref()).await? else {
        return Ok(Redirect::to("/login").into_response());
    };
    let entries = state.store.entries_for(account.id).await?;
    let notes = state.store.notes_for(account.id).await?;

    let next_event = countdown::next_event(OffsetDateTime::now_utc(), &entries).map(|c| NextEvent {
        id: c.entry_id,
        title: c.title.clone(),
        at: c
            .at
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default(),
        in_text: c.human(),
    });

    Ok(Json(DashboardSummary {
        events: entries.len(),
        notes: notes.len(),
        next_event,
    })
    .into_response())
}
