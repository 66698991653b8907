use axum::{
    Json, Router, debug_handler,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{NotificationKind, TicketStatus};
use crate::notifications::notify;
use crate::store::Store;
use crate::{AppResult, AppState, reject};

/// Administrator surface. Role is enforced once by the `require_admin` guard
/// at the routing boundary; handlers here assume it.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/tickets", get(list_tickets))
        .route("/tickets/{id}/reply", post(reply_ticket))
        .route("/conferences", get(list_conferences))
        .route("/conferences/{id}", delete(remove_conference))
}

#[debug_handler]
pub(crate) async fn list_users(State(state): State<AppState>) -> AppResult<Response> {
    Ok(Json(state.store.list_accounts().await?).into_response())
}

#[debug_handler]
pub(crate) async fn list_tickets(State(state): State<AppState>) -> AppResult<Response> {
    Ok(Json(state.store.tickets().await?).into_response())
}

#[derive(Debug, Deserialize)]
pub(crate) struct TicketReply {
    reply: String,
}

/// Replying closes the ticket and tells its owner. Closed tickets reject
/// further replies; nothing reopens them.
#[debug_handler]
pub(crate) async fn reply_ticket(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(form): Json<TicketReply>,
) -> AppResult<Response> {
    if form.reply.trim().is_empty() {
        return Ok(reject(StatusCode::UNPROCESSABLE_ENTITY, "reply is required"));
    }
    let Some(ticket) = state.store.ticket_by_id(id).await? else {
        return Ok(reject(StatusCode::NOT_FOUND, "no such ticket"));
    };
    if ticket.status == TicketStatus::Closed {
        return Ok(reject(StatusCode::CONFLICT, "ticket is already closed"));
    }

    let closed = state.store.close_ticket(id, form.reply.trim()).await?;
    notify(
        state.store.as_ref(),
        closed.owner_id,
        format!("Your ticket \"{}\" received an admin reply.", closed.title),
        NotificationKind::Info,
    )
    .await;
    Ok(Json(closed).into_response())
}

#[debug_handler]
pub(crate) async fn list_conferences(State(state): State<AppState>) -> AppResult<Response> {
    Ok(Json(state.store.conferences().await?).into_response())
}

#[debug_handler]
pub(crate) async fn remove_conference(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    state.store.delete_conference(id).await?;
    state.chats.drop_room(id);
    Ok(StatusCode::NO_CONTENT.into_response())
}
