use axum::{
    Json, Router, debug_handler,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::models::SupportTicket;
use crate::session::session_account;
use crate::store::Store;
use crate::{AppResult, AppState, reject};

pub fn router() -> Router<AppState> {
    Router::new().route("/support", get(list_own_tickets).post(open_ticket))
}

#[derive(Debug, Deserialize)]
pub(crate) struct NewTicket {
    title: String,
    description: String,
}

#[debug_handler]
pub(crate) async fn list_own_tickets(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Response> {
    let Some(account) = session_account(&session, state.store.as_ref()).await? else {
        return Ok(Redirect::to("/login").into_response());
    };
    let tickets = state.store.tickets_for(account.id).await?;
    Ok(Json(tickets).into_response())
}

#[debug_handler]
pub(crate) async fn open_ticket(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<NewTicket>,
) -> AppResult<Response> {
    let Some(account) = session_account(&session, state.store.as_ref()).await? else {
        return Ok(Redirect::to("/login").into_response());
    };
    if form.title.trim().is_empty() || form.description.trim().is_empty() {
        return Ok(reject(
            StatusCode::UNPROCESSABLE_ENTITY,
            "title and description are required",
        ));
    }
    let ticket = SupportTicket::new(
        account.id,
        account.username.clone(),
        form.title.trim().to_owned(),
        form.description,
    );
    state.store.insert_ticket(&ticket).await?;
    tracing::info!(ticket = %ticket.id, "support ticket opened");
    Ok((StatusCode::CREATED, Json(ticket)).into_response())
}
