use axum::{
    Json, Router, debug_handler,
    extract::State,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use tower_sessions::Session;
use uuid::Uuid;

use crate::models::{Notification, NotificationKind};
use crate::session::session_account;
use crate::store::Store;
use crate::{AppResult, AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/notifications", get(list_notifications))
}

/// Record a banner for `owner`. A banner must never break the operation that
/// produced it, so store failures are logged and swallowed here.
pub async fn notify(
    store: &dyn Store,
    owner: Uuid,
    message: impl Into<String>,
    kind: NotificationKind,
) {
    let notification = Notification::new(owner, message.into(), kind);
    if let Err(err) = store.insert_notification(&notification).await {
        tracing::warn!(%owner, "failed to record notification: {err:#}");
    }
}

#[debug_handler]
pub(crate) async fn list_notifications(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Response> {
    let Some(account) = session_account(&session, state.store.as_ref()).await? else {
        return Ok(Redirect::to("/login").into_response());
    };
    let list = state.store.notifications_for(account.id).await?;
    Ok(Json(list).into_response())
}
