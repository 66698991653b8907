use axum::{
    Json, Router, body::Bytes, debug_handler,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tower_sessions::Session;
use uuid::Uuid;

use crate::models::{NotificationKind, ProfileChanges};
use crate::notifications::notify;
use crate::session::session_account;
use crate::store::Store;
use crate::{AppResult, AppState, reject};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/profile",
            get(profile).patch(update_profile).delete(delete_account),
        )
        .route("/profile/avatar", post(upload_avatar))
}

#[debug_handler]
pub(crate) async fn profile(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Response> {
    let Some(account) = session_account(&session, state.store.as_ref()).await? else {
        return Ok(Redirect::to("/login").into_response());
    };
    Ok(Json(account).into_response())
}

#[debug_handler]
pub(crate) async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    Json(changes): Json<ProfileChanges>,
) -> AppResult<Response> {
    let Some(account) = session_account(&session, state.store.as_ref()).await? else {
        return Ok(Redirect::to("/login").into_response());
    };
    if let Some(username) = &changes.username {
        if username.trim().is_empty() {
            return Ok(reject(
                StatusCode::UNPROCESSABLE_ENTITY,
                "username cannot be empty",
            ));
        }
        // A rename must not collide with someone else's handle.
        if let Some(existing) = state.store.account_by_identifier(username.trim()).await? {
            if existing.id != account.id {
                return Ok(reject(StatusCode::CONFLICT, "username already taken"));
            }
        }
    }
    state.store.update_account(account.id, &changes).await?;
    let mut updated = account;
    updated.apply(&changes);
    Ok(Json(updated).into_response())
}

/// Raw image bytes in, public URL out. The bytes go to object storage; only
/// the URL lands on the account row.
#[debug_handler]
pub(crate) async fn upload_avatar(
    State(state): State<AppState>,
    session: Session,
    body: Bytes,
) -> AppResult<Response> {
    let Some(account) = session_account(&session, state.store.as_ref()).await? else {
        return Ok(Redirect::to("/login").into_response());
    };
    if body.is_empty() {
        return Ok(reject(StatusCode::UNPROCESSABLE_ENTITY, "empty upload"));
    }
    if body.len() > state.config.avatar_limit {
        notify(
            state.store.as_ref(),
            account.id,
            "Avatar too large.",
            NotificationKind::Alert,
        )
        .await;
        return Ok(reject(StatusCode::PAYLOAD_TOO_LARGE, "avatar too large"));
    }

    let name = format!("avatar-{}", Uuid::now_v7());
    let url = match state.store.put_object(&name, &body).await {
        Ok(url) => url,
        Err(err) => {
            notify(
                state.store.as_ref(),
                account.id,
                "Could not upload the avatar.",
                NotificationKind::Alert,
            )
            .await;
            return Err(err.into());
        }
    };
    let changes = ProfileChanges {
        avatar: Some(url.clone()),
        ..ProfileChanges::default()
    };
    state.store.update_account(account.id, &changes).await?;
    Ok(Json(serde_json::json!({ "avatar": url })).into_response())
}

#[debug_handler]
pub(crate) async fn delete_account(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Response> {
    let Some(account) = session_account(&session, state.store.as_ref()).await? else {
        return Ok(Redirect::to("/login").into_response());
    };
    state.store.delete_account(account.id).await?;
    session.clear().await;
    tracing::info!(username = %account.username, "account deleted");
    Ok(StatusCode::NO_CONTENT.into_response())
}
