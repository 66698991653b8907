use axum::{
    Json, debug_handler,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::store::Store;
use crate::{AppResult, AppState, reject, session::USER_ID};

use super::verify_password;

#[derive(Debug, Deserialize)]
pub(crate) struct LoginForm {
    /// Username or email address.
    pub(crate) identifier: String,
    pub(crate) password: String,
}

#[debug_handler]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<LoginForm>,
) -> AppResult<Response> {
    let Some(account) = state
        .store
        .account_by_identifier(form.identifier.trim())
        .await?
    else {
        return Ok(reject(StatusCode::UNAUTHORIZED, "invalid credentials"));
    };

    if !verify_password(&form.password, &account.password_hash) {
        return Ok(reject(StatusCode::UNAUTHORIZED, "invalid credentials"));
    }

    session.insert(USER_ID, account.id.to_string()).await?;
    tracing::info!(username = %account.username, "signed in");
    Ok(Json(account).into_response())
}
