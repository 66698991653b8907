use axum::{debug_handler, response::Redirect};
use tower_sessions::Session;

use crate::AppResult;

/// Clears the whole session, conference authorizations included.
#[debug_handler]
pub async fn logout(session: Session) -> AppResult<Redirect> {
    session.clear().await;
    Ok(Redirect::to("/login"))
}
