use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::Role;
use crate::session::{USER_ID, session_account};
use crate::store::Store;

/// Routing-boundary gate for authenticated routes: no session account means a
/// redirect to the login page, never an error.
pub async fn require_user(session: Session, request: Request, next: Next) -> Response {
    match session.get::<String>(USER_ID).await {
        Ok(Some(_)) => next.run(request).await,
        _ => Redirect::to("/login").into_response(),
    }
}

/// Routing-boundary gate for the admin subtree. Role is checked here once;
/// admin handlers carry no per-handler role branching.
pub async fn require_admin(
    State(store): State<Arc<dyn Store>>,
    session: Session,
    request: Request,
    next: Next,
) -> Response {
    match session_account(&session, store.as_ref()).await {
        Ok(Some(account)) if account.role == Role::Admin => next.run(request).await,
        Ok(Some(_)) => Redirect::to("/dashboard").into_response(),
        _ => Redirect::to("/login").into_response(),
    }
}
