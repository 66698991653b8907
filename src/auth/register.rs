use axum::{
    Json, debug_handler,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rand::seq::IndexedRandom;
use serde::Deserialize;
use tower_sessions::Session;
use uuid::Uuid;

use crate::models::{Account, Role, now_rfc3339};
use crate::store::Store;
use crate::{AppResult, AppState, reject, session::USER_ID};

use super::hash_password;

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterForm {
    pub(crate) username: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) email: String,
    #[serde(default)]
    pub(crate) phone: String,
    pub(crate) password: String,
    pub(crate) confirm_password: String,
    #[serde(default)]
    pub(crate) accept_terms: bool,
}

const AVATAR_COLORS: [&str; 8] = [
    "0D8ABC", "7C3AED", "DC2626", "059669", "D97706", "DB2777", "2563EB", "475569",
];

fn placeholder_avatar(first: &str, last: &str) -> String {
    let bg = AVATAR_COLORS.choose(&mut rand::rng()).unwrap();
    format!("https://ui-avatars.com/api/?name={first}+{last}&background={bg}&color=fff")
}

#[debug_handler]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<RegisterForm>,
) -> AppResult<Response> {
    for (field, value) in [
        ("username", &form.username),
        ("first_name", &form.first_name),
        ("last_name", &form.last_name),
        ("email", &form.email),
        ("password", &form.password),
    ] {
        if value.trim().is_empty() {
            return Ok(reject(
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("{field} is required"),
            ));
        }
    }
    if form.password != form.confirm_password {
        return Ok(reject(
            StatusCode::UNPROCESSABLE_ENTITY,
            "passwords do not match",
        ));
    }
    if !form.accept_terms {
        return Ok(reject(
            StatusCode::UNPROCESSABLE_ENTITY,
            "terms must be accepted",
        ));
    }
    if !form.email.contains('@') {
        return Ok(reject(StatusCode::UNPROCESSABLE_ENTITY, "invalid email"));
    }

    if state
        .store
        .account_by_identifier(form.username.trim())
        .await?
        .is_some()
        || state
            .store
            .account_by_identifier(form.email.trim())
            .await?
            .is_some()
    {
        return Ok(reject(
            StatusCode::CONFLICT,
            "username or email already taken",
        ));
    }

    let account = Account {
        id: Uuid::now_v7(),
        username: form.username.trim().to_owned(),
        first_name: form.first_name.trim().to_owned(),
        last_name: form.last_name.trim().to_owned(),
        email: form.email.trim().to_owned(),
        phone: form.phone.trim().to_owned(),
        // Signup never grants privileges.
        role: Role::User,
        avatar: Some(placeholder_avatar(
            form.first_name.trim(),
            form.last_name.trim(),
        )),
        password_hash: hash_password(&form.password)?,
        created_at: now_rfc3339(),
    };
    state.store.insert_account(&account).await?;
    session.insert(USER_ID, account.id.to_string()).await?;

    tracing::info!(username = %account.username, "account registered");
    Ok((StatusCode::CREATED, Json(account)).into_response())
}
