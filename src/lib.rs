pub mod admin;
pub mod auth;
pub mod conferences;
pub mod config;
pub mod guard;
pub mod models;
pub mod notes;
pub mod notifications;
pub mod profiles;
pub mod schedule;
pub mod session;
pub mod store;
pub mod tickets;

use std::sync::Arc;

use axum::{
    Json,
    extract::FromRef,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use crate::{conferences::chat::ChatRegistry, config::Config, store::Store};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Config,
    pub chats: ChatRegistry,
    pub http: reqwest::Client,
}

pub type AppResult<T> = Result<T, AppError>;
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{}\n\n{}", self.0, self.0.backtrace()),
        )
            .into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

/// A client-class rejection: the operation was refused before touching the
/// store, and the body says why.
pub fn reject(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

pub trait GetField {
    fn get_str_field(&self, field: &str) -> AppResult<String>;
}

impl GetField for Value {
    fn get_str_field(&self, field: &str) -> AppResult<String> {
        Ok(self
            .get(field)
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("expected string field `{field}` in {self}"))?
            .to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_str_field_reads_strings_and_rejects_the_rest() {
        let value: Value = serde_json::json!({ "text": "hi", "n": 3 });
        assert_eq!(value.get_str_field("text").unwrap(), "hi");
        assert!(value.get_str_field("n").is_err());
        assert!(value.get_str_field("missing").is_err());
    }
}
