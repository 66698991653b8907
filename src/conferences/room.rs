use axum::{
    Json, debug_handler,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use uuid::Uuid;

use crate::auth::verify_password;
use crate::models::NotificationKind;
use crate::notifications::notify;
use crate::session::{conference_key, session_account};
use crate::store::Store;
use crate::{AppResult, AppState, reject};

/// Authorized means the session holds the join flag for this room. The flag
/// only ever appears through a successful `join`.
pub(crate) async fn authorized(session: &Session, room_id: Uuid) -> AppResult<bool> {
    Ok(session
        .get::<bool>(&conference_key(room_id))
        .await?
        .unwrap_or(false))
}

#[derive(Debug, Deserialize)]
pub(crate) struct JoinForm {
    password: String,
}

/// Locked -> Authorized. The submitted password is verified against the
/// room's stored hash; there is no fallback value for rooms without one,
/// because such rooms cannot be created.
#[debug_handler]
pub(crate) async fn join(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(form): Json<JoinForm>,
) -> AppResult<Response> {
    let Some(account) = session_account(&session, state.store.as_ref()).await? else {
        return Ok(Redirect::to("/login").into_response());
    };
    let Some(room) = state.store.conference_by_id(id).await? else {
        return Ok(reject(StatusCode::NOT_FOUND, "no such conference"));
    };

    if !verify_password(&form.password, &room.password_hash) {
        notify(
            state.store.as_ref(),
            account.id,
            "Incorrect conference password.",
            NotificationKind::Alert,
        )
        .await;
        return Ok(reject(StatusCode::UNAUTHORIZED, "incorrect password"));
    }

    session.insert(&conference_key(id), true).await?;
    tracing::info!(room = %room.name, username = %account.username, "joined conference");
    Ok(Json(room).into_response())
}

/// Back to Locked for this session. The shared chat log stays with the room.
#[debug_handler]
pub(crate) async fn leave(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    if session_account(&session, state.store.as_ref()).await?.is_none() {
        return Ok(Redirect::to("/login").into_response());
    }
    session.remove::<bool>(&conference_key(id)).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::{MemoryStore as SessionStore, Session};

    use super::*;
    use crate::auth::hash_password;
    use crate::conferences::chat::ChatRegistry;
    use crate::config::Config;
    use crate::models::{Account, ConferenceRoom, Role, now_rfc3339};
    use crate::session::USER_ID;
    use crate::store::{MemoryStore, Store};

    async fn signed_in_state() -> (AppState, Session, Account) {
        let store = MemoryStore::new();
        let account = Account {
            id: Uuid::now_v7(),
            username: "JeanD".to_owned(),
            first_name: "Jean".to_owned(),
            last_name: "Dupont".to_owned(),
            email: "jean@example.com".to_owned(),
            phone: String::new(),
            role: Role::User,
            avatar: None,
            password_hash: "x".to_owned(),
            created_at: now_rfc3339(),
        };
        store.insert_account(&account).await.unwrap();
        let state = AppState {
            store: Arc::new(store),
            config: Config::default(),
            chats: ChatRegistry::default(),
            http: reqwest::Client::new(),
        };
        let session = Session::new(None, Arc::new(SessionStore::default()), None);
        session
            .insert(USER_ID, account.id.to_string())
            .await
            .unwrap();
        (state, session, account)
    }

    #[tokio::test]
    async fn wrong_password_stays_locked_with_one_alert() {
        let (state, session, account) = signed_in_state().await;
        let room = ConferenceRoom::new(
            Uuid::now_v7(),
            "algebra".into(),
            hash_password("open sesame").unwrap(),
        );
        state.store.insert_conference(&room).await.unwrap();

        let response = join(
            State(state.clone()),
            session.clone(),
            Path(room.id),
            Json(JoinForm {
                password: "admin".into(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(!authorized(&session, room.id).await.unwrap());
        let banners = state.store.notifications_for(account.id).await.unwrap();
        assert_eq!(banners.len(), 1);
        assert_eq!(banners[0].kind, NotificationKind::Alert);
    }

    #[tokio::test]
    async fn correct_password_authorizes_until_leave() {
        let (state, session, account) = signed_in_state().await;
        let room = ConferenceRoom::new(
            Uuid::now_v7(),
            "algebra".into(),
            hash_password("open sesame").unwrap(),
        );
        state.store.insert_conference(&room).await.unwrap();

        let response = join(
            State(state.clone()),
            session.clone(),
            Path(room.id),
            Json(JoinForm {
                password: "open sesame".into(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(authorized(&session, room.id).await.unwrap());
        assert!(
            state
                .store
                .notifications_for(account.id)
                .await
                .unwrap()
                .is_empty()
        );

        let response = leave(State(state.clone()), session.clone(), Path(room.id))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(!authorized(&session, room.id).await.unwrap());
    }
}
