pub mod assistant;
pub mod chat;
mod room;
mod ws;

use axum::{
    Json, Router, debug_handler,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{delete, get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use uuid::Uuid;

use crate::auth::hash_password;
use crate::models::{ConferenceRoom, NotificationKind, Role};
use crate::notifications::notify;
use crate::session::session_account;
use crate::store::Store;
use crate::{AppResult, AppState, reject};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/conferences", get(list_conferences).post(create_conference))
        .route("/conferences/{id}", delete(remove_conference))
        .route("/conference/{id}/join", post(room::join))
        .route("/conference/{id}/leave", post(room::leave))
        .route("/conference/{id}/chat", get(chat::chat_log).post(chat::post_message))
        .route("/conference/{id}/ws", get(ws::conference_ws))
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchQuery {
    search: Option<String>,
}

#[debug_handler]
pub(crate) async fn list_conferences(
    State(state): State<AppState>,
    session: Session,
    Query(SearchQuery { search }): Query<SearchQuery>,
) -> AppResult<Response> {
    if session_account(&session, state.store.as_ref()).await?.is_none() {
        return Ok(Redirect::to("/login").into_response());
    }
    let mut rooms = state.store.conferences().await?;
    if let Some(needle) = search.filter(|s| !s.trim().is_empty()) {
        let needle = needle.to_lowercase();
        rooms.retain(|r| r.name.to_lowercase().contains(&needle));
    }
    Ok(Json(rooms).into_response())
}

#[derive(Debug, Deserialize)]
pub(crate) struct NewConference {
    name: String,
    password: String,
}

#[debug_handler]
pub(crate) async fn create_conference(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<NewConference>,
) -> AppResult<Response> {
    let Some(account) = session_account(&session, state.store.as_ref()).await? else {
        return Ok(Redirect::to("/login").into_response());
    };
    if form.name.trim().is_empty() || form.password.trim().is_empty() {
        return Ok(reject(
            StatusCode::UNPROCESSABLE_ENTITY,
            "name and password are required",
        ));
    }

    // Ownership cap, checked before anything is inserted.
    let owned = state.store.conference_count_for(account.id).await?;
    if owned >= state.config.conference_limit {
        notify(
            state.store.as_ref(),
            account.id,
            format!("Conference limit of {} reached.", state.config.conference_limit),
            NotificationKind::Alert,
        )
        .await;
        return Ok(reject(
            StatusCode::UNPROCESSABLE_ENTITY,
            "conference limit reached",
        ));
    }

    let room = ConferenceRoom::new(
        account.id,
        form.name.trim().to_owned(),
        hash_password(&form.password)?,
    );
    state.store.insert_conference(&room).await?;
    notify(
        state.store.as_ref(),
        account.id,
        format!("Conference \"{}\" created.", room.name),
        NotificationKind::Success,
    )
    .await;
    Ok((StatusCode::CREATED, Json(room)).into_response())
}

#[debug_handler]
pub(crate) async fn remove_conference(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let Some(account) = session_account(&session, state.store.as_ref()).await? else {
        return Ok(Redirect::to("/login").into_response());
    };
    let Some(room) = state.store.conference_by_id(id).await? else {
        return Ok(reject(StatusCode::NOT_FOUND, "no such conference"));
    };
    if room.owner_id != account.id && account.role != Role::Admin {
        return Ok(reject(StatusCode::FORBIDDEN, "not the owner"));
    }
    state.store.delete_conference(id).await?;
    state.chats.drop_room(id);
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::{MemoryStore as SessionStore, Session};

    use super::*;
    use crate::auth::verify_password;
    use crate::config::Config;
    use crate::conferences::chat::ChatRegistry;
    use crate::models::{Account, now_rfc3339};
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
    async fn creation_below_the_cap_inserts_a_hashed_room() {
        let (state, session, _) = signed_in_state().await;

        let response = create_conference(
            State(state.clone()),
            session.clone(),
            Json(NewConference {
                name: "algebra".into(),
                password: "open sesame".into(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let rooms = state.store.conferences().await.unwrap();
        assert_eq!(rooms.len(), 1);
        assert_ne!(rooms[0].password_hash, "open sesame");
        assert!(verify_password("open sesame", &rooms[0].password_hash));
    }

    #[tokio::test]
    async fn room_past_the_cap_is_refused_before_any_insert() {
        let (state, session, account) = signed_in_state().await;
        for i in 0..state.config.conference_limit {
            let room = ConferenceRoom::new(account.id, format!("room {i}"), "h".into());
            state.store.insert_conference(&room).await.unwrap();
        }

        let response = create_conference(
            State(state.clone()),
            session.clone(),
            Json(NewConference {
                name: "one more".into(),
                password: "pw".into(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        // Nothing inserted past the cap, and exactly one alert banner.
        assert_eq!(
            state.store.conferences().await.unwrap().len(),
            state.config.conference_limit
        );
        let banners = state.store.notifications_for(account.id).await.unwrap();
        assert_eq!(banners.len(), 1);
        assert_eq!(banners[0].kind, NotificationKind::Alert);
    }

    #[tokio::test]
    async fn ownership_cap_counts_per_owner() {
        let store = MemoryStore::new();
        let config = Config::default();
        let owner = Uuid::now_v7();
        let other = Uuid::now_v7();

        for i in 0..config.conference_limit {
            let room = ConferenceRoom::new(owner, format!("room {i}"), "h".into());
            store.insert_conference(&room).await.unwrap();
        }
        store
            .insert_conference(&ConferenceRoom::new(other, "theirs".into(), "h".into()))
            .await
            .unwrap();

        // The create handler refuses before inserting once this count reaches
        // the limit; another owner's rooms do not count against it.
        assert_eq!(
            store.conference_count_for(owner).await.unwrap(),
            config.conference_limit
        );
        assert_eq!(store.conference_count_for(other).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn stored_room_password_verifies_only_the_original() {
        let store = MemoryStore::new();
        let room = ConferenceRoom::new(
            Uuid::now_v7(),
            "algebra".into(),
            hash_password("open sesame").unwrap(),
        );
        store.insert_conference(&room).await.unwrap();

        let stored = store.conference_by_id(room.id).await.unwrap().unwrap();
        assert!(verify_password("open sesame", &stored.password_hash));
        assert!(!verify_password("admin", &stored.password_hash));
        assert!(!verify_password("", &stored.password_hash));
    }
}
