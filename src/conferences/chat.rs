use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    Json, debug_handler,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tower_sessions::Session;
use uuid::Uuid;

use crate::config::Config;
use crate::models::{Account, NotificationKind, now_rfc3339};
use crate::notifications::notify;
use crate::session::session_account;
use crate::{AppResult, AppState, reject};

use super::{assistant, room};

pub const SYSTEM_AUTHOR: &str = "System";
pub const ASSISTANT_AUTHOR: &str = "Nexus AI";

/// One chat line. Lives only in the registry; nothing here touches the store.
#[derive(Debug, Clone, Serialize)]
pub struct ChatEntry {
    pub id: Uuid,
    pub author: String,
    pub is_assistant: bool,
    pub sent_at: String,
    #[serde(flatten)]
    pub payload: ChatPayload,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChatPayload {
    Text {
        content: String,
        /// Markdown rendering of `content`.
        html: String,
    },
    Image {
        name: String,
        /// Data URL; held in memory for the session only.
        data: String,
    },
    File {
        name: String,
        data: String,
    },
}

impl ChatEntry {
    fn with_payload(author: &str, is_assistant: bool, payload: ChatPayload) -> ChatEntry {
        ChatEntry {
            id: Uuid::now_v7(),
            author: author.to_owned(),
            is_assistant,
            sent_at: now_rfc3339(),
            payload,
        }
    }

    pub fn text(author: &str, content: &str) -> ChatEntry {
        let mut html = String::new();
        pulldown_cmark::html::push_html(&mut html, pulldown_cmark::Parser::new(content));
        ChatEntry::with_payload(
            author,
            false,
            ChatPayload::Text {
                content: content.to_owned(),
                html,
            },
        )
    }

    pub fn assistant(content: &str) -> ChatEntry {
        let mut html = String::new();
        pulldown_cmark::html::push_html(&mut html, pulldown_cmark::Parser::new(content));
        ChatEntry::with_payload(
            ASSISTANT_AUTHOR,
            true,
            ChatPayload::Text {
                content: content.to_owned(),
                html,
            },
        )
    }

    pub fn system(content: &str) -> ChatEntry {
        ChatEntry::text(SYSTEM_AUTHOR, content)
    }
}

/// What a participant submits, over the websocket or `POST .../chat`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChatSend {
    Text { content: String },
    Image { name: String, data: String },
    File { name: String, data: String },
}

/// Per-room in-memory chat state: the append-only log plus the broadcast
/// channel fanning serialized entries out to websocket subscribers.
struct RoomChat {
    log: Vec<ChatEntry>,
    tx: broadcast::Sender<String>,
}

impl RoomChat {
    fn new() -> RoomChat {
        RoomChat {
            log: vec![ChatEntry::system("Welcome to the secured conference.")],
            tx: broadcast::channel(64).0,
        }
    }
}

#[derive(Clone, Default)]
pub struct ChatRegistry {
    rooms: Arc<Mutex<HashMap<Uuid, RoomChat>>>,
}

impl ChatRegistry {
    /// Current log plus a live receiver, creating the room on first touch.
    pub fn join(&self, room_id: Uuid) -> (Vec<ChatEntry>, broadcast::Receiver<String>) {
        let mut rooms = self.rooms.lock().unwrap();
        let room = rooms.entry(room_id).or_insert_with(RoomChat::new);
        (room.log.clone(), room.tx.subscribe())
    }

    pub fn log(&self, room_id: Uuid) -> Vec<ChatEntry> {
        let mut rooms = self.rooms.lock().unwrap();
        rooms
            .entry(room_id)
            .or_insert_with(RoomChat::new)
            .log
            .clone()
    }

    pub fn append(&self, room_id: Uuid, entry: ChatEntry) {
        let mut rooms = self.rooms.lock().unwrap();
        let room = rooms.entry(room_id).or_insert_with(RoomChat::new);
        if let Ok(text) = serde_json::to_string(&entry) {
            let _ = room.tx.send(text);
        }
        room.log.push(entry);
    }

    /// Forget a room's chat entirely. Called when the conference is deleted.
    pub fn drop_room(&self, room_id: Uuid) {
        self.rooms.lock().unwrap().remove(&room_id);
    }
}

pub(crate) enum Delivery {
    Posted(ChatEntry),
    Rejected(&'static str),
}

fn exceeded_limit(send: &ChatSend, config: &Config) -> Option<usize> {
    match send {
        ChatSend::Text { .. } => None,
        ChatSend::Image { data, .. } if data.len() > config.image_limit => Some(config.image_limit),
        ChatSend::File { data, .. } if data.len() > config.file_limit => Some(config.file_limit),
        _ => None,
    }
}

/// Validate and append one submission, then kick off the assistant round if
/// the text asks for one. Over-ceiling attachments are refused before the log
/// is touched, with a single alert banner for the sender.
pub(crate) async fn deliver(
    state: &AppState,
    room_id: Uuid,
    account: &Account,
    send: ChatSend,
) -> AppResult<Delivery> {
    if let Some(limit) = exceeded_limit(&send, &state.config) {
        notify(
            state.store.as_ref(),
            account.id,
            format!("File too large. Max: {}MB", limit / (1024 * 1024)),
            NotificationKind::Alert,
        )
        .await;
        return Ok(Delivery::Rejected("attachment too large"));
    }

    let entry = match send {
        ChatSend::Text { content } => {
            if content.trim().is_empty() {
                return Ok(Delivery::Rejected("empty message"));
            }
            let entry = ChatEntry::text(&account.username, &content);
            state.chats.append(room_id, entry.clone());
            if assistant::wants_reply(&content) && state.config.assistant.is_some() {
                tokio::spawn(assistant::reply_round(state.clone(), room_id, content));
            }
            entry
        }
        ChatSend::Image { name, data } => {
            let entry =
                ChatEntry::with_payload(&account.username, false, ChatPayload::Image { name, data });
            state.chats.append(room_id, entry.clone());
            entry
        }
        ChatSend::File { name, data } => {
            let entry =
                ChatEntry::with_payload(&account.username, false, ChatPayload::File { name, data });
            state.chats.append(room_id, entry.clone());
            entry
        }
    };
    Ok(Delivery::Posted(entry))
}

#[debug_handler]
pub(crate) async fn chat_log(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    if session_account(&session, state.store.as_ref()).await?.is_none() {
        return Ok(Redirect::to("/login").into_response());
    }
    if !room::authorized(&session, id).await? {
        return Ok(reject(StatusCode::FORBIDDEN, "join the conference first"));
    }
    Ok(Json(state.chats.log(id)).into_response())
}

#[debug_handler]
pub(crate) async fn post_message(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(send): Json<ChatSend>,
) -> AppResult<Response> {
    let Some(account) = session_account(&session, state.store.as_ref()).await? else {
        return Ok(Redirect::to("/login").into_response());
    };
    if !room::authorized(&session, id).await? {
        return Ok(reject(StatusCode::FORBIDDEN, "join the conference first"));
    }
    match deliver(&state, id, &account, send).await? {
        Delivery::Posted(entry) => Ok((StatusCode::CREATED, Json(entry)).into_response()),
        Delivery::Rejected(reason) => Ok(reject(StatusCode::UNPROCESSABLE_ENTITY, reason)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::{Role, now_rfc3339};
    use crate::store::{MemoryStore, Store};

    fn test_state() -> AppState {
        AppState {
            store: Arc::new(MemoryStore::new()),
            config: Config::default(),
            chats: ChatRegistry::default(),
            http: reqwest::Client::new(),
        }
    }

    fn tester() -> Account {
        Account {
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
        }
    }

    #[test]
    fn every_room_starts_with_the_welcome_line() {
        let registry = ChatRegistry::default();
        let log = registry.log(Uuid::now_v7());
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].author, SYSTEM_AUTHOR);
    }

    #[test]
    fn appends_fan_out_to_subscribers() {
        let registry = ChatRegistry::default();
        let room = Uuid::now_v7();
        let (_, mut rx) = registry.join(room);
        registry.append(room, ChatEntry::text("JeanD", "hello"));
        let frame = rx.try_recv().unwrap();
        assert!(frame.contains("hello"));
        assert_eq!(registry.log(room).len(), 2);
    }

    #[test]
    fn text_entries_render_markdown() {
        let entry = ChatEntry::text("JeanD", "some *emphasis*");
        let ChatPayload::Text { html, .. } = &entry.payload else {
            panic!("expected text payload");
        };
        assert!(html.contains("<em>emphasis</em>"));
    }

    #[tokio::test]
    async fn oversized_attachment_is_refused_before_the_log() {
        let state = test_state();
        let account = tester();
        let room = Uuid::now_v7();

        let send = ChatSend::File {
            name: "big.bin".to_owned(),
            data: "x".repeat(state.config.file_limit + 1),
        };
        let Delivery::Rejected(_) = deliver(&state, room, &account, send).await.unwrap() else {
            panic!("expected rejection");
        };

        // Log untouched past the welcome line, exactly one alert banner.
        assert_eq!(state.chats.log(room).len(), 1);
        let banners = state.store.notifications_for(account.id).await.unwrap();
        assert_eq!(banners.len(), 1);
        assert_eq!(banners[0].kind, NotificationKind::Alert);
    }

    #[tokio::test]
    async fn attachment_at_the_ceiling_is_accepted() {
        let state = test_state();
        let account = tester();
        let room = Uuid::now_v7();

        let send = ChatSend::Image {
            name: "pic.png".to_owned(),
            data: "x".repeat(state.config.image_limit),
        };
        let Delivery::Posted(_) = deliver(&state, room, &account, send).await.unwrap() else {
            panic!("expected post");
        };
        assert_eq!(state.chats.log(room).len(), 2);
        assert!(
            state
                .store
                .notifications_for(account.id)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn blank_text_is_dropped_silently() {
        let state = test_state();
        let account = tester();
        let room = Uuid::now_v7();

        let send = ChatSend::Text {
            content: "   ".to_owned(),
        };
        let Delivery::Rejected(_) = deliver(&state, room, &account, send).await.unwrap() else {
            panic!("expected rejection");
        };
        assert_eq!(state.chats.log(room).len(), 1);
        assert!(
            state
                .store
                .notifications_for(account.id)
                .await
                .unwrap()
                .is_empty()
        );
    }
}
