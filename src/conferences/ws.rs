use axum::{
    debug_handler,
    extract::{Path, State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use futures_util::{SinkExt, StreamExt};
use tower_sessions::Session;
use uuid::Uuid;

use crate::session::session_account;
use crate::{AppResult, AppState, reject};

use super::{chat, chat::ChatSend, room};

/// Live chat stream for an authorized participant: the current log is
/// replayed first, then every append is fanned out as it happens. Inbound
/// frames are chat submissions; malformed ones are skipped.
#[debug_handler]
pub(crate) async fn conference_ws(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    let Some(account) = session_account(&session, state.store.as_ref()).await? else {
        return Ok(Redirect::to("/login").into_response());
    };
    if !room::authorized(&session, id).await? {
        return Ok(reject(StatusCode::FORBIDDEN, "join the conference first"));
    }

    let (log, mut rx) = state.chats.join(id);
    Ok(ws
        .on_upgrade(move |stream| async move {
            let (mut sender, mut receiver) = stream.split();

            for entry in log {
                let Ok(text) = serde_json::to_string(&entry) else {
                    continue;
                };
                if sender.send(text.into()).await.is_err() {
                    return;
                }
            }

            let broadcast_task = tokio::spawn(async move {
                while let Ok(msg) = rx.recv().await {
                    if sender.send(msg.into()).await.is_err() {
                        break;
                    }
                }
            });

            while let Some(Ok(frame)) = receiver.next().await {
                let Ok(send) = serde_json::from_slice::<ChatSend>(&frame.into_data()) else {
                    continue;
                };
                if let Err(err) = chat::deliver(&state, id, &account, send).await {
                    tracing::warn!(room = %id, "chat delivery failed: {:#}", err.0);
                }
            }

            broadcast_task.abort();
        })
        .into_response())
}
