use tower_sessions::Session;
use uuid::Uuid;

use crate::{AppResult, models::Account, store::Store};

pub const USER_ID: &str = "user_id";

/// Session key marking a conference as joined (Locked -> Authorized).
pub fn conference_key(room_id: Uuid) -> String {
    format!("conf:{room_id}")
}

/// Resolve the session's account, if any. A stale session pointing at a
/// deleted account reads as signed out.
pub async fn session_account(
    session: &Session,
    store: &dyn Store,
) -> AppResult<Option<Account>> {
    let Some(id) = session.get::<String>(USER_ID).await? else {
        return Ok(None);
    };
    let id = Uuid::parse_str(&id)?;
    Ok(store.account_by_id(id).await?)
}
