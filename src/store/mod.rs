mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    Account, ConferenceRoom, Note, Notification, ProfileChanges, ScheduleEntry, SupportTicket,
};

/// The tabular CRUD surface every feature talks to. One implementation is
/// backed by SQLite, the other is the in-memory store selected by the
/// test-mode flag; handlers cannot tell them apart.
///
/// Every read and delete that concerns a single account is owner-scoped:
/// callers pass the session account's id and get back only rows linked to it.
#[async_trait]
pub trait Store: Send + Sync {
    // accounts
    async fn insert_account(&self, account: &Account) -> Result<()>;
    async fn account_by_id(&self, id: Uuid) -> Result<Option<Account>>;
    /// Lookup by username (case-insensitive) or exact email.
    async fn account_by_identifier(&self, identifier: &str) -> Result<Option<Account>>;
    async fn list_accounts(&self) -> Result<Vec<Account>>;
    async fn update_account(&self, id: Uuid, changes: &ProfileChanges) -> Result<()>;
    async fn delete_account(&self, id: Uuid) -> Result<()>;

    // schedule entries
    async fn insert_entry(&self, entry: &ScheduleEntry) -> Result<()>;
    async fn entries_for(&self, owner_id: Uuid) -> Result<Vec<ScheduleEntry>>;
    async fn delete_entry(&self, owner_id: Uuid, id: Uuid) -> Result<()>;

    // notes, newest first
    async fn insert_note(&self, note: &Note) -> Result<()>;
    async fn notes_for(&self, owner_id: Uuid) -> Result<Vec<Note>>;
    async fn delete_note(&self, owner_id: Uuid, id: Uuid) -> Result<()>;

    // conference rooms (globally listable)
    async fn insert_conference(&self, room: &ConferenceRoom) -> Result<()>;
    async fn conferences(&self) -> Result<Vec<ConferenceRoom>>;
    async fn conference_by_id(&self, id: Uuid) -> Result<Option<ConferenceRoom>>;
    async fn conference_count_for(&self, owner_id: Uuid) -> Result<usize>;
    async fn delete_conference(&self, id: Uuid) -> Result<()>;

    // support tickets
    async fn insert_ticket(&self, ticket: &SupportTicket) -> Result<()>;
    async fn tickets(&self) -> Result<Vec<SupportTicket>>;
    async fn tickets_for(&self, owner_id: Uuid) -> Result<Vec<SupportTicket>>;
    async fn ticket_by_id(&self, id: Uuid) -> Result<Option<SupportTicket>>;
    /// Record the admin reply and move the ticket Open -> Closed. Errors if
    /// the ticket is missing or already closed; there is no reopen.
    async fn close_ticket(&self, id: Uuid, reply: &str) -> Result<SupportTicket>;

    // notifications, newest first
    async fn insert_notification(&self, notification: &Notification) -> Result<()>;
    async fn notifications_for(&self, owner_id: Uuid) -> Result<Vec<Notification>>;

    /// Object storage: persist `bytes` under `name` and return a public URL.
    async fn put_object(&self, name: &str, bytes: &[u8]) -> Result<String>;
}
