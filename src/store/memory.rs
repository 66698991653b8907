use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{Result, bail};
use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::hash_password;
use crate::config::Config;
use crate::models::{
    Account, ConferenceRoom, Note, Notification, ProfileChanges, Role, ScheduleEntry,
    SupportTicket, TicketStatus, now_rfc3339,
};
use crate::store::Store;

/// Test-mode stand-in for the real store. Nothing here survives a restart and
/// no production code path constructs it: only the startup `test_mode` switch.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    accounts: Vec<Account>,
    entries: Vec<ScheduleEntry>,
    notes: Vec<Note>,
    conferences: Vec<ConferenceRoom>,
    tickets: Vec<SupportTicket>,
    notifications: Vec<Notification>,
    objects: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    /// Empty store, for tests that register their own accounts.
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// Store pre-seeded with the development administrator.
    pub fn seeded(config: &Config) -> Result<MemoryStore> {
        let store = MemoryStore::new();
        let admin = Account {
            id: Uuid::now_v7(),
            username: "admin".to_owned(),
            first_name: "System".to_owned(),
            last_name: "Administrator".to_owned(),
            email: "admin@chrononexus.internal".to_owned(),
            phone: String::new(),
            role: Role::Admin,
            avatar: None,
            password_hash: hash_password(&config.test_admin_password)?,
            created_at: now_rfc3339(),
        };
        store.inner.lock().unwrap().accounts.push(admin);
        Ok(store)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_account(&self, account: &Account) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner
            .accounts
            .iter()
            .any(|a| a.username.eq_ignore_ascii_case(&account.username) || a.email == account.email)
        {
            bail!("username or email already taken");
        }
        inner.accounts.push(account.clone());
        Ok(())
    }

    async fn account_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn account_by_identifier(&self, identifier: &str) -> Result<Option<Account>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .accounts
            .iter()
            .find(|a| a.username.eq_ignore_ascii_case(identifier) || a.email == identifier)
            .cloned())
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        Ok(self.inner.lock().unwrap().accounts.clone())
    }

    async fn update_account(&self, id: Uuid, changes: &ProfileChanges) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let Some(account) = inner.accounts.iter_mut().find(|a| a.id == id) else {
            bail!("no account {id}");
        };
        account.apply(changes);
        Ok(())
    }

    async fn delete_account(&self, id: Uuid) -> Result<()> {
        self.inner.lock().unwrap().accounts.retain(|a| a.id != id);
        Ok(())
    }

    async fn insert_entry(&self, entry: &ScheduleEntry) -> Result<()> {
        self.inner.lock().unwrap().entries.push(entry.clone());
        Ok(())
    }

    async fn entries_for(&self, owner_id: Uuid) -> Result<Vec<ScheduleEntry>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .entries
            .iter()
            .filter(|e| e.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn delete_entry(&self, owner_id: Uuid, id: Uuid) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .entries
            .retain(|e| !(e.id == id && e.owner_id == owner_id));
        Ok(())
    }

    async fn insert_note(&self, note: &Note) -> Result<()> {
        self.inner.lock().unwrap().notes.push(note.clone());
        Ok(())
    }

    async fn notes_for(&self, owner_id: Uuid) -> Result<Vec<Note>> {
        let inner = self.inner.lock().unwrap();
        let mut notes: Vec<Note> = inner
            .notes
            .iter()
            .filter(|n| n.owner_id == owner_id)
            .cloned()
            .collect();
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notes)
    }

    async fn delete_note(&self, owner_id: Uuid, id: Uuid) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .notes
            .retain(|n| !(n.id == id && n.owner_id == owner_id));
        Ok(())
    }

    async fn insert_conference(&self, room: &ConferenceRoom) -> Result<()> {
        self.inner.lock().unwrap().conferences.push(room.clone());
        Ok(())
    }

    async fn conferences(&self) -> Result<Vec<ConferenceRoom>> {
        Ok(self.inner.lock().unwrap().conferences.clone())
    }

    async fn conference_by_id(&self, id: Uuid) -> Result<Option<ConferenceRoom>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.conferences.iter().find(|c| c.id == id).cloned())
    }

    async fn conference_count_for(&self, owner_id: Uuid) -> Result<usize> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .conferences
            .iter()
            .filter(|c| c.owner_id == owner_id)
            .count())
    }

    async fn delete_conference(&self, id: Uuid) -> Result<()> {
        self.inner.lock().unwrap().conferences.retain(|c| c.id != id);
        Ok(())
    }

    async fn insert_ticket(&self, ticket: &SupportTicket) -> Result<()> {
        self.inner.lock().unwrap().tickets.push(ticket.clone());
        Ok(())
    }

    async fn tickets(&self) -> Result<Vec<SupportTicket>> {
        Ok(self.inner.lock().unwrap().tickets.clone())
    }

    async fn tickets_for(&self, owner_id: Uuid) -> Result<Vec<SupportTicket>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .tickets
            .iter()
            .filter(|t| t.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn ticket_by_id(&self, id: Uuid) -> Result<Option<SupportTicket>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.tickets.iter().find(|t| t.id == id).cloned())
    }

    async fn close_ticket(&self, id: Uuid, reply: &str) -> Result<SupportTicket> {
        let mut inner = self.inner.lock().unwrap();
        let Some(ticket) = inner.tickets.iter_mut().find(|t| t.id == id) else {
            bail!("ticket {id} does not exist");
        };
        if ticket.status == TicketStatus::Closed {
            bail!("ticket {id} is already closed");
        }
        ticket.reply = Some(reply.to_owned());
        ticket.status = TicketStatus::Closed;
        Ok(ticket.clone())
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .notifications
            .push(notification.clone());
        Ok(())
    }

    async fn notifications_for(&self, owner_id: Uuid) -> Result<Vec<Notification>> {
        let inner = self.inner.lock().unwrap();
        let mut list: Vec<Notification> = inner
            .notifications
            .iter()
            .filter(|n| n.owner_id == owner_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn put_object(&self, name: &str, bytes: &[u8]) -> Result<String> {
        self.inner
            .lock()
            .unwrap()
            .objects
            .insert(name.to_owned(), bytes.to_vec());
        Ok(format!("memory://{name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(username: &str) -> Account {
        Account {
            id: Uuid::now_v7(),
            username: username.to_owned(),
            first_name: "Jean".to_owned(),
            last_name: "Dupont".to_owned(),
            email: format!("{username}@example.com"),
            phone: String::new(),
            role: Role::User,
            avatar: None,
            password_hash: "x".to_owned(),
            created_at: now_rfc3339(),
        }
    }

    #[tokio::test]
    async fn identifier_lookup_is_case_insensitive_on_username() {
        let store = MemoryStore::new();
        store.insert_account(&account("JeanD")).await.unwrap();

        assert!(store.account_by_identifier("jeand").await.unwrap().is_some());
        assert!(
            store
                .account_by_identifier("JeanD@example.com")
                .await
                .unwrap()
                .is_some()
        );
        assert!(store.account_by_identifier("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let store = MemoryStore::new();
        store.insert_account(&account("JeanD")).await.unwrap();
        assert!(store.insert_account(&account("jeand")).await.is_err());
    }

    #[tokio::test]
    async fn closed_tickets_stay_closed() {
        let store = MemoryStore::new();
        let owner = Uuid::now_v7();
        let ticket =
            SupportTicket::new(owner, "JeanD".into(), "PDF export".into(), "broken".into());
        store.insert_ticket(&ticket).await.unwrap();

        let closed = store.close_ticket(ticket.id, "fixed").await.unwrap();
        assert_eq!(closed.status, TicketStatus::Closed);
        assert_eq!(closed.reply.as_deref(), Some("fixed"));

        // No operation reopens; a second reply attempt errors out.
        assert!(store.close_ticket(ticket.id, "again").await.is_err());
        let stored = store.ticket_by_id(ticket.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TicketStatus::Closed);
        assert_eq!(stored.reply.as_deref(), Some("fixed"));
    }

    #[tokio::test]
    async fn deletes_are_owner_scoped() {
        let store = MemoryStore::new();
        let owner = Uuid::now_v7();
        let stranger = Uuid::now_v7();
        let note = Note::new(owner, "t".into(), "c".into());
        store.insert_note(&note).await.unwrap();

        store.delete_note(stranger, note.id).await.unwrap();
        assert_eq!(store.notes_for(owner).await.unwrap().len(), 1);

        store.delete_note(owner, note.id).await.unwrap();
        assert!(store.notes_for(owner).await.unwrap().is_empty());
    }
}
