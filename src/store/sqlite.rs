use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use uuid::Uuid;

use crate::config::Config;
use crate::models::{
    Account, ConferenceRoom, Note, Notification, ProfileChanges, Role, ScheduleEntry,
    SupportTicket, TicketStatus, WeekDay,
};
use crate::store::Store;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS accounts (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE COLLATE NOCASE,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    phone TEXT NOT NULL DEFAULT '',
    role TEXT NOT NULL,
    avatar TEXT,
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS schedule_entries (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT,
    instructor TEXT,
    room TEXT,
    \"groups\" TEXT,
    day TEXT NOT NULL,
    hour INTEGER NOT NULL,
    duration REAL,
    category TEXT NOT NULL DEFAULT '',
    notification INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS notes (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS conferences (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    owner_id TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS tickets (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    owner_username TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    status TEXT NOT NULL,
    reply TEXT,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS notifications (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    message TEXT NOT NULL,
    kind TEXT NOT NULL,
    created_at TEXT NOT NULL
);
";

/// The production store: sqlx over SQLite, avatars on the local uploads dir
/// served back under `/uploads`.
pub struct SqliteStore {
    pool: SqlitePool,
    uploads_dir: PathBuf,
}

impl SqliteStore {
    pub async fn connect(config: &Config) -> Result<SqliteStore> {
        let options = SqliteConnectOptions::from_str(&config.database_url)
            .context("invalid DATABASE_URL")?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(16)
            .connect_with(options)
            .await?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(SqliteStore {
            pool,
            uploads_dir: config.uploads_dir.clone(),
        })
    }
}

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: String,
    username: String,
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
    role: String,
    avatar: Option<String>,
    password_hash: String,
    created_at: String,
}

impl AccountRow {
    fn into_account(self) -> Result<Account> {
        Ok(Account {
            id: Uuid::parse_str(&self.id)?,
            username: self.username,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            role: self.role.parse::<Role>()?,
            avatar: self.avatar,
            password_hash: self.password_hash,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct EntryRow {
    id: String,
    owner_id: String,
    title: String,
    description: Option<String>,
    instructor: Option<String>,
    room: Option<String>,
    groups: Option<String>,
    day: String,
    hour: i64,
    duration: Option<f64>,
    category: String,
    notification: bool,
}

impl EntryRow {
    fn into_entry(self) -> Result<ScheduleEntry> {
        Ok(ScheduleEntry {
            id: Uuid::parse_str(&self.id)?,
            owner_id: Uuid::parse_str(&self.owner_id)?,
            title: self.title,
            description: self.description,
            instructor: self.instructor,
            room: self.room,
            groups: self.groups,
            day: self.day.parse::<WeekDay>()?,
            hour: u8::try_from(self.hour)?,
            duration: self.duration.map(|d| d as f32),
            category: self.category,
            notification: self.notification,
        })
    }
}

#[derive(sqlx::FromRow)]
struct NoteRow {
    id: String,
    owner_id: String,
    title: String,
    content: String,
    created_at: String,
}

impl NoteRow {
    fn into_note(self) -> Result<Note> {
        Ok(Note {
            id: Uuid::parse_str(&self.id)?,
            owner_id: Uuid::parse_str(&self.owner_id)?,
            title: self.title,
            content: self.content,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ConferenceRow {
    id: String,
    name: String,
    password_hash: String,
    owner_id: String,
    is_active: bool,
    created_at: String,
}

impl ConferenceRow {
    fn into_room(self) -> Result<ConferenceRoom> {
        Ok(ConferenceRoom {
            id: Uuid::parse_str(&self.id)?,
            name: self.name,
            password_hash: self.password_hash,
            owner_id: Uuid::parse_str(&self.owner_id)?,
            is_active: self.is_active,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TicketRow {
    id: String,
    owner_id: String,
    owner_username: String,
    title: String,
    description: String,
    status: String,
    reply: Option<String>,
    created_at: String,
}

impl TicketRow {
    fn into_ticket(self) -> Result<SupportTicket> {
        Ok(SupportTicket {
            id: Uuid::parse_str(&self.id)?,
            owner_id: Uuid::parse_str(&self.owner_id)?,
            owner_username: self.owner_username,
            title: self.title,
            description: self.description,
            status: self.status.parse::<TicketStatus>()?,
            reply: self.reply,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: String,
    owner_id: String,
    message: String,
    kind: String,
    created_at: String,
}

impl NotificationRow {
    fn into_notification(self) -> Result<Notification> {
        Ok(Notification {
            id: Uuid::parse_str(&self.id)?,
            owner_id: Uuid::parse_str(&self.owner_id)?,
            message: self.message,
            kind: self.kind.parse()?,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_account(&self, account: &Account) -> Result<()> {
        sqlx::query(
            "INSERT INTO accounts \
             (id,username,first_name,last_name,email,phone,role,avatar,password_hash,created_at) \
             VALUES (?,?,?,?,?,?,?,?,?,?)",
        )
        .bind(account.id.to_string())
        .bind(&account.username)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(&account.email)
        .bind(&account.phone)
        .bind(account.role.as_str())
        .bind(&account.avatar)
        .bind(&account.password_hash)
        .bind(&account.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn account_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts WHERE id=?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .map(AccountRow::into_account)
            .transpose()
    }

    async fn account_by_identifier(&self, identifier: &str) -> Result<Option<Account>> {
        sqlx::query_as::<_, AccountRow>(
            "SELECT * FROM accounts WHERE username=? COLLATE NOCASE OR email=?",
        )
        .bind(identifier)
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?
        .map(AccountRow::into_account)
        .transpose()
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(AccountRow::into_account)
            .collect()
    }

    async fn update_account(&self, id: Uuid, changes: &ProfileChanges) -> Result<()> {
        sqlx::query(
            "UPDATE accounts SET \
             username=COALESCE(?,username), first_name=COALESCE(?,first_name), \
             last_name=COALESCE(?,last_name), phone=COALESCE(?,phone), \
             avatar=COALESCE(?,avatar) WHERE id=?",
        )
        .bind(&changes.username)
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .bind(&changes.phone)
        .bind(&changes.avatar)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_account(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM accounts WHERE id=?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_entry(&self, entry: &ScheduleEntry) -> Result<()> {
        sqlx::query(
            "INSERT INTO schedule_entries \
             (id,owner_id,title,description,instructor,room,\"groups\",day,hour,duration,category,notification) \
             VALUES (?,?,?,?,?,?,?,?,?,?,?,?)",
        )
        .bind(entry.id.to_string())
        .bind(entry.owner_id.to_string())
        .bind(&entry.title)
        .bind(&entry.description)
        .bind(&entry.instructor)
        .bind(&entry.room)
        .bind(&entry.groups)
        .bind(entry.day.as_str())
        .bind(i64::from(entry.hour))
        .bind(entry.duration.map(f64::from))
        .bind(&entry.category)
        .bind(entry.notification)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn entries_for(&self, owner_id: Uuid) -> Result<Vec<ScheduleEntry>> {
        sqlx::query_as::<_, EntryRow>(
            "SELECT * FROM schedule_entries WHERE owner_id=? ORDER BY id",
        )
        .bind(owner_id.to_string())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(EntryRow::into_entry)
        .collect()
    }

    async fn delete_entry(&self, owner_id: Uuid, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM schedule_entries WHERE id=? AND owner_id=?")
            .bind(id.to_string())
            .bind(owner_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_note(&self, note: &Note) -> Result<()> {
        sqlx::query("INSERT INTO notes (id,owner_id,title,content,created_at) VALUES (?,?,?,?,?)")
            .bind(note.id.to_string())
            .bind(note.owner_id.to_string())
            .bind(&note.title)
            .bind(&note.content)
            .bind(&note.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn notes_for(&self, owner_id: Uuid) -> Result<Vec<Note>> {
        sqlx::query_as::<_, NoteRow>(
            "SELECT * FROM notes WHERE owner_id=? ORDER BY created_at DESC",
        )
        .bind(owner_id.to_string())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(NoteRow::into_note)
        .collect()
    }

    async fn delete_note(&self, owner_id: Uuid, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM notes WHERE id=? AND owner_id=?")
            .bind(id.to_string())
            .bind(owner_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_conference(&self, room: &ConferenceRoom) -> Result<()> {
        sqlx::query(
            "INSERT INTO conferences (id,name,password_hash,owner_id,is_active,created_at) \
             VALUES (?,?,?,?,?,?)",
        )
        .bind(room.id.to_string())
        .bind(&room.name)
        .bind(&room.password_hash)
        .bind(room.owner_id.to_string())
        .bind(room.is_active)
        .bind(&room.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn conferences(&self) -> Result<Vec<ConferenceRoom>> {
        sqlx::query_as::<_, ConferenceRow>("SELECT * FROM conferences ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(ConferenceRow::into_room)
            .collect()
    }

    async fn conference_by_id(&self, id: Uuid) -> Result<Option<ConferenceRoom>> {
        sqlx::query_as::<_, ConferenceRow>("SELECT * FROM conferences WHERE id=?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .map(ConferenceRow::into_room)
            .transpose()
    }

    async fn conference_count_for(&self, owner_id: Uuid) -> Result<usize> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM conferences WHERE owner_id=?")
                .bind(owner_id.to_string())
                .fetch_one(&self.pool)
                .await?;
        Ok(count as usize)
    }

    async fn delete_conference(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM conferences WHERE id=?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_ticket(&self, ticket: &SupportTicket) -> Result<()> {
        sqlx::query(
            "INSERT INTO tickets \
             (id,owner_id,owner_username,title,description,status,reply,created_at) \
             VALUES (?,?,?,?,?,?,?,?)",
        )
        .bind(ticket.id.to_string())
        .bind(ticket.owner_id.to_string())
        .bind(&ticket.owner_username)
        .bind(&ticket.title)
        .bind(&ticket.description)
        .bind(ticket.status.as_str())
        .bind(&ticket.reply)
        .bind(&ticket.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn tickets(&self) -> Result<Vec<SupportTicket>> {
        sqlx::query_as::<_, TicketRow>("SELECT * FROM tickets ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(TicketRow::into_ticket)
            .collect()
    }

    async fn tickets_for(&self, owner_id: Uuid) -> Result<Vec<SupportTicket>> {
        sqlx::query_as::<_, TicketRow>(
            "SELECT * FROM tickets WHERE owner_id=? ORDER BY created_at",
        )
        .bind(owner_id.to_string())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(TicketRow::into_ticket)
        .collect()
    }

    async fn ticket_by_id(&self, id: Uuid) -> Result<Option<SupportTicket>> {
        sqlx::query_as::<_, TicketRow>("SELECT * FROM tickets WHERE id=?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .map(TicketRow::into_ticket)
            .transpose()
    }

    async fn close_ticket(&self, id: Uuid, reply: &str) -> Result<SupportTicket> {
        // Only an open ticket can take the reply; a closed one stays as-is.
        let updated = sqlx::query("UPDATE tickets SET reply=?, status='closed' WHERE id=? AND status='open'")
            .bind(reply)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        if updated.rows_affected() == 0 {
            bail!("ticket {id} is closed or does not exist");
        }
        self.ticket_by_id(id)
            .await?
            .context("ticket vanished after update")
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        sqlx::query(
            "INSERT INTO notifications (id,owner_id,message,kind,created_at) VALUES (?,?,?,?,?)",
        )
        .bind(notification.id.to_string())
        .bind(notification.owner_id.to_string())
        .bind(&notification.message)
        .bind(notification.kind.as_str())
        .bind(&notification.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn notifications_for(&self, owner_id: Uuid) -> Result<Vec<Notification>> {
        sqlx::query_as::<_, NotificationRow>(
            "SELECT * FROM notifications WHERE owner_id=? ORDER BY created_at DESC",
        )
        .bind(owner_id.to_string())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(NotificationRow::into_notification)
        .collect()
    }

    async fn put_object(&self, name: &str, bytes: &[u8]) -> Result<String> {
        if name.contains('/') || name.contains("..") {
            bail!("invalid object name `{name}`");
        }
        tokio::fs::create_dir_all(&self.uploads_dir).await?;
        tokio::fs::write(self.uploads_dir.join(name), bytes).await?;
        Ok(format!("/uploads/{name}"))
    }
}
