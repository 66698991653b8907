use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Role, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(anyhow::anyhow!("unknown role `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub avatar: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: String,
}

/// Profile fields an account may change about itself; `None` leaves the field
/// untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileChanges {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
}

impl Account {
    pub fn apply(&mut self, changes: &ProfileChanges) {
        if let Some(username) = &changes.username {
            self.username = username.clone();
        }
        if let Some(first_name) = &changes.first_name {
            self.first_name = first_name.clone();
        }
        if let Some(last_name) = &changes.last_name {
            self.last_name = last_name.clone();
        }
        if let Some(phone) = &changes.phone {
            self.phone = phone.clone();
        }
        if let Some(avatar) = &changes.avatar {
            self.avatar = Some(avatar.clone());
        }
    }
}

/// Day of week for a recurring timetable slot. Index 0 is Sunday, matching
/// `time::Weekday::number_days_from_sunday`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekDay {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl WeekDay {
    pub fn index0(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WeekDay::Sunday => "sunday",
            WeekDay::Monday => "monday",
            WeekDay::Tuesday => "tuesday",
            WeekDay::Wednesday => "wednesday",
            WeekDay::Thursday => "thursday",
            WeekDay::Friday => "friday",
            WeekDay::Saturday => "saturday",
        }
    }
}

impl FromStr for WeekDay {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<WeekDay, Self::Err> {
        match s {
            "sunday" => Ok(WeekDay::Sunday),
            "monday" => Ok(WeekDay::Monday),
            "tuesday" => Ok(WeekDay::Tuesday),
            "wednesday" => Ok(WeekDay::Wednesday),
            "thursday" => Ok(WeekDay::Thursday),
            "friday" => Ok(WeekDay::Friday),
            "saturday" => Ok(WeekDay::Saturday),
            other => Err(anyhow::anyhow!("unknown weekday `{other}`")),
        }
    }
}

impl fmt::Display for WeekDay {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleEntry {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub instructor: Option<String>,
    pub room: Option<String>,
    pub groups: Option<String>,
    pub day: WeekDay,
    /// Hour of day, 0..=23. Validated at creation.
    pub hour: u8,
    /// Duration in hours.
    pub duration: Option<f32>,
    pub category: String,
    pub notification: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Note {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub content: String,
    pub created_at: String,
}

impl Note {
    pub fn new(owner_id: Uuid, title: String, content: String) -> Note {
        Note {
            id: Uuid::now_v7(),
            owner_id,
            title,
            content,
            created_at: now_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConferenceRoom {
    pub id: Uuid,
    pub name: String,
    // Argon2 hash. The plaintext never leaves the join handler.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub owner_id: Uuid,
    pub is_active: bool,
    pub created_at: String,
}

impl ConferenceRoom {
    pub fn new(owner_id: Uuid, name: String, password_hash: String) -> ConferenceRoom {
        ConferenceRoom {
            id: Uuid::now_v7(),
            name,
            password_hash,
            owner_id,
            is_active: true,
            created_at: now_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    Closed,
}

impl TicketStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::Closed => "closed",
        }
    }
}

impl FromStr for TicketStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<TicketStatus, Self::Err> {
        match s {
            "open" => Ok(TicketStatus::Open),
            "closed" => Ok(TicketStatus::Closed),
            other => Err(anyhow::anyhow!("unknown ticket status `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SupportTicket {
    pub id: Uuid,
    pub owner_id: Uuid,
    /// Username cached at submission time so the desk view needs no join.
    pub owner_username: String,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub reply: Option<String>,
    pub created_at: String,
}

impl SupportTicket {
    pub fn new(
        owner_id: Uuid,
        owner_username: String,
        title: String,
        description: String,
    ) -> SupportTicket {
        SupportTicket {
            id: Uuid::now_v7(),
            owner_id,
            owner_username,
            title,
            description,
            status: TicketStatus::Open,
            reply: None,
            created_at: now_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Info,
    Alert,
    Success,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Info => "info",
            NotificationKind::Alert => "alert",
            NotificationKind::Success => "success",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<NotificationKind, Self::Err> {
        match s {
            "info" => Ok(NotificationKind::Info),
            "alert" => Ok(NotificationKind::Alert),
            "success" => Ok(NotificationKind::Success),
            other => Err(anyhow::anyhow!("unknown notification kind `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub message: String,
    pub kind: NotificationKind,
    pub created_at: String,
}

impl Notification {
    pub fn new(owner_id: Uuid, message: String, kind: NotificationKind) -> Notification {
        Notification {
            id: Uuid::now_v7(),
            owner_id,
            message,
            kind,
            created_at: now_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekday_roundtrips_through_text() {
        for day in [
            WeekDay::Sunday,
            WeekDay::Monday,
            WeekDay::Tuesday,
            WeekDay::Wednesday,
            WeekDay::Thursday,
            WeekDay::Friday,
            WeekDay::Saturday,
        ] {
            assert_eq!(day.as_str().parse::<WeekDay>().unwrap(), day);
        }
        assert_eq!(WeekDay::Sunday.index0(), 0);
        assert_eq!(WeekDay::Saturday.index0(), 6);
    }

    #[test]
    fn sensitive_fields_never_serialize() {
        let room = ConferenceRoom::new(Uuid::now_v7(), "standup".into(), "h4sh".into());
        let json = serde_json::to_string(&room).unwrap();
        assert!(!json.contains("h4sh"));
        assert!(!json.contains("password"));
    }
}
