use crate::schema::reminders;
use anyhow::bail;
use chrono::NaiveDateTime;
use std::{fmt, str::FromStr};

#[derive(Queryable)]
pub struct Reminder {
    pub appointment_id: u64,
    pub scheduled_at: NaiveDateTime,
    pub status: String,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub next_retry_at: Option<NaiveDateTime>,
    pub sent_at: Option<NaiveDateTime>,
    pub updated_at: NaiveDateTime,
}

/// Full row written with `REPLACE INTO`, so every field resets.
#[derive(Insertable)]
#[table_name = "reminders"]
pub struct NewReminder {
    pub appointment_id: u64,
    pub scheduled_at: NaiveDateTime,
    pub status: String,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub next_retry_at: Option<NaiveDateTime>,
    pub sent_at: Option<NaiveDateTime>,
    pub updated_at: NaiveDateTime,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReminderStatus {
    Pending,
    Sent,
    Failed,
    Cancelled,
}

impl ReminderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderStatus::Pending => "PENDING",
            ReminderStatus::Sent => "SENT",
            ReminderStatus::Failed => "FAILED",
            ReminderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl FromStr for ReminderStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ReminderStatus::Pending),
            "SENT" => Ok(ReminderStatus::Sent),
            "FAILED" => Ok(ReminderStatus::Failed),
            "CANCELLED" => Ok(ReminderStatus::Cancelled),
            _ => bail!("Unknown reminder status '{}'", s),
        }
    }
}

impl fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
