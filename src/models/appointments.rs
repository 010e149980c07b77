use crate::schema::appointments;
use anyhow::bail;
use chrono::NaiveDateTime;
use std::{fmt, str::FromStr};

#[derive(Queryable, Clone)]
pub struct Appointment {
    pub id: u64,
    pub patient_id: u64,
    pub doctor_id: u64,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub status: String,
    pub reason: String,
    pub notes: String,
    pub created_by: u64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

impl Appointment {
    pub fn status(&self) -> anyhow::Result<AppointStatus> {
        self.status.parse()
    }
}

#[derive(Insertable)]
#[table_name = "appointments"]
pub struct NewAppointment {
    pub patient_id: u64,
    pub doctor_id: u64,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub status: String,
    pub reason: String,
    pub notes: String,
    pub created_by: u64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(AsChangeset, Default)]
#[table_name = "appointments"]
pub struct UpdateAppointment {
    pub patient_id: Option<u64>,
    pub doctor_id: Option<u64>,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AppointStatus {
    Scheduled,
    Confirmed,
    Cancelled,
    NoShow,
    Done,
}

pub const APPOINT_STATUS_ALL: [AppointStatus; 5] = [
    AppointStatus::Scheduled,
    AppointStatus::Confirmed,
    AppointStatus::Cancelled,
    AppointStatus::NoShow,
    AppointStatus::Done,
];

impl AppointStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointStatus::Scheduled => "SCHEDULED",
            AppointStatus::Confirmed => "CONFIRMED",
            AppointStatus::Cancelled => "CANCELLED",
            AppointStatus::NoShow => "NO_SHOW",
            AppointStatus::Done => "DONE",
        }
    }

    /// Scheduled and confirmed visits are the only ones still expected to happen.
    pub fn is_pending(&self) -> bool {
        matches!(self, AppointStatus::Scheduled | AppointStatus::Confirmed)
    }

    /// Whether the visit still holds the doctor's time slot.
    pub fn holds_slot(&self) -> bool {
        *self != AppointStatus::Cancelled
    }

    pub fn can_transition_to(&self, next: AppointStatus) -> bool {
        match self {
            AppointStatus::Scheduled => next != AppointStatus::Scheduled,
            AppointStatus::Confirmed => matches!(
                next,
                AppointStatus::Cancelled | AppointStatus::NoShow | AppointStatus::Done
            ),
            AppointStatus::Cancelled | AppointStatus::NoShow | AppointStatus::Done => false,
        }
    }
}

impl FromStr for AppointStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SCHEDULED" => Ok(AppointStatus::Scheduled),
            "CONFIRMED" => Ok(AppointStatus::Confirmed),
            "CANCELLED" => Ok(AppointStatus::Cancelled),
            "NO_SHOW" => Ok(AppointStatus::NoShow),
            "DONE" => Ok(AppointStatus::Done),
            _ => bail!("Unknown appointment status '{}'", s),
        }
    }
}

impl fmt::Display for AppointStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statuses that never hold a slot are left out of the list.
pub fn slot_holding_statuses() -> Vec<String> {
    APPOINT_STATUS_ALL
        .iter()
        .filter(|status| status.holds_slot())
        .map(|status| status.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_names_parse_back() {
        for status in APPOINT_STATUS_ALL.iter() {
            assert_eq!(status.as_str().parse::<AppointStatus>().unwrap(), *status);
        }
        assert!("FINISHED".parse::<AppointStatus>().is_err());
    }

    #[test]
    fn scheduled_moves_anywhere_but_itself() {
        let from = AppointStatus::Scheduled;
        assert!(!from.can_transition_to(AppointStatus::Scheduled));
        assert!(from.can_transition_to(AppointStatus::Confirmed));
        assert!(from.can_transition_to(AppointStatus::Cancelled));
        assert!(from.can_transition_to(AppointStatus::NoShow));
        assert!(from.can_transition_to(AppointStatus::Done));
    }

    #[test]
    fn confirmed_cannot_go_back_to_scheduled() {
        let from = AppointStatus::Confirmed;
        assert!(!from.can_transition_to(AppointStatus::Scheduled));
        assert!(!from.can_transition_to(AppointStatus::Confirmed));
        assert!(from.can_transition_to(AppointStatus::Done));
    }

    #[test]
    fn terminal_statuses_are_final() {
        for from in &[
            AppointStatus::Cancelled,
            AppointStatus::NoShow,
            AppointStatus::Done,
        ] {
            for to in APPOINT_STATUS_ALL.iter() {
                assert!(!from.can_transition_to(*to), "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn cancelled_releases_the_slot() {
        let statuses = slot_holding_statuses();
        assert_eq!(statuses.len(), 4);
        assert!(!statuses.contains(&"CANCELLED".to_string()));
    }
}
