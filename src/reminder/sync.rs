//! Keeps the per-appointment reminder rows in line with their appointments.
//!
//! A reminder exists for every appointment that is still expected to happen
//! and fires `lead` before it starts. Writes are full-row `REPLACE INTO`s keyed
//! by appointment id, so running any of this twice leaves the same rows.

use anyhow::{anyhow, Context};
use chrono::{Duration, NaiveDateTime};
use diesel::{
    mysql::Mysql,
    prelude::*,
    query_builder::{QueryFragment, QueryId},
};

use crate::models::{
    appointments::{Appointment, AppointStatus},
    reminders::{NewReminder, ReminderStatus},
};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub scanned: u64,
    pub upserted: u64,
    pub failed: u64,
}

pub fn reminder_time(start_time: NaiveDateTime, lead: Duration) -> anyhow::Result<NaiveDateTime> {
    start_time
        .checked_sub_signed(lead)
        .ok_or_else(|| anyhow!("Reminder time out of range"))
}

pub fn is_remindable(appoint: &Appointment, now: NaiveDateTime) -> bool {
    appoint.deleted_at.is_none()
        && appoint.start_time > now
        && appoint.status().map_or(false, |status| status.is_pending())
}

pub fn new_reminder(
    appointment_id: u64,
    start_time: NaiveDateTime,
    lead: Duration,
    now: NaiveDateTime,
) -> anyhow::Result<NewReminder> {
    Ok(NewReminder {
        appointment_id,
        scheduled_at: reminder_time(start_time, lead)?,
        status: ReminderStatus::Pending.as_str().to_string(),
        attempts: 0,
        last_error: None,
        next_retry_at: None,
        sent_at: None,
        updated_at: now,
    })
}

fn upsert_reminder(
    conn: &MysqlConnection,
    appointment_id: u64,
    start_time: NaiveDateTime,
    lead: Duration,
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    use crate::schema::reminders;

    diesel::replace_into(reminders::table)
        .values(new_reminder(appointment_id, start_time, lead, now)?)
        .execute(conn)
        .context("DB error")?;
    Ok(())
}

/// PENDING and FAILED reminders of one appointment become CANCELLED; SENT and
/// already cancelled rows are left alone.
fn cancel_open_reminder(
    appointment_id: u64,
    now: NaiveDateTime,
) -> impl QueryFragment<Mysql> + QueryId + RunQueryDsl<MysqlConnection> {
    use crate::schema::reminders;

    let open = vec![
        ReminderStatus::Pending.as_str(),
        ReminderStatus::Failed.as_str(),
    ];
    diesel::update(
        reminders::table
            .filter(reminders::appointment_id.eq(appointment_id))
            .filter(reminders::status.eq_any(open)),
    )
    .set((
        reminders::status.eq(ReminderStatus::Cancelled.as_str()),
        reminders::next_retry_at.eq(None::<NaiveDateTime>),
        reminders::updated_at.eq(now),
    ))
}

/// Call after every write to an appointment, inside the same transaction.
pub fn sync_reminder(
    conn: &MysqlConnection,
    appoint: &Appointment,
    lead: Duration,
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    if is_remindable(appoint, now) {
        upsert_reminder(conn, appoint.id, appoint.start_time, lead, now)?;
        log::debug!("reminder of appointment {} upserted", appoint.id);
        return Ok(());
    }

    let res = cancel_open_reminder(appoint.id, now)
        .execute(conn)
        .context("DB error")?;
    if res > 0 {
        log::debug!("reminder of appointment {} cancelled", appoint.id);
    }
    Ok(())
}

/// Rebuilds the reminder of every live future appointment. Each row gets its
/// own transaction; a failing row is logged and counted, and the pass goes on.
pub fn backfill(
    conn: &MysqlConnection,
    lead: Duration,
    now: NaiveDateTime,
) -> anyhow::Result<BackfillReport> {
    use crate::schema::appointments;

    let pending = vec![
        AppointStatus::Scheduled.as_str(),
        AppointStatus::Confirmed.as_str(),
    ];
    let rows = appointments::table
        .filter(appointments::deleted_at.is_null())
        .filter(appointments::start_time.gt(now))
        .filter(appointments::status.eq_any(pending))
        .order(appointments::start_time.asc())
        .select((appointments::id, appointments::start_time))
        .get_results::<(u64, NaiveDateTime)>(conn)
        .context("DB error")?;

    let mut report = BackfillReport::default();
    for (id, start_time) in rows {
        report.scanned += 1;
        match conn.transaction(|| upsert_reminder(conn, id, start_time, lead, now)) {
            Ok(()) => report.upserted += 1,
            Err(err) => {
                log::warn!("reminder backfill failed for appointment {}: {:#}", id, err);
                report.failed += 1;
            }
        }
    }

    log::info!(
        "reminder backfill: scanned {}, upserted {}, failed {}",
        report.scanned,
        report.upserted,
        report.failed
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd(2021, 5, day).and_hms(h, 0, 0)
    }

    fn appoint(status: AppointStatus, start_time: NaiveDateTime) -> Appointment {
        Appointment {
            id: 11,
            patient_id: 1,
            doctor_id: 2,
            start_time,
            end_time: start_time + Duration::minutes(30),
            status: status.as_str().to_string(),
            reason: "".to_string(),
            notes: "".to_string(),
            created_by: 1,
            created_at: at(1, 8),
            updated_at: at(1, 8),
            deleted_at: None,
        }
    }

    #[test]
    fn reminder_fires_a_day_early() {
        assert_eq!(reminder_time(at(10, 9), Duration::hours(24)).unwrap(), at(9, 9));
    }

    #[test]
    fn reminder_time_overflow_is_an_error() {
        #[allow(deprecated)]
        let earliest = chrono::naive::MIN_DATE.and_hms(0, 0, 0);
        let err = reminder_time(earliest, Duration::hours(24)).unwrap_err();
        assert_eq!(err.to_string(), "Reminder time out of range");
    }

    #[test]
    fn only_future_pending_visits_are_remindable() {
        let now = at(5, 12);
        assert!(is_remindable(&appoint(AppointStatus::Scheduled, at(6, 9)), now));
        assert!(is_remindable(&appoint(AppointStatus::Confirmed, at(6, 9)), now));
        assert!(!is_remindable(&appoint(AppointStatus::Cancelled, at(6, 9)), now));
        assert!(!is_remindable(&appoint(AppointStatus::Done, at(6, 9)), now));
        assert!(!is_remindable(&appoint(AppointStatus::NoShow, at(6, 9)), now));
        assert!(!is_remindable(&appoint(AppointStatus::Scheduled, at(5, 12)), now));
        assert!(!is_remindable(&appoint(AppointStatus::Scheduled, at(4, 9)), now));
    }

    #[test]
    fn deleted_visits_are_not_remindable() {
        let mut data = appoint(AppointStatus::Scheduled, at(6, 9));
        data.deleted_at = Some(at(5, 10));
        assert!(!is_remindable(&data, at(5, 12)));
    }

    #[test]
    fn unknown_status_is_not_remindable() {
        let mut data = appoint(AppointStatus::Scheduled, at(6, 9));
        data.status = "PENDING".to_string();
        assert!(!is_remindable(&data, at(5, 12)));
    }

    #[test]
    fn upserted_row_is_reset() {
        let row = new_reminder(11, at(6, 9), Duration::hours(24), at(5, 12)).unwrap();
        assert_eq!(row.appointment_id, 11);
        assert_eq!(row.scheduled_at, at(5, 9));
        assert_eq!(row.status, "PENDING");
        assert_eq!(row.attempts, 0);
        assert!(row.last_error.is_none());
        assert!(row.next_retry_at.is_none());
        assert!(row.sent_at.is_none());
        assert_eq!(row.updated_at, at(5, 12));
    }

    #[test]
    fn cancel_touches_only_open_reminders() {
        let query = cancel_open_reminder(11, at(5, 12));
        let sql = diesel::debug_query::<Mysql, _>(&query).to_string();
        assert!(sql.starts_with("UPDATE `reminders` SET"), "{}", sql);
        assert!(sql.contains("`reminders`.`appointment_id` = ?"), "{}", sql);
        assert!(sql.contains("`reminders`.`status` IN (?, ?)"), "{}", sql);
        assert!(sql.contains("\"PENDING\", \"FAILED\""), "{}", sql);
        assert!(sql.contains("\"CANCELLED\""), "{}", sql);
        assert!(!sql.contains("\"SENT\""), "{}", sql);
    }
}
