use anyhow::{bail, Context};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use diesel::{mysql::Mysql, prelude::*};
use std::collections::{BTreeMap, HashMap};

use super::responses::AppointItem;
use crate::{
    models::appointments::{slot_holding_statuses, AppointStatus, Appointment},
    schema::appointments,
    utils::format_time_str,
};

pub const MAX_CALENDAR_DAYS: i64 = 62;

#[derive(Clone)]
pub struct AppointFilter {
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub statuses: Vec<String>,
    pub doctor_id: Option<u64>,
    pub patient_id: Option<u64>,
}

/// Live appointments starting inside the window; an empty status list means any.
pub fn filtered_query(filter: &AppointFilter) -> appointments::BoxedQuery<'static, Mysql> {
    let mut query = appointments::table
        .filter(appointments::deleted_at.is_null())
        .filter(appointments::start_time.between(filter.start_time, filter.end_time))
        .into_boxed();
    if !filter.statuses.is_empty() {
        query = query.filter(appointments::status.eq_any(filter.statuses.clone()));
    }
    if let Some(doctor_id) = filter.doctor_id {
        query = query.filter(appointments::doctor_id.eq(doctor_id));
    }
    if let Some(patient_id) = filter.patient_id {
        query = query.filter(appointments::patient_id.eq(patient_id));
    }
    query
}

pub fn parse_statuses(statuses: &[String]) -> anyhow::Result<Vec<String>> {
    statuses
        .iter()
        .map(|s| s.parse::<AppointStatus>().map(|status| status.as_str().to_string()))
        .collect()
}

pub fn assert_interval(start_time: &NaiveDateTime, end_time: &NaiveDateTime) -> anyhow::Result<()> {
    if start_time >= end_time {
        bail!("Invalid time interval");
    }
    Ok(())
}

pub fn assert_calendar_window(
    start_time: &NaiveDateTime,
    end_time: &NaiveDateTime,
) -> anyhow::Result<()> {
    assert_interval(start_time, end_time)?;
    if *end_time - *start_time > Duration::days(MAX_CALENDAR_DAYS) {
        bail!("Calendar window is longer than {} days", MAX_CALENDAR_DAYS);
    }
    Ok(())
}

/// Slot-holding appointments of the doctor that intersect `[start_time,
/// end_time)`. Intervals are half-open, so back-to-back visits do not conflict.
pub fn overlap_query(
    doctor_id: u64,
    start_time: NaiveDateTime,
    end_time: NaiveDateTime,
    exclude_id: Option<u64>,
) -> appointments::BoxedQuery<'static, Mysql> {
    let mut query = appointments::table
        .filter(appointments::doctor_id.eq(doctor_id))
        .filter(appointments::deleted_at.is_null())
        .filter(appointments::status.eq_any(slot_holding_statuses()))
        .filter(appointments::start_time.lt(end_time))
        .filter(appointments::end_time.gt(start_time))
        .into_boxed();
    if let Some(id) = exclude_id {
        query = query.filter(appointments::id.ne(id));
    }
    query
}

/// Run with the doctor row locked (`lock_doctor`) so two bookings cannot both
/// pass.
pub fn check_overlap(
    conn: &MysqlConnection,
    doctor_id: u64,
    start_time: NaiveDateTime,
    end_time: NaiveDateTime,
    exclude_id: Option<u64>,
) -> anyhow::Result<()> {
    let res = overlap_query(doctor_id, start_time, end_time, exclude_id)
        .count()
        .get_result::<i64>(conn)
        .context("DB error")?;
    if res > 0 {
        bail!("Time interval conflicts with another appointment of this doctor");
    }
    Ok(())
}

pub fn check_transition(current: AppointStatus, next: AppointStatus) -> anyhow::Result<()> {
    if current == next {
        bail!("Status unchanged");
    }
    if !current.can_transition_to(next) {
        bail!("Cannot change status from {} to {}", current, next);
    }
    Ok(())
}

/// Attaches patient and doctor names to a page of appointments.
pub fn load_items(
    conn: &MysqlConnection,
    appoints: Vec<Appointment>,
) -> anyhow::Result<Vec<AppointItem>> {
    use crate::schema::{doctors, patients};

    let patient_ids: Vec<u64> = appoints.iter().map(|a| a.patient_id).collect();
    let doctor_ids: Vec<u64> = appoints.iter().map(|a| a.doctor_id).collect();

    let patient_names: HashMap<u64, String> = patients::table
        .filter(patients::id.eq_any(patient_ids))
        .select((patients::id, patients::name))
        .get_results::<(u64, String)>(conn)
        .context("DB error")?
        .into_iter()
        .collect();
    let doctor_names: HashMap<u64, String> = doctors::table
        .filter(doctors::id.eq_any(doctor_ids))
        .select((doctors::id, doctors::name))
        .get_results::<(u64, String)>(conn)
        .context("DB error")?
        .into_iter()
        .collect();

    Ok(appoints
        .into_iter()
        .map(|data| {
            let patient_name = patient_names.get(&data.patient_id).cloned();
            let doctor_name = doctor_names.get(&data.doctor_id).cloned();
            to_item(data, patient_name, doctor_name)
        })
        .collect())
}

pub fn to_item(
    data: Appointment,
    patient_name: Option<String>,
    doctor_name: Option<String>,
) -> AppointItem {
    AppointItem {
        id: data.id,
        patient_id: data.patient_id,
        patient_name: patient_name.unwrap_or_default(),
        doctor_id: data.doctor_id,
        doctor_name: doctor_name.unwrap_or_default(),
        start_time: format_time_str(&data.start_time),
        end_time: format_time_str(&data.end_time),
        status: data.status,
        reason: data.reason,
        notes: data.notes,
        created_at: format_time_str(&data.created_at),
        updated_at: format_time_str(&data.updated_at),
    }
}

/// Buckets rows by calendar day, days ascending, input order kept inside a day.
pub fn group_by_day<T>(rows: Vec<(NaiveDateTime, T)>) -> Vec<(NaiveDate, Vec<T>)> {
    let mut days: BTreeMap<NaiveDate, Vec<T>> = BTreeMap::new();
    for (time, row) in rows {
        days.entry(time.date()).or_default().push(row);
    }
    days.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::appointments::APPOINT_STATUS_ALL;

    fn at(day: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd(2021, 5, day).and_hms(h, 0, 0)
    }

    #[test]
    fn empty_or_reversed_intervals_are_rejected() {
        assert!(assert_interval(&at(3, 9), &at(3, 10)).is_ok());
        assert!(assert_interval(&at(3, 9), &at(3, 9)).is_err());
        assert!(assert_interval(&at(3, 10), &at(3, 9)).is_err());
    }

    #[test]
    fn calendar_window_is_bounded() {
        let start = at(1, 0);
        assert!(assert_calendar_window(&start, &(start + Duration::days(31))).is_ok());
        assert!(assert_calendar_window(&start, &(start + Duration::days(90))).is_err());
    }

    #[test]
    fn statuses_are_validated() {
        let parsed = parse_statuses(&["SCHEDULED".to_string(), "DONE".to_string()]).unwrap();
        assert_eq!(parsed, vec!["SCHEDULED", "DONE"]);
        assert!(parse_statuses(&["LATE".to_string()]).is_err());
        assert!(parse_statuses(&[]).unwrap().is_empty());
    }

    #[test]
    fn rows_group_by_day_in_order() {
        let rows = vec![(at(4, 15), "c"), (at(3, 9), "a"), (at(4, 8), "d"), (at(3, 11), "b")];
        let days = group_by_day(rows);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].0, NaiveDate::from_ymd(2021, 5, 3));
        assert_eq!(days[0].1, vec!["a", "b"]);
        assert_eq!(days[1].1, vec!["c", "d"]);
    }

    #[test]
    fn item_falls_back_to_empty_names() {
        let data = Appointment {
            id: 5,
            patient_id: 1,
            doctor_id: 2,
            start_time: at(3, 9),
            end_time: at(3, 10),
            status: "SCHEDULED".to_string(),
            reason: "checkup".to_string(),
            notes: "".to_string(),
            created_by: 1,
            created_at: at(1, 8),
            updated_at: at(1, 8),
            deleted_at: None,
        };
        let item = to_item(data, Some("Ann".to_string()), None);
        assert_eq!(item.patient_name, "Ann");
        assert_eq!(item.doctor_name, "");
        assert_eq!(item.start_time, "2021-05-03T09:00:00+00:00");
    }

    #[test]
    fn overlap_is_half_open_over_live_slots() {
        let query = overlap_query(7, at(3, 9), at(3, 10), Some(5));
        let sql = diesel::debug_query::<Mysql, _>(&query).to_string();
        assert!(sql.contains("`appointments`.`doctor_id` = ?"), "{}", sql);
        assert!(sql.contains("`appointments`.`deleted_at` IS NULL"), "{}", sql);
        assert!(sql.contains("`appointments`.`status` IN (?, ?, ?, ?)"), "{}", sql);
        assert!(sql.contains("`appointments`.`start_time` < ?"), "{}", sql);
        assert!(sql.contains("`appointments`.`end_time` > ?"), "{}", sql);
        assert!(sql.contains("`appointments`.`id` != ?"), "{}", sql);
        // existing start < new end, existing end > new start
        assert!(sql.contains("2021-05-03T10:00:00, 2021-05-03T09:00:00, 5]"), "{}", sql);
        assert!(!sql.contains("CANCELLED"), "{}", sql);
    }

    #[test]
    fn new_bookings_exclude_nothing() {
        let query = overlap_query(7, at(3, 9), at(3, 10), None);
        let sql = diesel::debug_query::<Mysql, _>(&query).to_string();
        assert!(!sql.contains("`appointments`.`id` !="), "{}", sql);
    }

    #[test]
    fn same_status_is_unchanged() {
        for status in &APPOINT_STATUS_ALL {
            let err = check_transition(*status, *status).unwrap_err();
            assert_eq!(err.to_string(), "Status unchanged");
        }
    }

    #[test]
    fn transitions_follow_the_lifecycle() {
        use AppointStatus::*;
        assert!(check_transition(Scheduled, Confirmed).is_ok());
        assert!(check_transition(Confirmed, Done).is_ok());
        let err = check_transition(Cancelled, Scheduled).unwrap_err();
        assert_eq!(err.to_string(), "Cannot change status from CANCELLED to SCHEDULED");
        assert!(check_transition(Done, NoShow).is_err());
    }
}
