mod requests;
pub mod responses;
pub mod utils;

use crate::{
    auth::{roles, token::get_user_from_request},
    config::Settings,
    database::{
        assert::{check_appoint, check_patient, lock_doctor},
        get_last_insert_id, with_conn,
    },
    models::appointments::{AppointStatus, Appointment, NewAppointment, UpdateAppointment},
    protocol::{IdResponse, SimpleResponse},
    reminder::sync::sync_reminder,
    utils::{get_page, parse_time_pair_str, parse_time_pair_str_opt, parse_time_str_opt},
    DbPool,
};
use actix_web::{post, web, HttpRequest, HttpResponse, Responder};
use anyhow::{bail, Context};
use chrono::Utc;
use diesel::prelude::*;

use self::{
    requests::*,
    responses::*,
    utils::{
        assert_calendar_window, assert_interval, check_overlap, check_transition, filtered_query,
        group_by_day, load_items, parse_statuses, AppointFilter,
    },
};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(search)
        .service(view)
        .service(add)
        .service(modify)
        .service(set_status)
        .service(delete)
        .service(calendar);
}

crate::post_funcs! {
    (search, "/search", SearchAppointRequest, SearchAppointResponse),
    (view, "/view", AppointIdRequest, ViewAppointResponse),
    (add, "/add", AddAppointRequest, IdResponse),
    (modify, "/modify", ModifyAppointRequest, SimpleResponse),
    (set_status, "/set_status", SetStatusRequest, SimpleResponse),
    (delete, "/delete", AppointIdRequest, SimpleResponse),
    (calendar, "/calendar", CalendarRequest, CalendarResponse),
}

async fn search_impl(
    pool: web::Data<DbPool>,
    req: HttpRequest,
    info: web::Json<SearchAppointRequest>,
) -> anyhow::Result<SearchAppointResponse> {
    use crate::schema::appointments;

    let info = info.into_inner();
    let auth = get_user_from_request(&req, &pool).await?;
    auth.require(roles::APPOINT_READ)?;

    let (start_time, end_time) = parse_time_pair_str_opt(info.start_time, info.end_time)?;
    let filter = AppointFilter {
        start_time,
        end_time,
        statuses: parse_statuses(&info.status)?,
        doctor_id: auth.scope_doctor(info.doctor_id)?,
        patient_id: info.patient_id,
    };
    let (first_index, limit) = get_page(info.first_index, info.limit);

    let (total, appoints) = with_conn(&pool, move |conn| {
        let total = filtered_query(&filter)
            .count()
            .get_result::<i64>(conn)
            .context("DB error")?;
        let appoints = filtered_query(&filter)
            .order((appointments::start_time.asc(), appointments::id.asc()))
            .offset(first_index)
            .limit(limit)
            .get_results::<Appointment>(conn)
            .context("DB error")?;
        Ok((total, load_items(conn, appoints)?))
    })
    .await?;

    Ok(SearchAppointResponse {
        success: true,
        err: "".to_string(),
        total,
        appointments: appoints,
    })
}

async fn view_impl(
    pool: web::Data<DbPool>,
    req: HttpRequest,
    info: web::Json<AppointIdRequest>,
) -> anyhow::Result<ViewAppointResponse> {
    let info = info.into_inner();
    let auth = get_user_from_request(&req, &pool).await?;
    auth.require(roles::APPOINT_READ)?;

    let id = info.id;
    let mut items = with_conn(&pool, move |conn| {
        let data = check_appoint(conn, id)?;
        auth.scope_doctor(Some(data.doctor_id))?;
        load_items(conn, vec![data])
    })
    .await?;

    Ok(ViewAppointResponse {
        success: true,
        err: "".to_string(),
        appointment: items.remove(0),
    })
}

async fn add_impl(
    pool: web::Data<DbPool>,
    req: HttpRequest,
    info: web::Json<AddAppointRequest>,
) -> anyhow::Result<IdResponse> {
    use crate::schema::appointments;

    let info = info.into_inner();
    let auth = get_user_from_request(&req, &pool).await?;
    auth.require(roles::APPOINT_WRITE)?;
    let lead = Settings::from_request(&req)?.reminder_lead();

    let (start_time, end_time) = parse_time_pair_str(&info.start_time, &info.end_time)?;
    assert_interval(&start_time, &end_time)?;
    let status = match info.status.as_deref() {
        Some(status) => status.parse::<AppointStatus>()?,
        None => AppointStatus::Scheduled,
    };
    if !status.is_pending() {
        bail!("New appointments must be SCHEDULED or CONFIRMED");
    }

    let id = with_conn(&pool, move |conn| {
        conn.transaction(|| {
            check_patient(conn, info.patient_id)?;
            lock_doctor(conn, info.doctor_id)?;
            check_overlap(conn, info.doctor_id, start_time, end_time, None)?;

            let now = Utc::now().naive_utc();
            let data = NewAppointment {
                patient_id: info.patient_id,
                doctor_id: info.doctor_id,
                start_time,
                end_time,
                status: status.as_str().to_string(),
                reason: info.reason,
                notes: info.notes,
                created_by: auth.id,
                created_at: now,
                updated_at: now,
            };
            diesel::insert_into(appointments::table)
                .values(data)
                .execute(conn)
                .context("DB error")?;
            let id = get_last_insert_id(conn).context("DB error")?;

            sync_reminder(conn, &check_appoint(conn, id)?, lead, now)?;
            Ok(id)
        })
    })
    .await?;

    log::info!("appointment {} created", id);
    Ok(IdResponse::ok(id))
}

async fn modify_impl(
    pool: web::Data<DbPool>,
    req: HttpRequest,
    info: web::Json<ModifyAppointRequest>,
) -> anyhow::Result<SimpleResponse> {
    use crate::schema::appointments;

    let info = info.into_inner();
    let auth = get_user_from_request(&req, &pool).await?;
    auth.require(roles::APPOINT_WRITE)?;
    let lead = Settings::from_request(&req)?.reminder_lead();

    let start_time = parse_time_str_opt(info.start_time.as_ref())
        .context("Wrong format on 'start_time'")?;
    let end_time =
        parse_time_str_opt(info.end_time.as_ref()).context("Wrong format on 'end_time'")?;

    let id = info.id;
    with_conn(&pool, move |conn| {
        conn.transaction(|| {
            let current = check_appoint(conn, id)?;
            let rescheduled = info.patient_id.map_or(false, |p| p != current.patient_id)
                || info.doctor_id.map_or(false, |d| d != current.doctor_id)
                || start_time.map_or(false, |t| t != current.start_time)
                || end_time.map_or(false, |t| t != current.end_time);

            if rescheduled {
                if !current.status()?.is_pending() {
                    bail!("Appointment is already {}", current.status);
                }
                let patient_id = info.patient_id.unwrap_or(current.patient_id);
                let doctor_id = info.doctor_id.unwrap_or(current.doctor_id);
                let start_time = start_time.unwrap_or(current.start_time);
                let end_time = end_time.unwrap_or(current.end_time);
                assert_interval(&start_time, &end_time)?;
                check_patient(conn, patient_id)?;
                lock_doctor(conn, doctor_id)?;
                check_overlap(conn, doctor_id, start_time, end_time, Some(id))?;
            }

            let now = Utc::now().naive_utc();
            let data = UpdateAppointment {
                patient_id: info.patient_id,
                doctor_id: info.doctor_id,
                start_time,
                end_time,
                reason: info.reason,
                notes: info.notes,
                updated_at: Some(now),
            };
            diesel::update(appointments::table.filter(appointments::id.eq(id)))
                .set(&data)
                .execute(conn)
                .context("DB error")?;

            sync_reminder(conn, &check_appoint(conn, id)?, lead, now)?;
            Ok(())
        })
    })
    .await?;

    Ok(SimpleResponse::ok())
}

async fn set_status_impl(
    pool: web::Data<DbPool>,
    req: HttpRequest,
    info: web::Json<SetStatusRequest>,
) -> anyhow::Result<SimpleResponse> {
    use crate::schema::appointments;

    let info = info.into_inner();
    let auth = get_user_from_request(&req, &pool).await?;
    auth.require(roles::APPOINT_SET_STATUS)?;
    let lead = Settings::from_request(&req)?.reminder_lead();
    let next = info.status.parse::<AppointStatus>()?;

    let id = info.id;
    with_conn(&pool, move |conn| {
        conn.transaction(|| {
            let current = check_appoint(conn, id)?;
            auth.scope_doctor(Some(current.doctor_id))?;

            check_transition(current.status()?, next)?;

            let now = Utc::now().naive_utc();
            diesel::update(appointments::table.filter(appointments::id.eq(id)))
                .set((
                    appointments::status.eq(next.as_str()),
                    appointments::updated_at.eq(now),
                ))
                .execute(conn)
                .context("DB error")?;

            sync_reminder(conn, &check_appoint(conn, id)?, lead, now)?;
            Ok(())
        })
    })
    .await?;

    log::info!("appointment {} set to {}", id, next);
    Ok(SimpleResponse::ok())
}

async fn delete_impl(
    pool: web::Data<DbPool>,
    req: HttpRequest,
    info: web::Json<AppointIdRequest>,
) -> anyhow::Result<SimpleResponse> {
    use crate::schema::appointments;

    let info = info.into_inner();
    let auth = get_user_from_request(&req, &pool).await?;
    auth.require(roles::APPOINT_WRITE)?;
    let lead = Settings::from_request(&req)?.reminder_lead();

    let id = info.id;
    with_conn(&pool, move |conn| {
        conn.transaction(|| {
            let mut current = check_appoint(conn, id)?;

            let now = Utc::now().naive_utc();
            diesel::update(appointments::table.filter(appointments::id.eq(id)))
                .set((
                    appointments::deleted_at.eq(Some(now)),
                    appointments::updated_at.eq(now),
                ))
                .execute(conn)
                .context("DB error")?;

            current.deleted_at = Some(now);
            sync_reminder(conn, &current, lead, now)?;
            Ok(())
        })
    })
    .await?;

    log::info!("appointment {} deleted", id);
    Ok(SimpleResponse::ok())
}

async fn calendar_impl(
    pool: web::Data<DbPool>,
    req: HttpRequest,
    info: web::Json<CalendarRequest>,
) -> anyhow::Result<CalendarResponse> {
    use crate::schema::appointments;

    let info = info.into_inner();
    let auth = get_user_from_request(&req, &pool).await?;
    auth.require(roles::APPOINT_READ)?;

    let (start_time, end_time) = parse_time_pair_str(&info.start_time, &info.end_time)?;
    assert_calendar_window(&start_time, &end_time)?;
    let filter = AppointFilter {
        start_time,
        end_time,
        statuses: vec![],
        doctor_id: auth.scope_doctor(info.doctor_id)?,
        patient_id: None,
    };

    let rows = with_conn(&pool, move |conn| {
        let appoints = filtered_query(&filter)
            .order((appointments::start_time.asc(), appointments::id.asc()))
            .get_results::<Appointment>(conn)
            .context("DB error")?;
        let times: Vec<_> = appoints.iter().map(|a| a.start_time).collect();
        let items = load_items(conn, appoints)?;
        Ok(times.into_iter().zip(items).collect::<Vec<_>>())
    })
    .await?;

    let days = group_by_day(rows)
        .into_iter()
        .map(|(date, appointments)| CalendarDay {
            date: crate::utils::format_date_str(&date),
            appointments,
        })
        .collect();

    Ok(CalendarResponse {
        success: true,
        err: "".to_string(),
        days,
    })
}
