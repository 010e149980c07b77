mod requests;
mod responses;

use crate::{
    appointment::utils::{filtered_query, load_items, AppointFilter},
    auth::{roles, token::get_user_from_request},
    database::with_conn,
    models::appointments::{AppointStatus, Appointment, APPOINT_STATUS_ALL},
    utils::parse_time_pair_str_opt,
    DbPool,
};
use actix_web::{post, web, HttpRequest, HttpResponse, Responder};
use anyhow::Context;
use chrono::Utc;
use diesel::prelude::*;

use self::{requests::*, responses::*};

const UPCOMING_LIMIT: i64 = 5;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(summary);
}

crate::post_funcs! {
    (summary, "/summary", SummaryRequest, SummaryResponse),
}

async fn summary_impl(
    pool: web::Data<DbPool>,
    req: HttpRequest,
    info: web::Json<SummaryRequest>,
) -> anyhow::Result<SummaryResponse> {
    use crate::schema::appointments;

    let info = info.into_inner();
    let auth = get_user_from_request(&req, &pool).await?;
    auth.require(roles::DASHBOARD)?;

    let (start_time, end_time) = parse_time_pair_str_opt(info.start_time, info.end_time)?;
    let doctor_id = auth.scope_doctor(info.doctor_id)?;
    let window = AppointFilter {
        start_time,
        end_time,
        statuses: vec![],
        doctor_id,
        patient_id: None,
    };

    let now = Utc::now().naive_utc();
    let (counts, upcoming) = with_conn(&pool, move |conn| {
        let mut counts = Vec::with_capacity(APPOINT_STATUS_ALL.len());
        for status in APPOINT_STATUS_ALL.iter() {
            let filter = AppointFilter {
                statuses: vec![status.as_str().to_string()],
                ..window.clone()
            };
            let count = filtered_query(&filter)
                .count()
                .get_result::<i64>(conn)
                .context("DB error")?;
            counts.push(StatusCount {
                status: status.as_str().to_string(),
                count,
            });
        }

        let (_, time_max) = parse_time_pair_str_opt::<&str, &str>(None, None)?;
        let next = AppointFilter {
            start_time: now,
            end_time: time_max,
            statuses: vec![
                AppointStatus::Scheduled.as_str().to_string(),
                AppointStatus::Confirmed.as_str().to_string(),
            ],
            doctor_id,
            patient_id: None,
        };
        let appoints = filtered_query(&next)
            .order((appointments::start_time.asc(), appointments::id.asc()))
            .limit(UPCOMING_LIMIT)
            .get_results::<Appointment>(conn)
            .context("DB error")?;

        Ok((counts, load_items(conn, appoints)?))
    })
    .await?;

    Ok(SummaryResponse {
        success: true,
        err: "".to_string(),
        total: counts.iter().map(|c| c.count).sum(),
        counts,
        upcoming,
    })
}
