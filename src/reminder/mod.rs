mod requests;
mod responses;
pub mod sync;

use crate::{
    auth::{roles, token::get_user_from_request},
    config::Settings,
    database::with_conn,
    models::reminders::{Reminder, ReminderStatus},
    protocol::EmptyRequest,
    utils::{format_time_str, format_time_str_opt, get_page, parse_time_pair_str_opt},
    DbPool,
};
use actix_web::{post, web, HttpRequest, HttpResponse, Responder};
use anyhow::Context;
use chrono::Utc;
use diesel::prelude::*;

use self::{requests::*, responses::*};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(search).service(backfill);
}

crate::post_funcs! {
    (search, "/search", SearchReminderRequest, SearchReminderResponse),
    (backfill, "/backfill", EmptyRequest, BackfillResponse),
}

async fn search_impl(
    pool: web::Data<DbPool>,
    req: HttpRequest,
    info: web::Json<SearchReminderRequest>,
) -> anyhow::Result<SearchReminderResponse> {
    use crate::schema::reminders;

    let info = info.into_inner();
    let auth = get_user_from_request(&req, &pool).await?;
    auth.require(roles::REMINDER_SEARCH)?;

    let status_pattern = match info.status {
        Some(status) => status.parse::<ReminderStatus>()?.as_str().to_string(),
        None => "%".to_string(),
    };
    let (start_time, end_time) = parse_time_pair_str_opt(info.start_time, info.end_time)?;
    let (first_index, limit) = get_page(info.first_index, info.limit);

    let (total, rmds) = with_conn(&pool, move |conn| {
        let query = || {
            reminders::table
                .filter(reminders::status.like(status_pattern.clone()))
                .filter(reminders::scheduled_at.between(start_time, end_time))
        };
        let total = query().count().get_result::<i64>(conn).context("DB error")?;
        let rmds = query()
            .order((reminders::scheduled_at.asc(), reminders::appointment_id.asc()))
            .offset(first_index)
            .limit(limit)
            .get_results::<Reminder>(conn)
            .context("DB error")?;
        Ok((total, rmds))
    })
    .await?;

    let rmds = rmds
        .into_iter()
        .map(|data| SearchReminderItem {
            appointment_id: data.appointment_id,
            scheduled_at: format_time_str(&data.scheduled_at),
            status: data.status,
            attempts: data.attempts,
            last_error: data.last_error.unwrap_or_default(),
            next_retry_at: format_time_str_opt(&data.next_retry_at),
            sent_at: format_time_str_opt(&data.sent_at),
        })
        .collect();

    Ok(SearchReminderResponse {
        success: true,
        err: "".to_string(),
        total,
        reminders: rmds,
    })
}

async fn backfill_impl(
    pool: web::Data<DbPool>,
    req: HttpRequest,
    _info: web::Json<EmptyRequest>,
) -> anyhow::Result<BackfillResponse> {
    let auth = get_user_from_request(&req, &pool).await?;
    auth.require(roles::REMINDER_BACKFILL)?;
    let lead = Settings::from_request(&req)?.reminder_lead();

    let now = Utc::now().naive_utc();
    let report = with_conn(&pool, move |conn| sync::backfill(conn, lead, now)).await?;
    log::info!("reminder backfill triggered by user {}", auth.id);

    Ok(BackfillResponse {
        success: true,
        err: "".to_string(),
        scanned: report.scanned,
        upserted: report.upserted,
        failed: report.failed,
    })
}
