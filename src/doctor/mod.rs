mod requests;
mod responses;

use crate::{
    auth::{roles, token::get_user_from_request},
    database::{
        assert::{check_doctor, lock_user},
        get_last_insert_id, with_conn,
    },
    models::{
        appointments::AppointStatus,
        doctors::{DoctorData, NewDoctor, UpdateDoctor},
        users::Role,
    },
    protocol::{IdResponse, SimpleResponse},
    utils::{get_page, get_str_pattern_opt},
    DbPool,
};
use actix_web::{post, web, HttpRequest, HttpResponse, Responder};
use anyhow::{bail, Context};
use chrono::Utc;
use diesel::prelude::*;

use self::{requests::*, responses::*};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(search)
        .service(view)
        .service(add)
        .service(modify)
        .service(delete);
}

crate::post_funcs! {
    (search, "/search", SearchDoctorRequest, SearchDoctorResponse),
    (view, "/view", DoctorIdRequest, ViewDoctorResponse),
    (add, "/add", AddDoctorRequest, IdResponse),
    (modify, "/modify", ModifyDoctorRequest, SimpleResponse),
    (delete, "/delete", DoctorIdRequest, SimpleResponse),
}

fn to_item(data: DoctorData) -> DoctorItem {
    DoctorItem {
        id: data.id,
        user_id: data.user_id,
        name: data.name,
        specialty: data.specialty,
        telephone: data.telephone,
    }
}

/// A linked login must be a DOCTOR and belong to no other doctor profile.
fn check_link(conn: &MysqlConnection, user_id: u64, doctor_id: Option<u64>) -> anyhow::Result<()> {
    use crate::schema::doctors;

    let user = lock_user(conn, user_id)?;
    if user.role != Role::Doctor.as_str() {
        bail!("User {} is not a doctor", user_id);
    }
    let res = doctors::table
        .filter(doctors::user_id.eq(user_id))
        .filter(doctors::id.ne(doctor_id.unwrap_or(0)))
        .count()
        .get_result::<i64>(conn)
        .context("DB error")?;
    if res > 0 {
        bail!("User {} is already linked to a doctor", user_id);
    }
    Ok(())
}

async fn search_impl(
    pool: web::Data<DbPool>,
    req: HttpRequest,
    info: web::Json<SearchDoctorRequest>,
) -> anyhow::Result<SearchDoctorResponse> {
    use crate::schema::doctors;

    let info = info.into_inner();
    get_user_from_request(&req, &pool)
        .await?
        .require(roles::DOCTOR_READ)?;

    let name_pattern = get_str_pattern_opt(info.keyword.map(|s| s.trim().to_string()));
    let specialty_pattern = get_str_pattern_opt(info.specialty);
    let (first_index, limit) = get_page(info.first_index, info.limit);

    let (total, docs) = with_conn(&pool, move |conn| {
        let query = || {
            doctors::table
                .filter(doctors::deleted_at.is_null())
                .filter(doctors::name.like(name_pattern.clone()))
                .filter(doctors::specialty.like(specialty_pattern.clone()))
        };
        let total = query().count().get_result::<i64>(conn).context("DB error")?;
        let docs = query()
            .order((doctors::name.asc(), doctors::id.asc()))
            .offset(first_index)
            .limit(limit)
            .get_results::<DoctorData>(conn)
            .context("DB error")?;
        Ok((total, docs))
    })
    .await?;

    Ok(SearchDoctorResponse {
        success: true,
        err: "".to_string(),
        total,
        doctors: docs.into_iter().map(to_item).collect(),
    })
}

async fn view_impl(
    pool: web::Data<DbPool>,
    req: HttpRequest,
    info: web::Json<DoctorIdRequest>,
) -> anyhow::Result<ViewDoctorResponse> {
    let info = info.into_inner();
    get_user_from_request(&req, &pool)
        .await?
        .require(roles::DOCTOR_READ)?;

    let id = info.id;
    let data = with_conn(&pool, move |conn| check_doctor(conn, id)).await?;

    Ok(ViewDoctorResponse {
        success: true,
        err: "".to_string(),
        doctor: to_item(data),
    })
}

async fn add_impl(
    pool: web::Data<DbPool>,
    req: HttpRequest,
    info: web::Json<AddDoctorRequest>,
) -> anyhow::Result<IdResponse> {
    use crate::schema::doctors;

    let info = info.into_inner();
    let auth = get_user_from_request(&req, &pool).await?;
    auth.require(roles::DOCTOR_WRITE)?;

    let name = info.name.trim().to_string();
    if name.is_empty() {
        bail!("Doctor name is empty");
    }

    let id = with_conn(&pool, move |conn| {
        conn.transaction(|| {
            if let Some(user_id) = info.user_id {
                check_link(conn, user_id, None)?;
            }

            let data = NewDoctor {
                user_id: info.user_id,
                name,
                specialty: info.specialty,
                telephone: info.telephone,
            };
            diesel::insert_into(doctors::table)
                .values(data)
                .execute(conn)
                .context("DB error")?;
            get_last_insert_id(conn).context("DB error")
        })
    })
    .await?;

    log::info!("doctor {} added", id);
    Ok(IdResponse::ok(id))
}

async fn modify_impl(
    pool: web::Data<DbPool>,
    req: HttpRequest,
    info: web::Json<ModifyDoctorRequest>,
) -> anyhow::Result<SimpleResponse> {
    use crate::schema::doctors;

    let ModifyDoctorRequest {
        id,
        name,
        specialty,
        telephone,
        user_id,
    } = info.into_inner();
    let auth = get_user_from_request(&req, &pool).await?;
    auth.require(roles::DOCTOR_WRITE)?;

    let name = name.map(|s| s.trim().to_string());
    if name.as_ref().map_or(false, |s| s.is_empty()) {
        bail!("Doctor name is empty");
    }
    let data = UpdateDoctor {
        user_id,
        name,
        specialty,
        telephone,
    };
    if data.is_empty() {
        bail!("Nothing to modify");
    }

    with_conn(&pool, move |conn| {
        conn.transaction(|| {
            check_doctor(conn, id)?;
            if let Some(Some(user_id)) = user_id {
                check_link(conn, user_id, Some(id))?;
            }

            diesel::update(doctors::table.filter(doctors::id.eq(id)))
                .set(&data)
                .execute(conn)
                .context("DB error")?;
            Ok(())
        })
    })
    .await?;

    Ok(SimpleResponse::ok())
}

async fn delete_impl(
    pool: web::Data<DbPool>,
    req: HttpRequest,
    info: web::Json<DoctorIdRequest>,
) -> anyhow::Result<SimpleResponse> {
    use crate::schema::{appointments, doctors};

    let info = info.into_inner();
    let auth = get_user_from_request(&req, &pool).await?;
    auth.require(roles::DOCTOR_WRITE)?;

    let id = info.id;
    with_conn(&pool, move |conn| {
        conn.transaction(|| {
            check_doctor(conn, id)?;

            let now = Utc::now().naive_utc();
            let res = appointments::table
                .filter(appointments::doctor_id.eq(id))
                .filter(appointments::deleted_at.is_null())
                .filter(appointments::start_time.gt(now))
                .filter(appointments::status.eq_any(vec![
                    AppointStatus::Scheduled.as_str(),
                    AppointStatus::Confirmed.as_str(),
                ]))
                .count()
                .get_result::<i64>(conn)
                .context("DB error")?;
            if res > 0 {
                bail!("Doctor still has upcoming appointments");
            }

            // Unlink the login so it can be attached to a new profile.
            diesel::update(doctors::table.filter(doctors::id.eq(id)))
                .set((
                    doctors::deleted_at.eq(Some(now)),
                    doctors::user_id.eq(None::<u64>),
                ))
                .execute(conn)
                .context("DB error")?;
            Ok(())
        })
    })
    .await?;

    log::info!("doctor {} deleted", id);
    Ok(SimpleResponse::ok())
}
