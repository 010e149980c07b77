mod requests;
mod responses;

use crate::{
    auth::{roles, token::get_user_from_request},
    database::{assert::check_patient, get_last_insert_id, with_conn},
    models::{
        appointments::AppointStatus,
        patients::{NewPatient, PatientData, UpdatePatient},
    },
    protocol::{IdResponse, SimpleResponse},
    utils::{assert_email_str, format_date_str, get_page, get_str_pattern_opt, parse_date_str},
    DbPool,
};
use actix_web::{post, web, HttpRequest, HttpResponse, Responder};
use anyhow::{bail, Context};
use chrono::{Datelike, NaiveDate, Utc};
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
    (search, "/search", SearchPatientRequest, SearchPatientResponse),
    (view, "/view", PatientIdRequest, ViewPatientResponse),
    (add, "/add", AddPatientRequest, IdResponse),
    (modify, "/modify", ModifyPatientRequest, SimpleResponse),
    (delete, "/delete", PatientIdRequest, SimpleResponse),
}

fn age_on(birthday: &NaiveDate, today: &NaiveDate) -> i32 {
    let mut age = today.year() - birthday.year();
    if (today.month(), today.day()) < (birthday.month(), birthday.day()) {
        age -= 1;
    }
    age
}

fn to_item(data: PatientData) -> PatientItem {
    let today = Utc::today().naive_utc();
    PatientItem {
        id: data.id,
        name: data.name,
        gender: data.gender,
        birthday: data.birthday.as_ref().map_or("".to_string(), format_date_str),
        age: data.birthday.map_or(-1, |birth| age_on(&birth, &today)),
        telephone: data.telephone,
        email: data.email,
        notes: data.notes,
    }
}

fn parse_birthday(birthday: Option<String>) -> anyhow::Result<Option<NaiveDate>> {
    match birthday.filter(|s| !s.is_empty()) {
        Some(s) => {
            let date = parse_date_str(s).context("Wrong format on 'birthday'")?;
            if date > Utc::today().naive_utc() {
                bail!("Birthday is in the future");
            }
            Ok(Some(date))
        }
        None => Ok(None),
    }
}

async fn search_impl(
    pool: web::Data<DbPool>,
    req: HttpRequest,
    info: web::Json<SearchPatientRequest>,
) -> anyhow::Result<SearchPatientResponse> {
    use crate::schema::patients;

    let info = info.into_inner();
    get_user_from_request(&req, &pool)
        .await?
        .require(roles::PATIENT_READ)?;

    let pattern = get_str_pattern_opt(info.keyword.map(|s| s.trim().to_string()));
    let (first_index, limit) = get_page(info.first_index, info.limit);

    let (total, patients) = with_conn(&pool, move |conn| {
        let query = || {
            patients::table
                .filter(patients::deleted_at.is_null())
                .filter(
                    patients::name
                        .like(pattern.clone())
                        .or(patients::telephone.like(pattern.clone()))
                        .or(patients::email.like(pattern.clone())),
                )
        };
        let total = query().count().get_result::<i64>(conn).context("DB error")?;
        let patients = query()
            .order((patients::name.asc(), patients::id.asc()))
            .offset(first_index)
            .limit(limit)
            .get_results::<PatientData>(conn)
            .context("DB error")?;
        Ok((total, patients))
    })
    .await?;

    Ok(SearchPatientResponse {
        success: true,
        err: "".to_string(),
        total,
        patients: patients.into_iter().map(to_item).collect(),
    })
}

async fn view_impl(
    pool: web::Data<DbPool>,
    req: HttpRequest,
    info: web::Json<PatientIdRequest>,
) -> anyhow::Result<ViewPatientResponse> {
    let info = info.into_inner();
    get_user_from_request(&req, &pool)
        .await?
        .require(roles::PATIENT_READ)?;

    let id = info.id;
    let data = with_conn(&pool, move |conn| check_patient(conn, id)).await?;

    Ok(ViewPatientResponse {
        success: true,
        err: "".to_string(),
        patient: to_item(data),
    })
}

async fn add_impl(
    pool: web::Data<DbPool>,
    req: HttpRequest,
    info: web::Json<AddPatientRequest>,
) -> anyhow::Result<IdResponse> {
    use crate::schema::patients;

    let info = info.into_inner();
    let auth = get_user_from_request(&req, &pool).await?;
    auth.require(roles::PATIENT_WRITE)?;

    let name = info.name.trim().to_string();
    if name.is_empty() {
        bail!("Patient name is empty");
    }
    if !info.email.is_empty() {
        assert_email_str(&info.email)?;
    }
    let data = NewPatient {
        name,
        gender: info.gender,
        birthday: parse_birthday(info.birthday)?,
        telephone: info.telephone,
        email: info.email,
        notes: info.notes,
        created_at: Utc::now().naive_utc(),
    };

    let id = with_conn(&pool, move |conn| {
        conn.transaction(|| {
            diesel::insert_into(patients::table)
                .values(data)
                .execute(conn)
                .context("DB error")?;
            get_last_insert_id(conn).context("DB error")
        })
    })
    .await?;

    Ok(IdResponse::ok(id))
}

async fn modify_impl(
    pool: web::Data<DbPool>,
    req: HttpRequest,
    info: web::Json<ModifyPatientRequest>,
) -> anyhow::Result<SimpleResponse> {
    use crate::schema::patients;

    let info = info.into_inner();
    let auth = get_user_from_request(&req, &pool).await?;
    auth.require(roles::PATIENT_WRITE)?;

    if let Some(email) = info.email.as_ref().filter(|s| !s.is_empty()) {
        assert_email_str(email)?;
    }
    let name = info.name.map(|s| s.trim().to_string());
    if name.as_ref().map_or(false, |s| s.is_empty()) {
        bail!("Patient name is empty");
    }
    let data = UpdatePatient {
        name,
        gender: info.gender,
        birthday: parse_birthday(info.birthday)?,
        telephone: info.telephone,
        email: info.email,
        notes: info.notes,
    };
    if data.is_empty() {
        bail!("Nothing to modify");
    }

    let id = info.id;
    with_conn(&pool, move |conn| {
        conn.transaction(|| {
            check_patient(conn, id)?;
            diesel::update(patients::table.filter(patients::id.eq(id)))
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
    info: web::Json<PatientIdRequest>,
) -> anyhow::Result<SimpleResponse> {
    use crate::schema::{appointments, patients};

    let info = info.into_inner();
    let auth = get_user_from_request(&req, &pool).await?;
    auth.require(roles::PATIENT_DELETE)?;

    let id = info.id;
    with_conn(&pool, move |conn| {
        conn.transaction(|| {
            check_patient(conn, id)?;

            let now = Utc::now().naive_utc();
            let res = appointments::table
                .filter(appointments::patient_id.eq(id))
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
                bail!("Patient still has upcoming appointments");
            }

            diesel::update(patients::table.filter(patients::id.eq(id)))
                .set(patients::deleted_at.eq(Some(now)))
                .execute(conn)
                .context("DB error")?;
            Ok(())
        })
    })
    .await?;

    log::info!("patient {} deleted", id);
    Ok(SimpleResponse::ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_counts_full_years() {
        let birthday = NaiveDate::from_ymd(1990, 6, 15);
        assert_eq!(age_on(&birthday, &NaiveDate::from_ymd(2021, 6, 14)), 30);
        assert_eq!(age_on(&birthday, &NaiveDate::from_ymd(2021, 6, 15)), 31);
    }

    #[test]
    fn blank_birthday_is_none() {
        assert_eq!(parse_birthday(None).unwrap(), None);
        assert_eq!(parse_birthday(Some("".to_string())).unwrap(), None);
        assert_eq!(
            parse_birthday(Some("1990-06-15".to_string())).unwrap(),
            Some(NaiveDate::from_ymd(1990, 6, 15))
        );
        assert!(parse_birthday(Some("15/06/1990".to_string())).is_err());
        assert!(parse_birthday(Some("2999-01-01".to_string())).is_err());
    }
}
