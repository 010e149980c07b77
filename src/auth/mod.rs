mod requests;
mod responses;
pub mod roles;
pub mod token;

use crate::{
    config::Settings,
    database::{
        assert::{check_user, lock_any_user},
        get_last_insert_id, with_conn,
    },
    models::users::{NewUser, Role, UserData},
    protocol::{EmptyRequest, IdResponse, SimpleResponse},
    utils::{assert_email_str, assert_password_str, hash_password, normalize_email},
    DbPool,
};
use actix_web::{post, web, HttpRequest, HttpResponse, Responder};
use anyhow::{anyhow, bail, Context};
use diesel::prelude::*;

use self::{
    requests::{LoginRequest, ModifyPasswordRequest, RegisterAdminRequest},
    responses::{LoginResponse, MeResponse},
    token::get_user_from_request,
};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(register_admin)
        .service(login)
        .service(me)
        .service(modify_password);
}

crate::post_funcs! {
    (register_admin, "/register_admin", RegisterAdminRequest, IdResponse),
    (login, "/login", LoginRequest, LoginResponse),
    (me, "/me", EmptyRequest, MeResponse),
    (modify_password, "/modify_password", ModifyPasswordRequest, SimpleResponse),
}

async fn register_admin_impl(
    pool: web::Data<DbPool>,
    _req: HttpRequest,
    info: web::Json<RegisterAdminRequest>,
) -> anyhow::Result<IdResponse> {
    use crate::schema::users;

    let info = info.into_inner();
    let email = normalize_email(&info.email);
    assert_email_str(&email)?;
    assert_password_str(&info.password)?;

    let id = with_conn(&pool, move |conn| {
        conn.transaction(|| {
            if lock_any_user(conn)? {
                bail!("Clinic already has users");
            }

            let data = NewUser {
                email,
                password: hash_password(&info.password),
                name: info.name,
                role: Role::Admin.as_str().to_string(),
                is_active: true,
            };
            diesel::insert_into(users::table)
                .values(data)
                .execute(conn)
                .context("DB error")?;

            get_last_insert_id(conn).context("DB error")
        })
    })
    .await?;

    log::info!("bootstrap admin {} registered", id);
    Ok(IdResponse::ok(id))
}

async fn login_impl(
    pool: web::Data<DbPool>,
    req: HttpRequest,
    info: web::Json<LoginRequest>,
) -> anyhow::Result<LoginResponse> {
    use crate::schema::users;

    let info = info.into_inner();
    let settings = Settings::from_request(&req)?;

    let email = normalize_email(&info.email);
    let user = with_conn(&pool, move |conn| {
        users::table
            .filter(users::email.eq(email))
            .get_result::<UserData>(conn)
            .optional()
            .context("DB error")
    })
    .await?
    .ok_or_else(|| anyhow!("No such user"))?;

    if user.password != hash_password(&info.password) {
        bail!("Wrong password");
    }
    if !user.is_active {
        bail!("User is disabled");
    }

    let token = token::issue_token(&user, &settings.jwt_secret, settings.jwt_ttl_secs)?;
    log::info!("user {} logged in as {}", user.id, user.role);

    Ok(LoginResponse {
        success: true,
        err: "".to_string(),
        token,
        id: user.id,
        name: user.name,
        role: user.role,
    })
}

async fn me_impl(
    pool: web::Data<DbPool>,
    req: HttpRequest,
    _info: web::Json<EmptyRequest>,
) -> anyhow::Result<MeResponse> {
    let auth = get_user_from_request(&req, &pool).await?;

    let id = auth.id;
    let data = with_conn(&pool, move |conn| check_user(conn, id)).await?;

    Ok(MeResponse {
        success: true,
        err: "".to_string(),
        id: data.id,
        email: data.email,
        name: data.name,
        role: data.role,
        doctor_id: auth.doctor_id,
    })
}

async fn modify_password_impl(
    pool: web::Data<DbPool>,
    req: HttpRequest,
    info: web::Json<ModifyPasswordRequest>,
) -> anyhow::Result<SimpleResponse> {
    use crate::schema::users;

    let info = info.into_inner();
    let auth = get_user_from_request(&req, &pool).await?;
    assert_password_str(&info.password_new)?;

    let id = auth.id;
    with_conn(&pool, move |conn| {
        conn.transaction(|| {
            let res = users::table
                .filter(users::id.eq(id))
                .filter(users::password.eq(hash_password(&info.password_old)))
                .count()
                .get_result::<i64>(conn)
                .context("DB error")?;
            if res != 1 {
                bail!("Wrong password");
            }

            diesel::update(users::table.filter(users::id.eq(id)))
                .set(users::password.eq(hash_password(&info.password_new)))
                .execute(conn)
                .context("DB error")?;

            Ok(())
        })
    })
    .await?;

    Ok(SimpleResponse::ok())
}
