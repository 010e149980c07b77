mod requests;
mod responses;

use crate::{
    auth::{
        roles,
        token::{get_user_from_request, AuthUser},
    },
    database::{
        assert::{find_doctor_by_user, lock_user},
        get_last_insert_id, with_conn,
    },
    models::users::{NewUser, Role, UpdateUser, UserData},
    protocol::{IdResponse, SimpleResponse},
    utils::{
        assert_email_str, assert_password_str, format_time_str, get_page, get_str_pattern_opt,
        hash_password, normalize_email,
    },
    DbPool,
};
use actix_web::{post, web, HttpRequest, HttpResponse, Responder};
use anyhow::{bail, Context};
use diesel::prelude::*;

use self::{requests::*, responses::*};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(add_user)
        .service(search_user)
        .service(modify_user);
}

crate::post_funcs! {
    (add_user, "/add_user", AddUserRequest, IdResponse),
    (search_user, "/search_user", SearchUserRequest, SearchUserResponse),
    (modify_user, "/modify_user", ModifyUserRequest, SimpleResponse),
}

/// Admins may not lock themselves out.
fn assert_self_modify(
    auth: &AuthUser,
    id: u64,
    role: Option<Role>,
    is_active: Option<bool>,
) -> anyhow::Result<()> {
    if auth.id != id {
        return Ok(());
    }
    if is_active == Some(false) {
        bail!("Cannot disable yourself");
    }
    if role.map_or(false, |role| role != Role::Admin) {
        bail!("Cannot change your own role");
    }
    Ok(())
}

/// A login linked to a doctor profile has to stay a DOCTOR until it is unlinked.
fn assert_role_change(role: Option<Role>, linked_doctor: Option<u64>) -> anyhow::Result<()> {
    match (role, linked_doctor) {
        (Some(role), Some(doctor_id)) if role != Role::Doctor => {
            bail!("User is linked to doctor {}, unlink it first", doctor_id)
        }
        _ => Ok(()),
    }
}

async fn add_user_impl(
    pool: web::Data<DbPool>,
    req: HttpRequest,
    info: web::Json<AddUserRequest>,
) -> anyhow::Result<IdResponse> {
    use crate::schema::users;

    let info = info.into_inner();
    let auth = get_user_from_request(&req, &pool).await?;
    auth.require(roles::USER_ADMIN)?;

    let email = normalize_email(&info.email);
    assert_email_str(&email)?;
    assert_password_str(&info.password)?;
    let role = info.role.parse::<Role>()?;

    let id = with_conn(&pool, move |conn| {
        conn.transaction(|| {
            let res = users::table
                .filter(users::email.eq(&email))
                .count()
                .get_result::<i64>(conn)
                .context("DB error")?;
            if res > 0 {
                bail!("Email already registered");
            }

            let data = NewUser {
                email,
                password: hash_password(&info.password),
                name: info.name,
                role: role.as_str().to_string(),
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

    log::info!("user {} added as {} by {}", id, role, auth.id);
    Ok(IdResponse::ok(id))
}

async fn search_user_impl(
    pool: web::Data<DbPool>,
    req: HttpRequest,
    info: web::Json<SearchUserRequest>,
) -> anyhow::Result<SearchUserResponse> {
    use crate::schema::users;

    let info = info.into_inner();
    let auth = get_user_from_request(&req, &pool).await?;
    auth.require(roles::USER_ADMIN)?;

    let pattern = get_str_pattern_opt(info.keyword.map(|s| s.trim().to_string()));
    let role_pattern = match info.role {
        Some(role) => role.parse::<Role>()?.as_str().to_string(),
        None => "%".to_string(),
    };
    let (first_index, limit) = get_page(info.first_index, info.limit);

    let (total, usrs) = with_conn(&pool, move |conn| {
        let query = || {
            users::table
                .filter(users::role.like(role_pattern.clone()))
                .filter(
                    users::name
                        .like(pattern.clone())
                        .or(users::email.like(pattern.clone())),
                )
        };
        let total = query().count().get_result::<i64>(conn).context("DB error")?;
        let usrs = query()
            .order(users::email.asc())
            .offset(first_index)
            .limit(limit)
            .get_results::<UserData>(conn)
            .context("DB error")?;
        Ok((total, usrs))
    })
    .await?;

    let usrs = usrs
        .into_iter()
        .map(|data| SearchUserItem {
            id: data.id,
            email: data.email,
            name: data.name,
            role: data.role,
            is_active: data.is_active,
            created_at: format_time_str(&data.created_at),
        })
        .collect();

    Ok(SearchUserResponse {
        success: true,
        err: "".to_string(),
        total,
        users: usrs,
    })
}

async fn modify_user_impl(
    pool: web::Data<DbPool>,
    req: HttpRequest,
    info: web::Json<ModifyUserRequest>,
) -> anyhow::Result<SimpleResponse> {
    use crate::schema::users;

    let info = info.into_inner();
    let auth = get_user_from_request(&req, &pool).await?;
    auth.require(roles::USER_ADMIN)?;

    let role = info.role.as_ref().map(|r| r.parse::<Role>()).transpose()?;
    assert_self_modify(&auth, info.id, role, info.is_active)?;
    if let Some(password) = &info.password {
        assert_password_str(password)?;
    }

    let data = UpdateUser {
        password: info.password.as_ref().map(hash_password),
        name: info.name,
        role: role.map(|r| r.as_str().to_string()),
        is_active: info.is_active,
    };
    if data.is_empty() {
        bail!("Nothing to modify");
    }

    let id = info.id;
    with_conn(&pool, move |conn| {
        conn.transaction(|| {
            lock_user(conn, id)?;
            assert_role_change(role, find_doctor_by_user(conn, id)?)?;
            diesel::update(users::table.filter(users::id.eq(id)))
                .set(&data)
                .execute(conn)
                .context("DB error")?;
            Ok(())
        })
    })
    .await?;

    log::info!("user {} modified by {}", id, auth.id);
    Ok(SimpleResponse::ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> AuthUser {
        AuthUser {
            id: 1,
            name: "root".to_string(),
            role: Role::Admin,
            doctor_id: None,
        }
    }

    #[test]
    fn admin_cannot_lock_self_out() {
        assert!(assert_self_modify(&admin(), 1, None, Some(false)).is_err());
        assert!(assert_self_modify(&admin(), 1, Some(Role::Secretary), None).is_err());
        assert!(assert_self_modify(&admin(), 1, Some(Role::Admin), Some(true)).is_ok());
    }

    #[test]
    fn admin_may_disable_others() {
        assert!(assert_self_modify(&admin(), 2, Some(Role::Doctor), Some(false)).is_ok());
    }

    #[test]
    fn linked_doctor_keeps_role() {
        let err = assert_role_change(Some(Role::Secretary), Some(4)).unwrap_err();
        assert_eq!(err.to_string(), "User is linked to doctor 4, unlink it first");
        assert!(assert_role_change(Some(Role::Admin), Some(4)).is_err());
        assert!(assert_role_change(Some(Role::Doctor), Some(4)).is_ok());
        assert!(assert_role_change(None, Some(4)).is_ok());
        assert!(assert_role_change(Some(Role::Secretary), None).is_ok());
    }
}
