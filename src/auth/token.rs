use actix_web::{http::header, web, HttpRequest};
use anyhow::{anyhow, bail, Context};
use chrono::Utc;
use jsonwebtoken::{errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{
    config::Settings,
    database::{
        assert::{check_user, find_doctor_by_user},
        with_conn,
    },
    models::users::{Role, UserData},
    DbPool,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: u64,
    pub role: String,
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

/// The caller of an authenticated endpoint.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: u64,
    pub name: String,
    pub role: Role,
    /// Set for DOCTOR users that have a doctor profile.
    pub doctor_id: Option<u64>,
}

impl AuthUser {
    pub fn require(&self, roles: &[Role]) -> anyhow::Result<()> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            bail!("Permission denied")
        }
    }

    pub fn is(&self, role: Role) -> bool {
        self.role == role
    }

    /// Doctors only see their own schedule; everyone else may pick any doctor.
    pub fn scope_doctor(&self, requested: Option<u64>) -> anyhow::Result<Option<u64>> {
        if !self.is(Role::Doctor) {
            return Ok(requested);
        }
        let own = self.doctor_id.context("No doctor profile for this user")?;
        match requested {
            Some(id) if id != own => bail!("Permission denied"),
            _ => Ok(Some(own)),
        }
    }
}

pub fn issue_token(user: &UserData, secret: &str, ttl_secs: i64) -> anyhow::Result<String> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user.id,
        role: user.role.clone(),
        name: user.name.clone(),
        iat: now,
        exp: now + ttl_secs,
    };
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .context("Failed to issue login token")
}

pub fn verify_token(token: &str, secret: &str) -> anyhow::Result<Claims> {
    jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|err| match err.kind() {
        ErrorKind::ExpiredSignature => anyhow!("Login has expired"),
        _ => anyhow!("Invalid login token"),
    })
}

pub fn bearer_token(req: &HttpRequest) -> anyhow::Result<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .context("Not logged in")
}

pub async fn get_user_from_request(
    req: &HttpRequest,
    pool: &web::Data<DbPool>,
) -> anyhow::Result<AuthUser> {
    let settings = Settings::from_request(req)?;
    let claims = verify_token(bearer_token(req)?, &settings.jwt_secret)?;

    let id = claims.sub;
    let (user, doctor_id) = with_conn(pool, move |conn| {
        let user = check_user(conn, id)?;
        let doctor_id = find_doctor_by_user(conn, id)?;
        Ok((user, doctor_id))
    })
    .await?;
    if !user.is_active {
        bail!("User is disabled");
    }

    Ok(AuthUser {
        id: user.id,
        name: user.name,
        role: user.role.parse()?,
        doctor_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    const SECRET: &str = "test-secret-0123456789";

    fn user(role: Role) -> UserData {
        UserData {
            id: 7,
            email: "desk@clinic.org".to_string(),
            password: "".to_string(),
            name: "Dana".to_string(),
            role: role.as_str().to_string(),
            is_active: true,
            created_at: Utc::now().naive_utc(),
        }
    }

    fn auth_user(role: Role, doctor_id: Option<u64>) -> AuthUser {
        AuthUser {
            id: 7,
            name: "Dana".to_string(),
            role,
            doctor_id,
        }
    }

    #[test]
    fn issued_token_verifies() {
        let token = issue_token(&user(Role::Secretary), SECRET, 60).unwrap();
        let claims = verify_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.role, "SECRETARY");
        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = issue_token(&user(Role::Admin), SECRET, -120).unwrap();
        let err = verify_token(&token, SECRET).unwrap_err();
        assert_eq!(err.to_string(), "Login has expired");
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let token = issue_token(&user(Role::Admin), SECRET, 60).unwrap();
        let err = verify_token(&token, "another-secret-0123456").unwrap_err();
        assert_eq!(err.to_string(), "Invalid login token");
    }

    #[test]
    fn bearer_header_is_required() {
        let req = TestRequest::default()
            .header("Authorization", "Bearer abc.def.ghi")
            .to_http_request();
        assert_eq!(bearer_token(&req).unwrap(), "abc.def.ghi");

        let req = TestRequest::default()
            .header("Authorization", "Basic abc")
            .to_http_request();
        assert!(bearer_token(&req).is_err());

        let req = TestRequest::default().to_http_request();
        assert!(bearer_token(&req).is_err());
    }

    #[test]
    fn require_checks_role_list() {
        let secretary = auth_user(Role::Secretary, None);
        assert!(secretary.require(&[Role::Admin, Role::Secretary]).is_ok());
        assert!(secretary.require(&[Role::Admin]).is_err());
    }

    #[test]
    fn doctors_are_scoped_to_themselves() {
        let doctor = auth_user(Role::Doctor, Some(3));
        assert_eq!(doctor.scope_doctor(None).unwrap(), Some(3));
        assert_eq!(doctor.scope_doctor(Some(3)).unwrap(), Some(3));
        assert!(doctor.scope_doctor(Some(4)).is_err());

        let unlinked = auth_user(Role::Doctor, None);
        assert!(unlinked.scope_doctor(None).is_err());
    }

    #[test]
    fn staff_pick_any_doctor() {
        let admin = auth_user(Role::Admin, None);
        assert_eq!(admin.scope_doctor(None).unwrap(), None);
        assert_eq!(admin.scope_doctor(Some(4)).unwrap(), Some(4));
    }
}
