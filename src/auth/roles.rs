//! Which roles may call which endpoint. DOCTOR callers of the appointment and
//! dashboard reads are further narrowed to their own doctor profile by
//! `AuthUser::scope_doctor`.

use crate::models::users::Role;

const ALL: &[Role] = &[Role::Admin, Role::Secretary, Role::Doctor];
const STAFF: &[Role] = &[Role::Admin, Role::Secretary];
const ADMIN: &[Role] = &[Role::Admin];

pub const APPOINT_READ: &[Role] = ALL;
pub const APPOINT_WRITE: &[Role] = STAFF;
pub const APPOINT_SET_STATUS: &[Role] = ALL;

pub const PATIENT_READ: &[Role] = ALL;
pub const PATIENT_WRITE: &[Role] = STAFF;
pub const PATIENT_DELETE: &[Role] = ADMIN;

pub const DOCTOR_READ: &[Role] = ALL;
pub const DOCTOR_WRITE: &[Role] = ADMIN;

pub const USER_ADMIN: &[Role] = ADMIN;

pub const REMINDER_SEARCH: &[Role] = STAFF;
pub const REMINDER_BACKFILL: &[Role] = ADMIN;

pub const DASHBOARD: &[Role] = ALL;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::AuthUser;

    fn user(role: Role) -> AuthUser {
        AuthUser {
            id: 1,
            name: "someone".to_string(),
            role,
            doctor_id: None,
        }
    }

    #[test]
    fn role_matrix() {
        // (operation, admin, secretary, doctor)
        let table: &[(&str, &[Role], [bool; 3])] = &[
            ("appointment read", APPOINT_READ, [true, true, true]),
            ("appointment write", APPOINT_WRITE, [true, true, false]),
            ("appointment set_status", APPOINT_SET_STATUS, [true, true, true]),
            ("patient read", PATIENT_READ, [true, true, true]),
            ("patient add/modify", PATIENT_WRITE, [true, true, false]),
            ("patient delete", PATIENT_DELETE, [true, false, false]),
            ("doctor read", DOCTOR_READ, [true, true, true]),
            ("doctor write", DOCTOR_WRITE, [true, false, false]),
            ("user management", USER_ADMIN, [true, false, false]),
            ("reminder search", REMINDER_SEARCH, [true, true, false]),
            ("reminder backfill", REMINDER_BACKFILL, [true, false, false]),
            ("dashboard", DASHBOARD, [true, true, true]),
        ];
        for (op, roles, expected) in table {
            for (role, allowed) in [Role::Admin, Role::Secretary, Role::Doctor]
                .iter()
                .zip(expected.iter())
            {
                let res = user(*role).require(roles);
                assert_eq!(res.is_ok(), *allowed, "{} as {}", op, role);
                if let Err(err) = res {
                    assert_eq!(err.to_string(), "Permission denied");
                }
            }
        }
    }
}
