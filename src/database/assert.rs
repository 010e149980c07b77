use anyhow::{anyhow, Context};
use diesel::{
    mysql::Mysql,
    prelude::*,
    query_builder::{QueryFragment, QueryId},
    query_dsl::LoadQuery,
};

use crate::models::{
    appointments::Appointment, doctors::DoctorData, patients::PatientData, users::UserData,
};

pub fn check_user(conn: &MysqlConnection, id: u64) -> anyhow::Result<UserData> {
    use crate::schema::users;

    users::table
        .filter(users::id.eq(id))
        .get_result::<UserData>(conn)
        .optional()
        .context("DB error")?
        .ok_or_else(|| anyhow!("No such user"))
}

pub fn check_doctor(conn: &MysqlConnection, id: u64) -> anyhow::Result<DoctorData> {
    use crate::schema::doctors;

    doctors::table
        .filter(doctors::id.eq(id))
        .filter(doctors::deleted_at.is_null())
        .get_result::<DoctorData>(conn)
        .optional()
        .context("DB error")?
        .ok_or_else(|| anyhow!("No such doctor"))
}

fn lock_user_query(
    id: u64,
) -> impl QueryFragment<Mysql> + QueryId + LoadQuery<MysqlConnection, UserData> {
    use crate::schema::users;

    users::table.filter(users::id.eq(id)).for_update()
}

/// `check_user` plus a row lock. Role changes and doctor links both take it,
/// so a link never ends up pointing at a non-DOCTOR login.
pub fn lock_user(conn: &MysqlConnection, id: u64) -> anyhow::Result<UserData> {
    lock_user_query(id)
        .get_result::<UserData>(conn)
        .optional()
        .context("DB error")?
        .ok_or_else(|| anyhow!("No such user"))
}

fn lock_doctor_query(
    id: u64,
) -> impl QueryFragment<Mysql> + QueryId + LoadQuery<MysqlConnection, DoctorData> {
    use crate::schema::doctors;

    doctors::table
        .filter(doctors::id.eq(id))
        .filter(doctors::deleted_at.is_null())
        .for_update()
}

/// `check_doctor` plus a row lock held until the transaction ends. Bookings
/// for one doctor take it before the overlap check, so they run one at a time.
pub fn lock_doctor(conn: &MysqlConnection, id: u64) -> anyhow::Result<DoctorData> {
    lock_doctor_query(id)
        .get_result::<DoctorData>(conn)
        .optional()
        .context("DB error")?
        .ok_or_else(|| anyhow!("No such doctor"))
}

fn lock_users_query() -> impl QueryFragment<Mysql> + QueryId + LoadQuery<MysqlConnection, u64> {
    use crate::schema::users;

    users::table.select(users::id).limit(1).for_update()
}

/// Whether any user exists. Locks the first row, or the gap of an empty
/// table, so concurrent callers inside transactions cannot both see "none".
pub fn lock_any_user(conn: &MysqlConnection) -> anyhow::Result<bool> {
    let ids = lock_users_query()
        .get_results::<u64>(conn)
        .context("DB error")?;
    Ok(!ids.is_empty())
}

pub fn check_patient(conn: &MysqlConnection, id: u64) -> anyhow::Result<PatientData> {
    use crate::schema::patients;

    patients::table
        .filter(patients::id.eq(id))
        .filter(patients::deleted_at.is_null())
        .get_result::<PatientData>(conn)
        .optional()
        .context("DB error")?
        .ok_or_else(|| anyhow!("No such patient"))
}

pub fn check_appoint(conn: &MysqlConnection, id: u64) -> anyhow::Result<Appointment> {
    use crate::schema::appointments;

    appointments::table
        .filter(appointments::id.eq(id))
        .filter(appointments::deleted_at.is_null())
        .get_result::<Appointment>(conn)
        .optional()
        .context("DB error")?
        .ok_or_else(|| anyhow!("No such appointment"))
}

/// Doctor profile linked to a DOCTOR login, if any.
pub fn find_doctor_by_user(conn: &MysqlConnection, user_id: u64) -> anyhow::Result<Option<u64>> {
    use crate::schema::doctors;

    doctors::table
        .filter(doctors::user_id.eq(user_id))
        .filter(doctors::deleted_at.is_null())
        .select(doctors::id)
        .get_result::<u64>(conn)
        .optional()
        .context("DB error")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doctor_lock_is_a_locking_read() {
        let sql = diesel::debug_query::<Mysql, _>(&lock_doctor_query(7)).to_string();
        assert!(sql.starts_with("SELECT"), "{}", sql);
        assert!(sql.contains("`doctors`.`id` = ?"), "{}", sql);
        assert!(sql.contains("`doctors`.`deleted_at` IS NULL"), "{}", sql);
        assert!(sql.contains("FOR UPDATE"), "{}", sql);
    }

    #[test]
    fn single_user_lock_is_a_locking_read() {
        let sql = diesel::debug_query::<Mysql, _>(&lock_user_query(3)).to_string();
        assert!(sql.contains("`users`.`id` = ?"), "{}", sql);
        assert!(sql.contains("FOR UPDATE"), "{}", sql);
    }

    #[test]
    fn user_lock_is_a_locking_read() {
        let sql = diesel::debug_query::<Mysql, _>(&lock_users_query()).to_string();
        assert!(sql.contains("FROM `users`"), "{}", sql);
        assert!(sql.contains("LIMIT ?"), "{}", sql);
        assert!(sql.contains("FOR UPDATE"), "{}", sql);
    }
}
