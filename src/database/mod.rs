pub mod assert;

use crate::DbPool;
use actix_web::{error::BlockingError, web};
use anyhow::{anyhow, Context};
use diesel::{r2d2::ConnectionManager, MysqlConnection, QueryResult, RunQueryDsl};
use r2d2::PooledConnection;

no_arg_sql_function!(
    last_insert_id,
    diesel::sql_types::Unsigned<diesel::sql_types::Bigint>
);

pub fn build_pool<S: Into<String>>(database_url: S) -> anyhow::Result<DbPool> {
    let manager = ConnectionManager::<MysqlConnection>::new(database_url);
    r2d2::Pool::builder()
        .build(manager)
        .context("Failed to create pool")
}

pub fn get_db_conn(
    pool: &DbPool,
) -> anyhow::Result<PooledConnection<ConnectionManager<MysqlConnection>>> {
    pool.get().context("DB connection")
}

/// Runs `f` with a pooled connection on the blocking thread pool.
pub async fn with_conn<F, T>(pool: &web::Data<DbPool>, f: F) -> anyhow::Result<T>
where
    F: FnOnce(&MysqlConnection) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let conn = get_db_conn(pool)?;
    web::block(move || f(&conn)).await.map_err(|err| match err {
        BlockingError::Error(err) => err,
        BlockingError::Canceled => anyhow!("DB worker canceled"),
    })
}

/// Id of the row inserted last on this connection. Only valid inside the
/// same transaction as the insert.
pub fn get_last_insert_id(conn: &MysqlConnection) -> QueryResult<u64> {
    diesel::select(last_insert_id).get_result::<u64>(conn)
}
