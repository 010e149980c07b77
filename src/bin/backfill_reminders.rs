//! Rebuilds the reminder row of every live future appointment.

use anyhow::bail;
use chrono::Utc;
use clinic_server::{
    config::Settings,
    database::{build_pool, get_db_conn},
    reminder::sync::backfill,
};
use env_logger::Env;

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let settings = Settings::from_env()?;
    let pool = build_pool(settings.database_url.clone())?;
    let conn = get_db_conn(&pool)?;

    let report = backfill(&conn, settings.reminder_lead(), Utc::now().naive_utc())?;
    println!(
        "scanned {}, upserted {}, failed {}",
        report.scanned, report.upserted, report.failed
    );

    if report.failed > 0 {
        bail!("{} reminders could not be written", report.failed);
    }
    Ok(())
}
