use actix_web::{middleware::Logger, App, HttpServer};
use clinic_server::{config::Settings, database::build_pool};
use env_logger::Env;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let settings = Settings::from_env()?;
    let pool = build_pool(settings.database_url.clone())?;

    let bind = settings.bind_addr.clone();
    log::info!("clinic server listening on {}", bind);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .data(pool.clone())
            .data(settings.clone())
            .configure(clinic_server::config)
    })
    .bind(bind)?
    .run()
    .await?;

    Ok(())
}
