#[macro_use]
extern crate diesel;

pub mod admin;
pub mod appointment;
pub mod auth;
pub mod config;
pub mod dashboard;
pub mod database;
pub mod doctor;
pub mod models;
pub mod patient;
pub mod protocol;
pub mod reminder;
pub mod schema;
pub mod utils;

use actix_web::web;
use diesel::{r2d2::ConnectionManager, MysqlConnection};

pub type DbPool = r2d2::Pool<ConnectionManager<MysqlConnection>>;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg
        // login & session
        .service(web::scope("/auth").configure(auth::config))
        // appointments & calendar
        .service(web::scope("/appointment").configure(appointment::config))
        .service(web::scope("/dashboard").configure(dashboard::config))
        // pickers
        .service(web::scope("/patient").configure(patient::config))
        .service(web::scope("/doctor").configure(doctor::config))
        // administration
        .service(web::scope("/admin").configure(admin::config))
        .service(web::scope("/reminder").configure(reminder::config));
}
