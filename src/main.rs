use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer};

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod routes;
mod rules;
mod services;
mod utils;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::routes::{Limiters, build_limiter};
use crate::services::face::{FaceVerifier, HttpFaceVerifier};
use crate::services::storage::SelfieStorage;
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config).await?;

    let face: Arc<dyn FaceVerifier> = Arc::new(HttpFaceVerifier::new(
        config.face_service_url.clone(),
        config.face_match_threshold,
        config.face_service_timeout_secs,
    )?);
    let face = Data::from(face);
    let storage = Data::new(SelfieStorage::new(&config)?);

    // One limiter per class, shared by every worker
    let limiters = Arc::new(Limiters {
        login: build_limiter(config.rate_login_per_min)?,
        protected: build_limiter(config.rate_protected_per_min)?,
    });

    let server_addr = config.server_addr.clone();
    let api_prefix = config.api_prefix.clone();
    let server_pool = pool.clone();

    info!(addr = %server_addr, prefix = %api_prefix, "Listening");

    HttpServer::new(move || {
        let limiters = limiters.clone();
        let api_prefix = api_prefix.clone();
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard matches the JS/CSS assets
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(server_pool.clone()))
            .app_data(Data::new(config.clone()))
            .app_data(face.clone())
            .app_data(storage.clone())
            .configure(move |cfg| routes::configure(cfg, &api_prefix, &limiters))
    })
    .bind(server_addr)?
    .run()
    .await?;

    pool.close().await;
    info!("Server stopped");

    Ok(())
}
