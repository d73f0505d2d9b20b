use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use dotenvy::dotenv;

use worktime::config::Config;
use worktime::db::init_db;
use worktime::directory::{DbDirectory, filter};
use worktime::docs::ApiDoc;
use worktime::leave::allocator::LeaveAllocator;
use worktime::leave::ledger::MySqlLeaveLedger;
use worktime::leave::settings::SettingsStore;
use worktime::leave::slots::MySqlSlotRegistry;
use worktime::routes;

use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "worktime service"
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    let config = Config::from_env();

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
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

    let pool = init_db(&config.database_url).await;

    let directory = Arc::new(DbDirectory::new(pool.clone()));
    let settings = SettingsStore::new(pool.clone());
    let slots = Arc::new(MySqlSlotRegistry::new(pool.clone(), settings.clone()));
    let ledger = Arc::new(MySqlLeaveLedger::new(pool.clone()));
    let allocator = Data::new(LeaveAllocator::new(slots, ledger, directory.clone()));

    let pool_for_filter_warmup = pool.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = filter::warmup_user_filter(&pool_for_filter_warmup, 100).await {
            eprintln!("Failed to warmup user id filter: {:?}", e);
        }
    });

    let directory_for_warmup = directory.clone();
    actix_web::rt::spawn(async move {
        // Warm the last 30 days of recent users in batches of 250
        if let Err(e) = directory_for_warmup.warmup_cache(30, 250).await {
            eprintln!("Failed to warmup directory cache: {:?}", e);
        }
    });

    let server_addr = config.server_addr.clone();
    let config_data = config.clone();
    let settings_data = Data::new(settings);
    let directory_data = Data::from(directory);

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(config.clone()))
            .app_data(allocator.clone())
            .app_data(settings_data.clone())
            .app_data(directory_data.clone())
            .service(index)
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(server_addr)?
    .run()
    .await
}
