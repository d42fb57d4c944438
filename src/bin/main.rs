use actix_web::{web, App, HttpServer};
use tracing::info;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;

use huddle::config;
use huddle::core::db::{self, Store};
use huddle::core::object_storage::ObjectStorage;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let store = Store::open(&config::database_path()).expect("document store must open");
    if config::seed_demo_data() {
        db::seed_demo_data(&store).expect("demo data seeding failed");
    }

    let store = web::Data::new(store);
    let uploader = web::Data::new(ObjectStorage::from_env());

    let address = config::bind_address();
    info!(%address, "listening");

    HttpServer::new(move || {
        App::new()
            .app_data(store.clone())
            .app_data(uploader.clone())
            .wrap(TracingLogger::default())
            .configure(huddle::routes)
    })
    .bind(address)?
    .run()
    .await
}
