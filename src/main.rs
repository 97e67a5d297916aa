use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use opensplit::{routes, LedgerService, MongoGroupStore, Settings};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::new()?;
    init_tracing(&settings.log.level);
    info!(database = %settings.mongodb.database, "connecting to mongodb");

    let store = MongoGroupStore::connect(&settings.mongodb.uri, &settings.mongodb.database).await?;
    info!("Connected");
    let service = web::Data::new(LedgerService::new(Arc::new(store)));

    let address = settings.bind_address();
    info!(host = %address.0, port = address.1, "listening");
    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(Logger::default())
            .app_data(service.clone())
            .configure(routes::configure)
    })
    .bind(address)?
    .run()
    .await?;

    Ok(())
}
