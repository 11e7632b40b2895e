mod config;
mod error;
mod handlers;
mod models;
mod services;
mod views;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use dotenv::dotenv;

use services::{gateway::RemoteGateway, logs::LogQueryAdapter, subscription::SubscriptionWriter};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = config::Config::from_env().context("Failed to load configuration")?;

    // One gateway per process, shared by every worker
    let gateway = RemoteGateway::connect(&config.firebase).context("Failed to initialize backend gateway")?;
    let log_adapter = LogQueryAdapter::new(gateway.documents.clone());
    let subscription_writer = SubscriptionWriter::new(gateway.documents.clone());

    let gateway = web::Data::new(gateway);
    let log_adapter = web::Data::new(log_adapter);
    let subscription_writer = web::Data::new(subscription_writer);

    let bind_address = config.server.bind_address();
    log::info!("Starting ClariaSense web server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST"])
                    .allow_any_header(),
            )
            .app_data(gateway.clone())
            .app_data(log_adapter.clone())
            .app_data(subscription_writer.clone())
            .configure(handlers::routes)
    })
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?
    .run()
    .await?;

    log::info!("Server stopped");
    Ok(())
}
