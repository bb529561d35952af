use std::sync::Arc;

use actix_web::{middleware, web, App, HttpServer};
use omni_notification_service::{
    handlers, logging, metrics, Config, ConnectionRegistry, EventConsumer, NotificationDispatcher,
    NotificationStore, RedisNotificationStore,
};
use tokio::sync::watch;
use tracing::info;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init_tracing();

    let config = Config::from_env()?;
    info!("starting notification service");

    let store: Arc<dyn NotificationStore> =
        Arc::new(RedisNotificationStore::connect(&config.redis.url).await?);
    info!("connected to notification store at {}", config.redis.url);

    let registry = ConnectionRegistry::new();
    let dispatcher = Arc::new(NotificationDispatcher::new(store, registry.clone()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumer = EventConsumer::new(config.kafka.clone(), dispatcher.clone());
    let consumer_state = consumer.state_watch();
    let consumer_handle = tokio::spawn(consumer.run(shutdown_rx));

    let addr = format!("0.0.0.0:{}", config.app.port);
    info!("HTTP server listening on {}", addr);

    let registry_data = web::Data::new(registry.clone());
    let dispatcher_data = web::Data::new(dispatcher.clone());
    let consumer_state_data = web::Data::new(consumer_state);

    HttpServer::new(move || {
        App::new()
            .app_data(registry_data.clone())
            .app_data(dispatcher_data.clone())
            .app_data(consumer_state_data.clone())
            .wrap(middleware::Logger::default())
            .wrap(metrics::MetricsMiddleware)
            .route("/health", web::get().to(handlers::health))
            .route("/metrics", web::get().to(metrics::serve_metrics))
            .configure(handlers::register_websocket)
            .configure(handlers::register_notifications)
    })
    .bind(&addr)?
    .run()
    .await?;

    // Server is down; stop ingestion and let in-flight work finish.
    let _ = shutdown_tx.send(true);
    let _ = consumer_handle.await;

    info!("notification service stopped");
    Ok(())
}
