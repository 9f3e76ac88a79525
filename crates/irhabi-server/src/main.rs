use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use irhabi_core::{env, telemetry};
use irhabi_db::{Database, DatabaseConfig};
use irhabi_docs::{
    MemoryNotificationStore, MemoryVersionStore, MongoConfig, MongoNotificationStore,
    MongoVersionStore, NoopPusher, Notifier, OneSignal,
};
use irhabi_server::config::AppConfig;
use irhabi_server::routes;
use irhabi_server::state::AppState;
use irhabi_server::store::{MemoryUserStore, Notifications, Push, Users, Versions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env::load();
    telemetry::init(env::get_bool("APP_DEBUGMODE", true));
    let config = AppConfig::from_env()?;

    let users = match DatabaseConfig::from_env() {
        Ok(db_config) => {
            tracing::info!(url = %db_config.redacted_url(), "Connecting to MySQL");
            let db = Database::connect(&db_config).await?;
            db.migrate().await?;
            Users::Sql(db)
        }
        Err(e) => {
            tracing::warn!("{e}; keeping users in memory");
            Users::Memory(MemoryUserStore::new())
        }
    };

    let (notifications, versions) = if env::get_optional("MGO_HOST").is_some() {
        let notify = MongoConfig::notify_from_env();
        let versioning = MongoConfig::versioning_from_env();
        tracing::info!(database = %notify.database, "Connecting to MongoDB");
        (
            Notifications::Mongo(MongoNotificationStore::connect(&notify).await?),
            Versions::Mongo(MongoVersionStore::connect(&versioning).await?),
        )
    } else {
        tracing::warn!("MGO_HOST not set; keeping notifications and document versions in memory");
        (
            Notifications::Memory(MemoryNotificationStore::new()),
            Versions::Memory(MemoryVersionStore::new()),
        )
    };

    let pusher = match OneSignal::from_env()? {
        Some(onesignal) => Push::OneSignal(onesignal),
        None => {
            tracing::info!("ONES_KEY not set; push delivery disabled");
            Push::Noop(NoopPusher)
        }
    };

    let addr = config.host.clone();
    let state = Arc::new(AppState::new(
        config,
        users,
        Notifier::new(notifications, pusher),
        versions,
    ));
    let app = routes::router(state);

    tracing::info!("Starting server on {addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C handler: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
