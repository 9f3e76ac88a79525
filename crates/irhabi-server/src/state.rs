use irhabi_docs::{MemoryNotificationStore, MemoryVersionStore, NoopPusher, Notifier};
use secrecy::ExposeSecret;

use crate::auth::JwtKey;
use crate::config::AppConfig;
use crate::store::{MemoryUserStore, Notifications, Push, Users, Versions};

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub config: AppConfig,
    /// Signs tokens at login; verification happens in the router middleware.
    pub jwt: JwtKey,
    pub users: Users,
    pub notifier: Notifier<Notifications, Push>,
    pub versions: Versions,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        users: Users,
        notifier: Notifier<Notifications, Push>,
        versions: Versions,
    ) -> Self {
        Self {
            jwt: JwtKey::from_secret(config.jwt_secret.expose_secret().as_bytes()),
            config,
            users,
            notifier,
            versions,
        }
    }

    /// Every backend in process memory, pushes disabled.
    pub fn in_memory(config: AppConfig) -> Self {
        Self::new(
            config,
            Users::Memory(MemoryUserStore::new()),
            Notifier::new(
                Notifications::Memory(MemoryNotificationStore::new()),
                Push::Noop(NoopPusher),
            ),
            Versions::Memory(MemoryVersionStore::new()),
        )
    }
}
