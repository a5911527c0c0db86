//! Shared application state, constructed once at startup and cloned
//! (cheaply, via `Arc`) into every handler.

use std::sync::Arc;
use vidbridge_store::{CredentialStore, RoomStore, TokenService};

use crate::broadcast_registry::BroadcastRegistry;
use crate::config::RelayConfig;
use crate::connection::ConnectionRegistry;
use crate::persistence_queue::PersistenceQueue;
use crate::rate_limit::{ChatRateLimiter, RestRateLimiter, WebhookRateLimiter};
use crate::room_runtime::RoomRuntime;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub tokens: TokenService,
    pub credentials: Arc<dyn CredentialStore>,
    pub rooms: Arc<dyn RoomStore>,
    pub room_runtime: Arc<RoomRuntime>,
    pub broadcasts: Arc<BroadcastRegistry>,
    pub connections: Arc<ConnectionRegistry>,
    pub chat_rate_limiter: Arc<ChatRateLimiter>,
    pub rest_rate_limiter: Arc<RestRateLimiter>,
    #[allow(dead_code)]
    pub webhook_rate_limiter: Arc<WebhookRateLimiter>,
    pub persistence: PersistenceQueue,
}

impl AppState {
    pub fn new(
        config: RelayConfig,
        tokens: TokenService,
        credentials: Arc<dyn CredentialStore>,
        rooms: Arc<dyn RoomStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            tokens,
            credentials,
            rooms,
            room_runtime: Arc::new(RoomRuntime::new()),
            broadcasts: Arc::new(BroadcastRegistry::new()),
            connections: Arc::new(ConnectionRegistry::new()),
            chat_rate_limiter: Arc::new(crate::rate_limit::new_chat_rate_limiter()),
            rest_rate_limiter: Arc::new(crate::rate_limit::new_rest_rate_limiter()),
            webhook_rate_limiter: Arc::new(crate::rate_limit::new_webhook_rate_limiter()),
            persistence: PersistenceQueue::new(),
        }
    }
}
