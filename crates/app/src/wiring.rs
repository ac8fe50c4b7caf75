use std::sync::Arc;

use agora_core::Gateway;
use agora_infra::{MemoryGateway, SupabaseClient, SupabaseGateway};
use reqwest::Client;
use thiserror::Error;
use tracing::info;

use crate::config::{AppConfig, ConfigError};
use crate::forum::Forum;
use crate::query_cache::QueryCache;
use crate::state::{AppState, GatewayMode};

#[derive(Debug, Error)]
pub enum WiringError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("http client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

pub fn build_state(config: AppConfig, offline: bool) -> Result<AppState, WiringError> {
    let (gateway, gateway_mode): (Arc<dyn Gateway>, GatewayMode) = if offline {
        info!(user = %config.offline_user, "using in-memory gateway with a local session");
        let gateway = MemoryGateway::with_session(&config.offline_token, &config.offline_user);
        (Arc::new(gateway), GatewayMode::Memory)
    } else {
        let (url, anon_key) = config.supabase()?;
        let http = Client::builder().timeout(config.request_timeout).build()?;
        info!(supabase_url = %url, bucket = %config.storage_bucket, "using supabase gateway");
        let client = SupabaseClient::new(http, url, anon_key.to_string());
        (
            Arc::new(SupabaseGateway::new(client, config.storage_bucket.clone())),
            GatewayMode::Supabase,
        )
    };
    Ok(with_gateway(config, gateway, gateway_mode))
}

pub fn with_gateway(
    config: AppConfig,
    gateway: Arc<dyn Gateway>,
    gateway_mode: GatewayMode,
) -> AppState {
    let cache = QueryCache::new(config.query_stale_time);
    AppState {
        config: Arc::new(config),
        gateway_mode,
        forum: Forum::new(gateway, cache),
    }
}
