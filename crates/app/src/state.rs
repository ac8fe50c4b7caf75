use std::sync::Arc;

use crate::config::AppConfig;
use crate::forum::Forum;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayMode {
    Supabase,
    Memory,
}

impl GatewayMode {
    pub fn as_str(self) -> &'static str {
        match self {
            GatewayMode::Supabase => "supabase",
            GatewayMode::Memory => "memory",
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub gateway_mode: GatewayMode,
    pub forum: Forum,
}
