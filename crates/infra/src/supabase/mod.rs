pub mod auth;
pub mod gateway;
pub mod rest;
pub mod storage;

pub use auth::AuthUser;
pub use gateway::SupabaseGateway;
pub use rest::{SupabaseClient, SupabaseError};
