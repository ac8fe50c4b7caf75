pub mod domain;
pub mod error;
pub mod gateway;
pub mod types;

pub use error::CoreError;
pub use gateway::Gateway;
