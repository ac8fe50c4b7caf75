pub mod comments;
pub mod communities;
pub mod health;
pub mod posts;
pub mod session;
pub mod votes;
