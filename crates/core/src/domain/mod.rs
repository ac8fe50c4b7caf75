pub mod comments;
pub mod communities;
pub mod identity;
pub mod posts;
pub mod votes;
