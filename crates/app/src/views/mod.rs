pub mod comment_thread;
pub mod create_post;
pub mod navbar;
pub mod post_detail;
pub mod post_list;
pub mod vote_bar;
