pub mod vote_poll;
