pub mod scheduler;
pub mod tasks;

use std::time::Duration;

use agora_core::CoreError;
use thiserror::Error;
use tracing::{debug, info};

use crate::state::AppState;

const FAILURE_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum JobError {
    #[error("forum error: {0}")]
    Forum(#[from] CoreError),
    #[error("all {0} vote refreshes failed")]
    AllRefreshesFailed(usize),
}

pub async fn start(state: AppState) -> Result<(), JobError> {
    let poll_interval = state.config.vote_poll_interval;
    info!(interval_secs = poll_interval.as_secs(), "vote polling starting");
    let forum = state.forum.clone();
    scheduler::run_interval("vote_poll", poll_interval, FAILURE_BACKOFF, move || {
        let forum = forum.clone();
        async move {
            let stats = tasks::vote_poll::run(&forum).await?;
            if stats.refreshed > 0 || stats.failed > 0 {
                debug!(?stats, "vote poll complete");
            }
            Ok(())
        }
    })
    .await
}
