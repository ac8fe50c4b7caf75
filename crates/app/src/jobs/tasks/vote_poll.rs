use tracing::{debug, warn};

use crate::forum::Forum;
use crate::jobs::JobError;
use crate::query_cache::QueryKey;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct VotePollStats {
    pub refreshed: usize,
    pub failed: usize,
    pub evicted: usize,
}

pub async fn run(forum: &Forum) -> Result<VotePollStats, JobError> {
    let mut stats = VotePollStats {
        evicted: forum.cache().evict_idle().await,
        ..VotePollStats::default()
    };
    let post_ids: Vec<i64> = forum
        .cache()
        .active_keys()
        .await
        .into_iter()
        .filter_map(|key| match key {
            QueryKey::Votes(post_id) => Some(post_id),
            _ => None,
        })
        .collect();
    for post_id in post_ids {
        match forum.refresh_votes(post_id).await {
            Ok(votes) => {
                debug!(post_id, votes = votes.len(), "votes refreshed");
                stats.refreshed += 1;
            }
            Err(err) => {
                warn!(post_id, error = %err, "vote refresh failed");
                stats.failed += 1;
            }
        }
    }
    if stats.refreshed == 0 && stats.failed > 0 {
        return Err(JobError::AllRefreshesFailed(stats.failed));
    }
    Ok(stats)
}
