use agora_core::domain::identity::Identity;
use agora_core::domain::votes::{VoteOutcome, VoteValue};
use axum::extract::{Extension, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::http::error::ApiError;
use crate::http::extract::{ApiJson, ApiPath};
use crate::state::AppState;
use crate::views::vote_bar::VoteBar;

#[derive(Debug, Deserialize)]
pub struct VoteBody {
    pub vote: VoteValue,
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    #[serde(flatten)]
    pub outcome: VoteOutcome,
    pub votes: VoteBar,
}

pub async fn get_votes(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiPath(post_id): ApiPath<i64>,
) -> Result<Json<VoteBar>, ApiError> {
    Ok(Json(VoteBar::load(&state.forum, &identity, post_id).await?))
}

pub async fn put_vote(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiPath(post_id): ApiPath<i64>,
    ApiJson(body): ApiJson<VoteBody>,
) -> Result<Json<VoteResponse>, ApiError> {
    let outcome = state.forum.cast_vote(&identity, post_id, body.vote).await?;
    let votes = VoteBar::load(&state.forum, &identity, post_id).await?;
    Ok(Json(VoteResponse { outcome, votes }))
}
