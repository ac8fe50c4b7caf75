use agora_core::domain::communities::{Community, NewCommunity};
use agora_core::domain::identity::Identity;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::info;

use crate::http::error::ApiError;
use crate::http::extract::ApiJson;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CommunityBody {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

pub async fn list_communities(
    State(state): State<AppState>,
) -> Result<Json<Vec<Community>>, ApiError> {
    Ok(Json(state.forum.communities().await?))
}

pub async fn create_community(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiJson(body): ApiJson<CommunityBody>,
) -> Result<(StatusCode, Json<Community>), ApiError> {
    let community = NewCommunity::new(&body.name, body.description.as_deref())?;
    let community = state.forum.create_community(&identity, community).await?;
    info!(community_id = community.id, name = %community.name, "community created");
    Ok((StatusCode::CREATED, Json(community)))
}
