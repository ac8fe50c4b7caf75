use agora_core::domain::identity::Identity;
use agora_core::domain::posts::Post;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::info;

use crate::http::error::ApiError;
use crate::http::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;
use crate::views::comment_thread::CollapseState;
use crate::views::create_post::CreatePostForm;
use crate::views::post_detail::PostDetailView;
use crate::views::post_list::PostListView;

#[derive(Debug, Default, Deserialize)]
pub struct DetailParams {
    pub collapsed: Option<String>,
}

impl DetailParams {
    pub(crate) fn collapse_state(&self) -> Result<CollapseState, ApiError> {
        Ok(self
            .collapsed
            .as_deref()
            .unwrap_or_default()
            .parse::<CollapseState>()?)
    }
}

pub async fn list_posts(State(state): State<AppState>) -> Result<Json<PostListView>, ApiError> {
    Ok(Json(PostListView::load(&state.forum).await?))
}

pub async fn list_community_posts(
    State(state): State<AppState>,
    ApiPath(community_id): ApiPath<i64>,
) -> Result<Json<PostListView>, ApiError> {
    Ok(Json(
        PostListView::load_community(&state.forum, community_id).await?,
    ))
}

pub async fn get_post(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiPath(post_id): ApiPath<i64>,
    ApiQuery(params): ApiQuery<DetailParams>,
) -> Result<Json<PostDetailView>, ApiError> {
    let collapse = params.collapse_state()?;
    let view = PostDetailView::load(&state.forum, &identity, post_id, &collapse).await?;
    Ok(Json(view))
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiJson(form): ApiJson<CreatePostForm>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    let draft = form.into_draft(state.config.max_upload_bytes)?;
    let post = state.forum.create_post(&identity, draft).await?;
    info!(post_id = post.id, "post created");
    Ok((StatusCode::CREATED, Json(post)))
}
