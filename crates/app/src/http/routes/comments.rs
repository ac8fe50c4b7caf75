use agora_core::domain::comments::Comment;
use agora_core::domain::identity::Identity;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::info;

use crate::http::error::ApiError;
use crate::http::extract::{ApiJson, ApiPath, ApiQuery};
use crate::http::routes::posts::DetailParams;
use crate::state::AppState;
use crate::views::comment_thread::CommentThreadView;

#[derive(Debug, Deserialize)]
pub struct CommentBody {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub parent_comment_id: Option<i64>,
}

pub async fn get_comments(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiPath(post_id): ApiPath<i64>,
    ApiQuery(params): ApiQuery<DetailParams>,
) -> Result<Json<CommentThreadView>, ApiError> {
    let collapse = params.collapse_state()?;
    let view = CommentThreadView::load(&state.forum, &identity, post_id, &collapse).await?;
    Ok(Json(view))
}

pub async fn post_comment(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiPath(post_id): ApiPath<i64>,
    ApiJson(body): ApiJson<CommentBody>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let comment = state
        .forum
        .create_comment(&identity, post_id, &body.content, body.parent_comment_id)
        .await?;
    info!(post_id, comment_id = comment.id, "comment created");
    Ok((StatusCode::CREATED, Json(comment)))
}
