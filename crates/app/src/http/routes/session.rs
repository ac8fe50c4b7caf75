use agora_core::domain::identity::Identity;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::Json;

use crate::http::error::ApiError;
use crate::state::AppState;
use crate::views::navbar::Navbar;

pub async fn get_session(Extension(identity): Extension<Identity>) -> Json<Navbar> {
    Json(Navbar::new(&identity))
}

pub async fn post_sign_out(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<StatusCode, ApiError> {
    state.forum.sign_out(&identity).await?;
    Ok(StatusCode::NO_CONTENT)
}
