use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::http::middleware::identity;
use crate::http::routes::{comments, communities, health, posts, session, votes};
use crate::state::AppState;

const BODY_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build(state: AppState) -> Router {
    let cors = build_cors(&state);
    let body_limit = body_limit(state.config.max_upload_bytes);
    let mut router = Router::new()
        .route("/v1/session", get(session::get_session))
        .route("/v1/session/sign-out", post(session::post_sign_out))
        .route("/v1/posts", get(posts::list_posts).post(posts::create_post))
        .route("/v1/posts/{id}", get(posts::get_post))
        .route(
            "/v1/posts/{id}/comments",
            get(comments::get_comments).post(comments::post_comment),
        )
        .route("/v1/posts/{id}/votes", get(votes::get_votes))
        .route("/v1/posts/{id}/vote", put(votes::put_vote))
        .route(
            "/v1/communities",
            get(communities::list_communities).post(communities::create_community),
        )
        .route(
            "/v1/communities/{id}/posts",
            get(posts::list_community_posts),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            identity::resolve_identity,
        ))
        .route("/health", get(health::health))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state);
    if let Some(cors) = cors {
        router = router.layer(cors);
    }
    router
}

fn body_limit(max_upload_bytes: usize) -> usize {
    max_upload_bytes
        .saturating_add(max_upload_bytes / 3)
        .saturating_add(BODY_OVERHEAD_BYTES)
}

fn build_cors(state: &AppState) -> Option<CorsLayer> {
    let mut origins = Vec::new();
    let mut allow_any = false;
    for origin in state.config.cors_allow_origins.iter() {
        if is_wildcard_origin(origin) {
            allow_any = true;
            break;
        }
        match HeaderValue::from_str(origin.trim()) {
            Ok(value) => origins.push(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "invalid CORS origin ignored");
            }
        }
    }

    let cors = CorsLayer::new().allow_methods([
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::OPTIONS,
    ]);

    if !should_enable_cors(allow_any, &origins) {
        return None;
    }

    if allow_any {
        Some(cors.allow_origin(Any).allow_headers(Any))
    } else {
        Some(
            cors.allow_origin(AllowOrigin::list(origins))
                .allow_credentials(true)
                .allow_headers([CONTENT_TYPE, AUTHORIZATION]),
        )
    }
}

fn is_wildcard_origin(origin: &str) -> bool {
    origin.trim() == "*"
}

fn should_enable_cors(allow_any: bool, origins: &[HeaderValue]) -> bool {
    allow_any || !origins.is_empty()
}
