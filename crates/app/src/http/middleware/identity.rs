use agora_core::domain::identity::Identity;
use axum::body::Body;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use tracing::{debug, warn};

use crate::state::AppState;

pub async fn resolve_identity(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let identity = match bearer_token(&request) {
        Some(token) => match state.forum.gateway().current_user(token).await {
            Ok(Some(user)) => Identity::Authenticated(user),
            Ok(None) => {
                debug!("bearer token rejected; continuing anonymously");
                Identity::Anonymous
            }
            Err(err) => {
                warn!(error = %err, "identity lookup failed; continuing anonymously");
                Identity::Anonymous
            }
        },
        None => Identity::Anonymous,
    };
    request.extensions_mut().insert(identity);
    next.run(request).await
}

fn bearer_token<B>(request: &Request<B>) -> Option<&str> {
    let header = request.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;

    use super::bearer_token;

    fn request(authorization: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/v1/session");
        if let Some(value) = authorization {
            builder = builder.header("authorization", value);
        }
        builder.body(Body::empty()).expect("request")
    }

    #[test]
    fn bearer_token_is_extracted() {
        assert_eq!(bearer_token(&request(Some("Bearer abc"))), Some("abc"));
        assert_eq!(bearer_token(&request(Some("bearer  abc "))), Some("abc"));
    }

    #[test]
    fn other_schemes_and_blank_tokens_are_ignored() {
        assert_eq!(bearer_token(&request(None)), None);
        assert_eq!(bearer_token(&request(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&request(Some("Bearer "))), None);
    }
}
