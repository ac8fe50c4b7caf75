use agora_core::domain::identity::User;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use uuid::Uuid;

use crate::supabase::rest::{SupabaseClient, SupabaseError, check_status, read_json};

#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserMetadata {
    pub full_name: Option<String>,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub picture: Option<String>,
}

impl AuthUser {
    pub fn into_user(self, access_token: String) -> User {
        let metadata = self.user_metadata;
        let display_name = [metadata.full_name, metadata.name, self.email]
            .into_iter()
            .flatten()
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
            .unwrap_or_else(|| self.id.to_string());
        User {
            id: self.id,
            display_name,
            avatar_url: metadata.avatar_url.or(metadata.picture),
            access_token,
        }
    }
}

impl SupabaseClient {
    pub async fn fetch_user(&self, access_token: &str) -> Result<Option<AuthUser>, SupabaseError> {
        let response = self
            .request(Method::GET, &self.auth_url("user"), Some(access_token))
            .send()
            .await?;
        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Ok(None);
        }
        Ok(Some(read_json(response).await?))
    }

    pub async fn logout(&self, access_token: &str) -> Result<(), SupabaseError> {
        let response = self
            .request(Method::POST, &self.auth_url("logout"), Some(access_token))
            .send()
            .await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Ok(());
        }
        check_status(response).await?;
        Ok(())
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url())
    }
}
