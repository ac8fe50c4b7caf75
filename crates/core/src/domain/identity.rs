use serde::Serialize;
use uuid::Uuid;

use crate::error::CoreError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub display_name: String,
    pub avatar_url: Option<String>,
    #[serde(skip)]
    pub access_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Identity {
    Authenticated(User),
    #[default]
    Anonymous,
}

impl Identity {
    pub fn user(&self) -> Option<&User> {
        match self {
            Identity::Authenticated(user) => Some(user),
            Identity::Anonymous => None,
        }
    }

    pub fn require_user(&self, action: &str) -> Result<&User, CoreError> {
        match self {
            Identity::Authenticated(user) => Ok(user),
            Identity::Anonymous => Err(CoreError::AuthRequired(format!(
                "you must be signed in to {action}"
            ))),
        }
    }

    pub fn access_token(&self) -> Option<&str> {
        self.user().map(|user| user.access_token.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::Authenticated(_))
    }
}
