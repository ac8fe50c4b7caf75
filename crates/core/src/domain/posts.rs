use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

const MAX_TITLE_LEN: usize = 300;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub image_url: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub community_id: Option<i64>,
    #[serde(default)]
    pub community: Option<String>,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub comment_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub image_url: String,
    pub avatar_url: Option<String>,
    pub author: Option<String>,
    pub community_id: Option<i64>,
    pub community: Option<String>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: &str, content_type: &str, bytes: Vec<u8>) -> Result<Self, CoreError> {
        let file_name = file_name.trim();
        if file_name.is_empty() {
            return Err(CoreError::Validation("image file name is required".to_string()));
        }
        let content_type = content_type.trim().to_ascii_lowercase();
        if !content_type.starts_with("image/") {
            return Err(CoreError::Validation(format!(
                "unsupported image type: {content_type}"
            )));
        }
        if bytes.is_empty() {
            return Err(CoreError::Validation("image is empty".to_string()));
        }
        Ok(Self {
            file_name: file_name.to_string(),
            content_type,
            bytes,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub community_id: Option<i64>,
    pub image: ImageUpload,
}

impl PostDraft {
    pub fn new(
        title: &str,
        content: &str,
        community_id: Option<i64>,
        image: Option<ImageUpload>,
    ) -> Result<Self, CoreError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(CoreError::Validation("title is required".to_string()));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(CoreError::Validation(format!(
                "title is longer than {MAX_TITLE_LEN} characters"
            )));
        }
        let content = content.trim();
        if content.is_empty() {
            return Err(CoreError::Validation("content is required".to_string()));
        }
        let image =
            image.ok_or_else(|| CoreError::Validation("cover image is required".to_string()))?;
        Ok(Self {
            title: title.to_string(),
            content: content.to_string(),
            community_id,
            image,
        })
    }
}
