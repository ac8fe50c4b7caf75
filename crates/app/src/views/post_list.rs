use agora_core::CoreError;
use agora_core::domain::posts::Post;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::forum::Forum;

const EXCERPT_CHARS: usize = 100;
const DEFAULT_COMMUNITY: &str = "Regular";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostCard {
    pub id: i64,
    pub title: String,
    pub excerpt: String,
    pub image_url: String,
    pub author: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_on: String,
    pub like_count: i64,
    pub comment_count: i64,
    pub community: String,
    pub link: String,
}

impl From<&Post> for PostCard {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id,
            title: post.title.clone(),
            excerpt: excerpt(&post.content),
            image_url: post.image_url.clone(),
            author: post.author.clone(),
            avatar_url: post.avatar_url.clone(),
            created_at: post.created_at,
            created_on: post.created_at.format("%Y-%m-%d").to_string(),
            like_count: post.like_count,
            comment_count: post.comment_count,
            community: community_label(post.community.as_deref()),
            link: format!("/post/{}", post.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostListView {
    pub posts: Vec<PostCard>,
}

impl PostListView {
    pub fn new(posts: &[Post]) -> Self {
        Self {
            posts: posts.iter().map(PostCard::from).collect(),
        }
    }

    pub async fn load(forum: &Forum) -> Result<Self, CoreError> {
        Ok(Self::new(&forum.posts().await?))
    }

    pub async fn load_community(forum: &Forum, community_id: i64) -> Result<Self, CoreError> {
        Ok(Self::new(&forum.community_posts(community_id).await?))
    }
}

fn excerpt(content: &str) -> String {
    match content.char_indices().nth(EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

pub(crate) fn community_label(community: Option<&str>) -> String {
    community
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_COMMUNITY)
        .to_string()
}
