use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::comments::{Comment, NewComment};
use crate::domain::communities::{Community, NewCommunity};
use crate::domain::identity::{Identity, User};
use crate::domain::posts::{ImageUpload, NewPost, Post};
use crate::domain::votes::{Vote, VoteValue};
use crate::error::CoreError;
use crate::types::object_path::ObjectPath;

/// The hosted backend: storage, queries, uploads and session lookup.
///
/// Every call is atomic on its own; there is no way to group calls into a transaction.
/// Writes carry the caller's identity so the backend can apply its row-level policies.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn list_posts_with_counts(&self) -> Result<Vec<Post>, CoreError>;

    async fn list_community_posts(&self, community_id: i64) -> Result<Vec<Post>, CoreError>;

    async fn get_post(&self, id: i64) -> Result<Post, CoreError>;

    async fn insert_post(&self, identity: &Identity, post: &NewPost) -> Result<Post, CoreError>;

    async fn upload_image(
        &self,
        identity: &Identity,
        path: &ObjectPath,
        image: &ImageUpload,
    ) -> Result<String, CoreError>;

    async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>, CoreError>;

    async fn insert_comment(&self, user: &User, comment: &NewComment)
    -> Result<Comment, CoreError>;

    async fn list_votes(&self, post_id: i64) -> Result<Vec<Vote>, CoreError>;

    async fn find_vote(&self, post_id: i64, user_id: Uuid) -> Result<Option<Vote>, CoreError>;

    async fn insert_vote(&self, user: &User, post_id: i64, value: VoteValue)
    -> Result<(), CoreError>;

    async fn update_vote(&self, user: &User, vote_id: i64, value: VoteValue)
    -> Result<(), CoreError>;

    async fn delete_vote(&self, user: &User, vote_id: i64) -> Result<(), CoreError>;

    async fn list_communities(&self) -> Result<Vec<Community>, CoreError>;

    async fn get_community(&self, id: i64) -> Result<Community, CoreError>;

    async fn insert_community(
        &self,
        user: &User,
        community: &NewCommunity,
    ) -> Result<Community, CoreError>;

    async fn current_user(&self, access_token: &str) -> Result<Option<User>, CoreError>;

    async fn sign_out(&self, user: &User) -> Result<(), CoreError>;
}
