use agora_core::domain::comments::{Comment, NewComment};
use agora_core::domain::communities::{Community, NewCommunity};
use agora_core::domain::identity::{Identity, User};
use agora_core::domain::posts::{ImageUpload, NewPost, Post};
use agora_core::domain::votes::{Vote, VoteValue};
use agora_core::types::object_path::ObjectPath;
use agora_core::{CoreError, Gateway};
use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::supabase::rest::{SupabaseClient, eq};

const POSTS: &str = "posts";
const COMMENTS: &str = "comments";
const VOTES: &str = "votes";
const COMMUNITIES: &str = "communities";
const POSTS_WITH_COUNTS: &str = "get_posts_with_counts";

#[derive(Debug, Clone)]
pub struct SupabaseGateway {
    client: SupabaseClient,
    bucket: String,
}

impl SupabaseGateway {
    pub fn new(client: SupabaseClient, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[derive(Debug, Serialize)]
struct VoteRow {
    post_id: i64,
    user_id: Uuid,
    vote: VoteValue,
}

#[derive(Debug, Serialize)]
struct VotePatch {
    vote: VoteValue,
}

#[async_trait]
impl Gateway for SupabaseGateway {
    async fn list_posts_with_counts(&self) -> Result<Vec<Post>, CoreError> {
        Ok(self.client.rpc(POSTS_WITH_COUNTS, &[]).await?)
    }

    async fn list_community_posts(&self, community_id: i64) -> Result<Vec<Post>, CoreError> {
        Ok(self
            .client
            .rpc(POSTS_WITH_COUNTS, &[eq("community_id", community_id)])
            .await?)
    }

    async fn get_post(&self, id: i64) -> Result<Post, CoreError> {
        let rows: Vec<Post> = self.client.rpc(POSTS_WITH_COUNTS, &[eq("id", id)]).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| CoreError::NotFound(format!("post {id}")))
    }

    async fn insert_post(&self, identity: &Identity, post: &NewPost) -> Result<Post, CoreError> {
        Ok(self
            .client
            .insert(identity.access_token(), POSTS, post)
            .await?)
    }

    async fn upload_image(
        &self,
        identity: &Identity,
        path: &ObjectPath,
        image: &ImageUpload,
    ) -> Result<String, CoreError> {
        self.client
            .upload_object(
                identity.access_token(),
                &self.bucket,
                path.as_str(),
                &image.content_type,
                image.bytes.clone(),
            )
            .await
            .map_err(|err| CoreError::Upload(err.to_string()))?;
        Ok(self.client.public_object_url(&self.bucket, path.as_str()))
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>, CoreError> {
        Ok(self
            .client
            .select(COMMENTS, &[eq("post_id", post_id)], Some("created_at.asc,id.asc"))
            .await?)
    }

    async fn insert_comment(
        &self,
        user: &User,
        comment: &NewComment,
    ) -> Result<Comment, CoreError> {
        Ok(self
            .client
            .insert(Some(user.access_token.as_str()), COMMENTS, comment)
            .await?)
    }

    async fn list_votes(&self, post_id: i64) -> Result<Vec<Vote>, CoreError> {
        Ok(self
            .client
            .select(VOTES, &[eq("post_id", post_id)], Some("id.asc"))
            .await?)
    }

    async fn find_vote(&self, post_id: i64, user_id: Uuid) -> Result<Option<Vote>, CoreError> {
        let rows: Vec<Vote> = self
            .client
            .select(
                VOTES,
                &[eq("post_id", post_id), eq("user_id", user_id)],
                None,
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_vote(
        &self,
        user: &User,
        post_id: i64,
        value: VoteValue,
    ) -> Result<(), CoreError> {
        let row = VoteRow {
            post_id,
            user_id: user.id,
            vote: value,
        };
        let _: Vote = self
            .client
            .insert(Some(user.access_token.as_str()), VOTES, &row)
            .await?;
        Ok(())
    }

    async fn update_vote(
        &self,
        user: &User,
        vote_id: i64,
        value: VoteValue,
    ) -> Result<(), CoreError> {
        self.client
            .update(
                Some(user.access_token.as_str()),
                VOTES,
                &[eq("id", vote_id)],
                &VotePatch { vote: value },
            )
            .await?;
        Ok(())
    }

    async fn delete_vote(&self, user: &User, vote_id: i64) -> Result<(), CoreError> {
        self.client
            .delete(Some(user.access_token.as_str()), VOTES, &[eq("id", vote_id)])
            .await?;
        Ok(())
    }

    async fn list_communities(&self) -> Result<Vec<Community>, CoreError> {
        Ok(self.client.select(COMMUNITIES, &[], Some("id.desc")).await?)
    }

    async fn get_community(&self, id: i64) -> Result<Community, CoreError> {
        let rows: Vec<Community> = self
            .client
            .select(COMMUNITIES, &[eq("id", id)], None)
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| CoreError::NotFound(format!("community {id}")))
    }

    async fn insert_community(
        &self,
        user: &User,
        community: &NewCommunity,
    ) -> Result<Community, CoreError> {
        Ok(self
            .client
            .insert(Some(user.access_token.as_str()), COMMUNITIES, community)
            .await?)
    }

    async fn current_user(&self, access_token: &str) -> Result<Option<User>, CoreError> {
        let user = self.client.fetch_user(access_token).await?;
        Ok(user.map(|user| user.into_user(access_token.to_string())))
    }

    async fn sign_out(&self, user: &User) -> Result<(), CoreError> {
        self.client.logout(&user.access_token).await?;
        Ok(())
    }
}
