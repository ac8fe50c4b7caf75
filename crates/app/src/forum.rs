use std::future::Future;
use std::sync::Arc;

use agora_core::domain::comments::{Comment, CommentNode, NewComment, build_comment_tree};
use agora_core::domain::communities::{Community, NewCommunity};
use agora_core::domain::identity::Identity;
use agora_core::domain::posts::{NewPost, Post, PostDraft};
use agora_core::domain::votes::{Vote, VoteAction, VoteOutcome, VoteValue};
use agora_core::types::object_path::ObjectPath;
use agora_core::{CoreError, Gateway};
use chrono::Utc;
use tracing::{info, warn};

use crate::query_cache::{QueryCache, QueryKey, Resource};

/// Cached reads and invalidating writes over the gateway.
///
/// Writes run on their own task: once started they finish, and invalidate the cache, even
/// when the caller goes away.
#[derive(Clone)]
pub struct Forum {
    gateway: Arc<dyn Gateway>,
    cache: QueryCache,
}

impl Forum {
    pub fn new(gateway: Arc<dyn Gateway>, cache: QueryCache) -> Self {
        Self { gateway, cache }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn gateway(&self) -> &Arc<dyn Gateway> {
        &self.gateway
    }

    pub async fn posts(&self) -> Result<Vec<Post>, CoreError> {
        self.cache
            .read(QueryKey::Posts, || self.gateway.list_posts_with_counts())
            .await
    }

    pub async fn community_posts(&self, community_id: i64) -> Result<Vec<Post>, CoreError> {
        self.cache
            .read(QueryKey::CommunityPosts(community_id), || {
                self.gateway.list_community_posts(community_id)
            })
            .await
    }

    pub async fn post(&self, id: i64) -> Result<Post, CoreError> {
        self.cache
            .read(QueryKey::Post(id), || self.gateway.get_post(id))
            .await
    }

    pub async fn comments(&self, post_id: i64) -> Result<Vec<Comment>, CoreError> {
        self.cache
            .read(QueryKey::Comments(post_id), || {
                self.gateway.list_comments(post_id)
            })
            .await
    }

    pub async fn comment_tree(&self, post_id: i64) -> Result<Vec<CommentNode>, CoreError> {
        let comments = self.comments(post_id).await?;
        build_comment_tree(comments)
    }

    pub async fn votes(&self, post_id: i64) -> Result<Vec<Vote>, CoreError> {
        self.cache
            .read(QueryKey::Votes(post_id), || self.gateway.list_votes(post_id))
            .await
    }

    pub async fn refresh_votes(&self, post_id: i64) -> Result<Vec<Vote>, CoreError> {
        self.cache
            .refresh(QueryKey::Votes(post_id), || self.gateway.list_votes(post_id))
            .await
    }

    pub async fn communities(&self) -> Result<Vec<Community>, CoreError> {
        self.cache
            .read(QueryKey::Communities, || self.gateway.list_communities())
            .await
    }

    pub async fn create_post(
        &self,
        identity: &Identity,
        draft: PostDraft,
    ) -> Result<Post, CoreError> {
        let path = ObjectPath::for_image(
            &draft.title,
            Utc::now().timestamp_millis(),
            &draft.image.file_name,
        )?;
        let gateway = self.gateway.clone();
        let identity = identity.clone();
        self.mutate("create_post", Resource::Posts, async move {
            let image_url = gateway.upload_image(&identity, &path, &draft.image).await?;
            let community = match draft.community_id {
                Some(id) => Some(gateway.get_community(id).await?.name),
                None => None,
            };
            let user = identity.user();
            let post = NewPost {
                title: draft.title,
                content: draft.content,
                image_url,
                avatar_url: user.and_then(|user| user.avatar_url.clone()),
                author: user.map(|user| user.display_name.clone()),
                community_id: draft.community_id,
                community,
                user_id: user.map(|user| user.id),
            };
            gateway.insert_post(&identity, &post).await
        })
        .await
    }

    pub async fn create_comment(
        &self,
        identity: &Identity,
        post_id: i64,
        content: &str,
        parent_comment_id: Option<i64>,
    ) -> Result<Comment, CoreError> {
        let action = if parent_comment_id.is_some() {
            "reply"
        } else {
            "comment"
        };
        let user = identity.require_user(action)?.clone();
        let content = content.trim();
        if content.is_empty() {
            return Err(CoreError::Validation("comment cannot be empty".to_string()));
        }
        let comment = NewComment {
            post_id,
            parent_comment_id,
            content: content.to_string(),
            user_id: user.id,
            author: user.display_name.clone(),
            avatar_url: user.avatar_url.clone(),
        };
        let gateway = self.gateway.clone();
        self.mutate(
            "create_comment",
            Resource::Comments { post_id },
            async move { gateway.insert_comment(&user, &comment).await },
        )
        .await
    }

    /// Casts, changes or retracts the caller's vote on a post.
    ///
    /// The existing vote is read and then written in two separate calls; two concurrent
    /// casts by the same user can interleave, and the gateway's uniqueness constraint on
    /// (post, user) rejects the losing insert.
    pub async fn cast_vote(
        &self,
        identity: &Identity,
        post_id: i64,
        value: VoteValue,
    ) -> Result<VoteOutcome, CoreError> {
        let user = identity.require_user("vote")?.clone();
        let gateway = self.gateway.clone();
        self.mutate("cast_vote", Resource::Votes { post_id }, async move {
            let existing = gateway.find_vote(post_id, user.id).await?;
            let action = VoteAction::plan(existing.as_ref(), value);
            match action {
                VoteAction::Insert(value) => gateway.insert_vote(&user, post_id, value).await?,
                VoteAction::Update { vote_id, value } => {
                    gateway.update_vote(&user, vote_id, value).await?
                }
                VoteAction::Retract { vote_id } => gateway.delete_vote(&user, vote_id).await?,
            }
            Ok(action.outcome())
        })
        .await
    }

    pub async fn create_community(
        &self,
        identity: &Identity,
        community: NewCommunity,
    ) -> Result<Community, CoreError> {
        let user = identity.require_user("create a community")?.clone();
        let gateway = self.gateway.clone();
        self.mutate("create_community", Resource::Communities, async move {
            gateway.insert_community(&user, &community).await
        })
        .await
    }

    /// Ends the session, then clears the whole cache. The cache is shared by every client
    /// of this process, so other viewers lose their cached reads too and refetch on demand.
    pub async fn sign_out(&self, identity: &Identity) -> Result<(), CoreError> {
        if let Some(user) = identity.user() {
            self.gateway.sign_out(user).await?;
            info!(user_id = %user.id, "signed out");
        }
        self.cache.clear().await;
        Ok(())
    }

    async fn mutate<T, Fut>(
        &self,
        action: &'static str,
        resource: Resource,
        operation: Fut,
    ) -> Result<T, CoreError>
    where
        T: Send + 'static,
        Fut: Future<Output = Result<T, CoreError>> + Send + 'static,
    {
        let cache = self.cache.clone();
        let task = tokio::spawn(async move {
            let result = operation.await;
            match &result {
                Ok(_) => {
                    cache.invalidate(resource).await;
                }
                Err(err) => warn!(action, error = %err, "mutation failed"),
            }
            result
        });
        task.await
            .map_err(|err| CoreError::Transport(format!("{action} task failed: {err}")))?
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use agora_core::CoreError;
    use agora_core::domain::communities::NewCommunity;
    use agora_core::domain::identity::Identity;
    use agora_core::domain::posts::{ImageUpload, PostDraft};
    use agora_core::domain::votes::{Vote, VoteOutcome, VoteValue};
    use agora_infra::MemoryGateway;

    use super::Forum;
    use crate::query_cache::{QueryCache, QueryKey, QueryState};

    fn forum(gateway: &Arc<MemoryGateway>) -> Forum {
        Forum::new(gateway.clone(), QueryCache::new(Duration::from_secs(60)))
    }

    async fn signed_in(gateway: &MemoryGateway, token: &str) -> Identity {
        Identity::Authenticated(gateway.register_user(token, "Ada").await)
    }

    fn draft(title: &str, community_id: Option<i64>) -> PostDraft {
        let image = ImageUpload::new("cover.png", "image/png", vec![7, 7, 7]).unwrap();
        PostDraft::new(title, "body", community_id, Some(image)).unwrap()
    }

    #[tokio::test]
    async fn new_comment_is_visible_on_next_read() {
        let gateway = Arc::new(MemoryGateway::new());
        let forum = forum(&gateway);
        let identity = signed_in(&gateway, "t1").await;
        let post = gateway.seed_post("hello", None).await;

        assert!(forum.comments(post.id).await.unwrap().is_empty());
        let created = forum
            .create_comment(&identity, post.id, "  first!  ", None)
            .await
            .unwrap();
        assert_eq!(created.content, "first!");
        assert_eq!(created.author, "Ada");

        let comments = forum.comments(post.id).await.unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].id, created.id);
    }

    #[tokio::test]
    async fn replies_nest_under_their_parent() {
        let gateway = Arc::new(MemoryGateway::new());
        let forum = forum(&gateway);
        let identity = signed_in(&gateway, "t1").await;
        let post = gateway.seed_post("hello", None).await;
        let root = forum
            .create_comment(&identity, post.id, "root", None)
            .await
            .unwrap();
        let reply = forum
            .create_comment(&identity, post.id, "reply", Some(root.id))
            .await
            .unwrap();

        let tree = forum.comment_tree(post.id).await.unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].id(), reply.id);
    }

    #[tokio::test]
    async fn anonymous_reply_is_rejected_before_any_call() {
        let gateway = Arc::new(MemoryGateway::new());
        let forum = forum(&gateway);
        let post = gateway.seed_post("hello", None).await;
        let before = gateway.call_count();
        let err = forum
            .create_comment(&Identity::Anonymous, post.id, "hi", Some(1))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::AuthRequired("you must be signed in to reply".to_string())
        );
        assert_eq!(gateway.call_count(), before);
    }

    #[tokio::test]
    async fn blank_comment_is_a_validation_error() {
        let gateway = Arc::new(MemoryGateway::new());
        let forum = forum(&gateway);
        let identity = signed_in(&gateway, "t1").await;
        let before = gateway.call_count();
        let err = forum
            .create_comment(&identity, 1, "   ", None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(gateway.call_count(), before);
    }

    #[tokio::test]
    async fn same_vote_twice_retracts() {
        let gateway = Arc::new(MemoryGateway::new());
        let forum = forum(&gateway);
        let identity = signed_in(&gateway, "t1").await;
        let post = gateway.seed_post("hello", None).await;

        let first = forum.cast_vote(&identity, post.id, VoteValue::Up).await.unwrap();
        assert_eq!(first, VoteOutcome::Cast(VoteValue::Up));
        assert_eq!(forum.votes(post.id).await.unwrap().len(), 1);

        let second = forum.cast_vote(&identity, post.id, VoteValue::Up).await.unwrap();
        assert_eq!(second, VoteOutcome::Retracted);
        assert!(gateway.vote_rows(post.id).await.is_empty());
        assert!(forum.votes(post.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn opposite_vote_updates_in_place() {
        let gateway = Arc::new(MemoryGateway::new());
        let forum = forum(&gateway);
        let identity = signed_in(&gateway, "t1").await;
        let post = gateway.seed_post("hello", None).await;

        forum.cast_vote(&identity, post.id, VoteValue::Up).await.unwrap();
        let before = gateway.vote_rows(post.id).await;
        let outcome = forum
            .cast_vote(&identity, post.id, VoteValue::Down)
            .await
            .unwrap();
        assert_eq!(outcome, VoteOutcome::Changed(VoteValue::Down));

        let rows = gateway.vote_rows(post.id).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, before[0].id);
        assert_eq!(rows[0].value, VoteValue::Down);
    }

    #[tokio::test]
    async fn vote_refreshes_post_counts() {
        let gateway = Arc::new(MemoryGateway::new());
        let forum = forum(&gateway);
        let identity = signed_in(&gateway, "t1").await;
        let post = gateway.seed_post("hello", None).await;
        assert_eq!(forum.posts().await.unwrap()[0].like_count, 0);
        forum.cast_vote(&identity, post.id, VoteValue::Up).await.unwrap();
        assert_eq!(forum.posts().await.unwrap()[0].like_count, 1);
    }

    #[tokio::test]
    async fn failed_write_keeps_cached_reads() {
        let gateway = Arc::new(MemoryGateway::new());
        let forum = forum(&gateway);
        let identity = signed_in(&gateway, "t1").await;
        let post = gateway.seed_post("hello", None).await;
        forum.cast_vote(&identity, post.id, VoteValue::Up).await.unwrap();
        let cached = forum.votes(post.id).await.unwrap();

        gateway.set_unavailable(true);
        let err = forum
            .cast_vote(&identity, post.id, VoteValue::Down)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Transport(_)));
        assert_eq!(forum.votes(post.id).await.unwrap(), cached);
        assert_eq!(
            forum.cache().state::<Vec<Vote>>(QueryKey::Votes(post.id)).await,
            Some(QueryState::Success(cached))
        );
    }

    #[tokio::test]
    async fn create_post_uploads_and_resolves_community() {
        let gateway = Arc::new(MemoryGateway::new());
        let forum = forum(&gateway);
        let identity = signed_in(&gateway, "t1").await;
        let community = gateway.seed_community("rustaceans").await;
        assert!(forum.posts().await.unwrap().is_empty());

        let post = forum
            .create_post(&identity, draft("Hello World", Some(community.id)))
            .await
            .unwrap();
        assert_eq!(post.community.as_deref(), Some("rustaceans"));
        assert_eq!(post.author.as_deref(), Some("Ada"));
        let object = post
            .image_url
            .strip_prefix("memory://post-images/")
            .unwrap();
        assert!(object.starts_with("hello-world-"));
        assert!(gateway.stored_object(object).await.is_some());

        assert_eq!(forum.posts().await.unwrap().len(), 1);
        assert_eq!(forum.community_posts(community.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_upload_inserts_nothing() {
        let gateway = Arc::new(MemoryGateway::new());
        let forum = forum(&gateway);
        gateway.set_uploads_failing(true);
        let err = forum
            .create_post(&Identity::Anonymous, draft("Hello", None))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Upload(_)));
        assert!(forum.posts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_community_fails_post_creation() {
        let gateway = Arc::new(MemoryGateway::new());
        let forum = forum(&gateway);
        let err = forum
            .create_post(&Identity::Anonymous, draft("Hello", Some(404)))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn missing_post_is_not_found() {
        let gateway = Arc::new(MemoryGateway::new());
        let forum = forum(&gateway);
        assert!(matches!(
            forum.post(99).await,
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn community_creation_requires_identity_and_refreshes_list() {
        let gateway = Arc::new(MemoryGateway::new());
        let forum = forum(&gateway);
        let community = NewCommunity::new("gardening", None).unwrap();
        let err = forum
            .create_community(&Identity::Anonymous, community.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::AuthRequired(_)));

        assert!(forum.communities().await.unwrap().is_empty());
        let identity = signed_in(&gateway, "t1").await;
        forum.create_community(&identity, community).await.unwrap();
        assert_eq!(forum.communities().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn sign_out_clears_cache_and_session() {
        let gateway = Arc::new(MemoryGateway::new());
        let forum = forum(&gateway);
        let identity = signed_in(&gateway, "t1").await;
        forum.communities().await.unwrap();
        assert!(!forum.cache().keys().await.is_empty());

        forum.sign_out(&identity).await.unwrap();
        assert!(forum.cache().keys().await.is_empty());
        assert!(forum.gateway().current_user("t1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn dropped_caller_does_not_cancel_write() {
        let gateway = Arc::new(MemoryGateway::new());
        let forum = forum(&gateway);
        let identity = signed_in(&gateway, "t1").await;
        let post = gateway.seed_post("hello", None).await;
        assert!(forum.comments(post.id).await.unwrap().is_empty());

        let gate = gateway.hold_comment_inserts().await;
        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            forum.create_comment(&identity, post.id, "left early", None),
        )
        .await;
        assert!(abandoned.is_err());
        assert!(forum.comments(post.id).await.unwrap().is_empty());

        // the write is parked in the gateway and outlives its caller
        gate.notify_one();
        let mut seen = false;
        for _ in 0..50 {
            if forum.comments(post.id).await.unwrap().len() == 1 {
                seen = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(seen);
    }
}
