use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use agora_core::domain::comments::{Comment, NewComment};
use agora_core::domain::communities::{Community, NewCommunity};
use agora_core::domain::identity::{Identity, User};
use agora_core::domain::posts::{ImageUpload, NewPost, Post};
use agora_core::domain::votes::{Vote, VoteValue};
use agora_core::types::object_path::ObjectPath;
use agora_core::{CoreError, Gateway};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, Notify};
use uuid::Uuid;

const PUBLIC_PREFIX: &str = "memory://post-images";

/// In-process gateway holding every table in memory.
///
/// It enforces the invariants the hosted backend enforces: one vote per (post, user),
/// replies on the same post as their parent, existing posts for comments and votes.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    store: Mutex<Store>,
    unavailable: AtomicBool,
    uploads_failing: AtomicBool,
    calls: AtomicUsize,
}

#[derive(Debug, Default)]
struct Store {
    next_id: i64,
    posts: Vec<Post>,
    comments: Vec<Comment>,
    votes: Vec<Vote>,
    communities: Vec<Community>,
    sessions: HashMap<String, User>,
    objects: HashMap<String, ImageUpload>,
    comment_gate: Option<Arc<Notify>>,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn with_counts(&self, post: &Post) -> Post {
        let mut post = post.clone();
        post.like_count = self
            .votes
            .iter()
            .filter(|vote| vote.post_id == post.id && vote.value == VoteValue::Up)
            .count() as i64;
        post.comment_count = self
            .comments
            .iter()
            .filter(|comment| comment.post_id == post.id)
            .count() as i64;
        post
    }

    fn ensure_post(&self, post_id: i64) -> Result<(), CoreError> {
        if self.posts.iter().any(|post| post.id == post_id) {
            Ok(())
        } else {
            Err(CoreError::NotFound(format!("post {post_id}")))
        }
    }

    fn owned_vote(&mut self, user: &User, vote_id: i64) -> Result<&mut Vote, CoreError> {
        self.votes
            .iter_mut()
            .find(|vote| vote.id == vote_id && vote.user_id == user.id)
            .ok_or_else(|| CoreError::NotFound(format!("vote {vote_id}")))
    }
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(access_token: &str, display_name: &str) -> Self {
        let mut store = Store::default();
        store
            .sessions
            .insert(access_token.to_string(), session_user(access_token, display_name));
        Self {
            store: Mutex::new(store),
            ..Self::default()
        }
    }

    pub async fn register_user(&self, access_token: &str, display_name: &str) -> User {
        let user = session_user(access_token, display_name);
        let mut store = self.store.lock().await;
        store.sessions.insert(access_token.to_string(), user.clone());
        user
    }

    pub async fn seed_community(&self, name: &str) -> Community {
        let mut store = self.store.lock().await;
        let community = Community {
            id: store.next_id(),
            name: name.to_string(),
            description: None,
            created_at: Some(Utc::now()),
        };
        store.communities.push(community.clone());
        community
    }

    pub async fn seed_post(&self, title: &str, community_id: Option<i64>) -> Post {
        let mut store = self.store.lock().await;
        let community = community_id.and_then(|id| {
            store
                .communities
                .iter()
                .find(|community| community.id == id)
                .map(|community| community.name.clone())
        });
        let post = Post {
            id: store.next_id(),
            title: title.to_string(),
            content: format!("{title} body"),
            created_at: Utc::now(),
            image_url: format!("{PUBLIC_PREFIX}/{title}.png"),
            avatar_url: None,
            author: None,
            community_id,
            community,
            like_count: 0,
            comment_count: 0,
        };
        store.posts.push(post.clone());
        post
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn set_uploads_failing(&self, failing: bool) {
        self.uploads_failing.store(failing, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn stored_object(&self, path: &str) -> Option<ImageUpload> {
        self.store.lock().await.objects.get(path).cloned()
    }

    /// Parks every later `insert_comment` until the returned gate is notified, one insert per permit.
    pub async fn hold_comment_inserts(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.store.lock().await.comment_gate = Some(gate.clone());
        gate
    }

    pub async fn vote_rows(&self, post_id: i64) -> Vec<Vote> {
        let store = self.store.lock().await;
        store
            .votes
            .iter()
            .filter(|vote| vote.post_id == post_id)
            .cloned()
            .collect()
    }

    fn enter(&self) -> Result<(), CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CoreError::Transport("gateway unavailable".to_string()));
        }
        Ok(())
    }
}

fn session_user(access_token: &str, display_name: &str) -> User {
    User {
        id: Uuid::new_v4(),
        display_name: display_name.to_string(),
        avatar_url: None,
        access_token: access_token.to_string(),
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn list_posts_with_counts(&self) -> Result<Vec<Post>, CoreError> {
        self.enter()?;
        let store = self.store.lock().await;
        let mut posts: Vec<Post> = store.posts.iter().map(|post| store.with_counts(post)).collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(posts)
    }

    async fn list_community_posts(&self, community_id: i64) -> Result<Vec<Post>, CoreError> {
        let posts = self.list_posts_with_counts().await?;
        Ok(posts
            .into_iter()
            .filter(|post| post.community_id == Some(community_id))
            .collect())
    }

    async fn get_post(&self, id: i64) -> Result<Post, CoreError> {
        self.enter()?;
        let store = self.store.lock().await;
        store
            .posts
            .iter()
            .find(|post| post.id == id)
            .map(|post| store.with_counts(post))
            .ok_or_else(|| CoreError::NotFound(format!("post {id}")))
    }

    async fn insert_post(&self, _identity: &Identity, post: &NewPost) -> Result<Post, CoreError> {
        self.enter()?;
        let mut store = self.store.lock().await;
        let row = Post {
            id: store.next_id(),
            title: post.title.clone(),
            content: post.content.clone(),
            created_at: Utc::now(),
            image_url: post.image_url.clone(),
            avatar_url: post.avatar_url.clone(),
            author: post.author.clone(),
            community_id: post.community_id,
            community: post.community.clone(),
            like_count: 0,
            comment_count: 0,
        };
        store.posts.push(row.clone());
        Ok(row)
    }

    async fn upload_image(
        &self,
        _identity: &Identity,
        path: &ObjectPath,
        image: &ImageUpload,
    ) -> Result<String, CoreError> {
        self.enter()
            .map_err(|err| CoreError::Upload(err.to_string()))?;
        if self.uploads_failing.load(Ordering::SeqCst) {
            return Err(CoreError::Upload("storage rejected the object".to_string()));
        }
        let mut store = self.store.lock().await;
        if store.objects.contains_key(path.as_str()) {
            return Err(CoreError::Upload(format!("object {path} already exists")));
        }
        store.objects.insert(path.to_string(), image.clone());
        Ok(format!("{PUBLIC_PREFIX}/{path}"))
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>, CoreError> {
        self.enter()?;
        let store = self.store.lock().await;
        let mut comments: Vec<Comment> = store
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(comments)
    }

    async fn insert_comment(
        &self,
        user: &User,
        comment: &NewComment,
    ) -> Result<Comment, CoreError> {
        self.enter()?;
        let gate = self.store.lock().await.comment_gate.clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let mut store = self.store.lock().await;
        store.ensure_post(comment.post_id)?;
        if let Some(parent_id) = comment.parent_comment_id {
            let parent = store
                .comments
                .iter()
                .find(|existing| existing.id == parent_id)
                .ok_or_else(|| CoreError::NotFound(format!("comment {parent_id}")))?;
            if parent.post_id != comment.post_id {
                return Err(CoreError::DataIntegrity(format!(
                    "comment {parent_id} belongs to post {}",
                    parent.post_id
                )));
            }
        }
        let row = Comment {
            id: store.next_id(),
            post_id: comment.post_id,
            parent_comment_id: comment.parent_comment_id,
            content: comment.content.clone(),
            user_id: Some(user.id),
            author: comment.author.clone(),
            avatar_url: comment.avatar_url.clone(),
            created_at: Utc::now(),
        };
        store.comments.push(row.clone());
        Ok(row)
    }

    async fn list_votes(&self, post_id: i64) -> Result<Vec<Vote>, CoreError> {
        self.enter()?;
        Ok(self.vote_rows(post_id).await)
    }

    async fn find_vote(&self, post_id: i64, user_id: Uuid) -> Result<Option<Vote>, CoreError> {
        self.enter()?;
        let store = self.store.lock().await;
        Ok(store
            .votes
            .iter()
            .find(|vote| vote.post_id == post_id && vote.user_id == user_id)
            .cloned())
    }

    async fn insert_vote(
        &self,
        user: &User,
        post_id: i64,
        value: VoteValue,
    ) -> Result<(), CoreError> {
        self.enter()?;
        let mut store = self.store.lock().await;
        store.ensure_post(post_id)?;
        if store
            .votes
            .iter()
            .any(|vote| vote.post_id == post_id && vote.user_id == user.id)
        {
            return Err(CoreError::DataIntegrity(format!(
                "user {} already voted on post {post_id}",
                user.id
            )));
        }
        let vote = Vote {
            id: store.next_id(),
            post_id,
            user_id: user.id,
            value,
        };
        store.votes.push(vote);
        Ok(())
    }

    async fn update_vote(
        &self,
        user: &User,
        vote_id: i64,
        value: VoteValue,
    ) -> Result<(), CoreError> {
        self.enter()?;
        let mut store = self.store.lock().await;
        store.owned_vote(user, vote_id)?.value = value;
        Ok(())
    }

    async fn delete_vote(&self, user: &User, vote_id: i64) -> Result<(), CoreError> {
        self.enter()?;
        let mut store = self.store.lock().await;
        store.owned_vote(user, vote_id)?;
        store.votes.retain(|vote| vote.id != vote_id);
        Ok(())
    }

    async fn list_communities(&self) -> Result<Vec<Community>, CoreError> {
        self.enter()?;
        let store = self.store.lock().await;
        let mut communities = store.communities.clone();
        communities.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(communities)
    }

    async fn get_community(&self, id: i64) -> Result<Community, CoreError> {
        self.enter()?;
        let store = self.store.lock().await;
        store
            .communities
            .iter()
            .find(|community| community.id == id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("community {id}")))
    }

    async fn insert_community(
        &self,
        _user: &User,
        community: &NewCommunity,
    ) -> Result<Community, CoreError> {
        self.enter()?;
        let mut store = self.store.lock().await;
        if store
            .communities
            .iter()
            .any(|existing| existing.name.eq_ignore_ascii_case(&community.name))
        {
            return Err(CoreError::DataIntegrity(format!(
                "community {} already exists",
                community.name
            )));
        }
        let row = Community {
            id: store.next_id(),
            name: community.name.clone(),
            description: community.description.clone(),
            created_at: Some(Utc::now()),
        };
        store.communities.push(row.clone());
        Ok(row)
    }

    async fn current_user(&self, access_token: &str) -> Result<Option<User>, CoreError> {
        self.enter()?;
        let store = self.store.lock().await;
        Ok(store.sessions.get(access_token).cloned())
    }

    async fn sign_out(&self, user: &User) -> Result<(), CoreError> {
        self.enter()?;
        let mut store = self.store.lock().await;
        store.sessions.remove(&user.access_token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use agora_core::domain::comments::NewComment;
    use agora_core::domain::votes::VoteValue;
    use agora_core::{CoreError, Gateway};

    use std::sync::Arc;
    use std::time::Duration;

    use agora_core::domain::identity::User;

    use super::MemoryGateway;

    fn comment(post_id: i64, parent_comment_id: Option<i64>, content: &str, user: &User) -> NewComment {
        NewComment {
            post_id,
            parent_comment_id,
            content: content.to_string(),
            user_id: user.id,
            author: user.display_name.clone(),
            avatar_url: None,
        }
    }

    #[tokio::test]
    async fn second_vote_row_is_rejected() {
        let gateway = MemoryGateway::new();
        let user = gateway.register_user("t1", "Ada").await;
        let post = gateway.seed_post("hello", None).await;
        gateway.insert_vote(&user, post.id, VoteValue::Up).await.unwrap();
        let err = gateway
            .insert_vote(&user, post.id, VoteValue::Down)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::DataIntegrity(_)));
        assert_eq!(gateway.vote_rows(post.id).await.len(), 1);
    }

    #[tokio::test]
    async fn reply_must_stay_on_parent_post() {
        let gateway = MemoryGateway::new();
        let user = gateway.register_user("t1", "Ada").await;
        let first = gateway.seed_post("first", None).await;
        let second = gateway.seed_post("second", None).await;
        let root = gateway
            .insert_comment(
                &user,
                &NewComment {
                    post_id: first.id,
                    parent_comment_id: None,
                    content: "root".to_string(),
                    user_id: user.id,
                    author: user.display_name.clone(),
                    avatar_url: None,
                },
            )
            .await
            .unwrap();
        let err = gateway
            .insert_comment(
                &user,
                &NewComment {
                    post_id: second.id,
                    parent_comment_id: Some(root.id),
                    content: "stray".to_string(),
                    user_id: user.id,
                    author: user.display_name.clone(),
                    avatar_url: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::DataIntegrity(_)));
    }

    #[tokio::test]
    async fn posts_carry_aggregated_counts() {
        let gateway = MemoryGateway::new();
        let ada = gateway.register_user("t1", "Ada").await;
        let bob = gateway.register_user("t2", "Bob").await;
        let post = gateway.seed_post("hello", None).await;
        gateway.insert_vote(&ada, post.id, VoteValue::Up).await.unwrap();
        gateway.insert_vote(&bob, post.id, VoteValue::Down).await.unwrap();
        let posts = gateway.list_posts_with_counts().await.unwrap();
        assert_eq!(posts[0].like_count, 1);
        assert_eq!(posts[0].comment_count, 0);
    }

    #[tokio::test]
    async fn single_post_carries_counts() {
        let gateway = MemoryGateway::new();
        let ada = gateway.register_user("t1", "Ada").await;
        let post = gateway.seed_post("hello", None).await;
        gateway.insert_vote(&ada, post.id, VoteValue::Up).await.unwrap();
        gateway.insert_comment(&ada, &comment(post.id, None, "hi", &ada)).await.unwrap();
        let fetched = gateway.get_post(post.id).await.unwrap();
        assert_eq!(fetched.like_count, 1);
        assert_eq!(fetched.comment_count, 1);
    }

    #[tokio::test]
    async fn held_comment_insert_waits_for_the_gate() {
        let gateway = Arc::new(MemoryGateway::new());
        let ada = gateway.register_user("t1", "Ada").await;
        let post = gateway.seed_post("hello", None).await;
        let gate = gateway.hold_comment_inserts().await;

        let writer = {
            let gateway = gateway.clone();
            let ada = ada.clone();
            tokio::spawn(async move {
                gateway.insert_comment(&ada, &comment(post.id, None, "late", &ada)).await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!writer.is_finished());
        assert!(gateway.list_comments(post.id).await.unwrap().is_empty());

        gate.notify_one();
        writer.await.unwrap().unwrap();
        assert_eq!(gateway.list_comments(post.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn seeded_session_resolves_without_registration() {
        let gateway = MemoryGateway::with_session("dev", "Local Dev");
        let user = gateway.current_user("dev").await.unwrap().unwrap();
        assert_eq!(user.display_name, "Local Dev");
        assert_eq!(user.access_token, "dev");
    }

    #[tokio::test]
    async fn unavailable_gateway_fails_every_call() {
        let gateway = MemoryGateway::new();
        gateway.set_unavailable(true);
        assert!(matches!(
            gateway.list_communities().await,
            Err(CoreError::Transport(_))
        ));
        assert_eq!(gateway.call_count(), 1);
    }

    #[tokio::test]
    async fn unknown_token_has_no_user() {
        let gateway = MemoryGateway::new();
        gateway.register_user("t1", "Ada").await;
        assert!(gateway.current_user("nope").await.unwrap().is_none());
        assert_eq!(
            gateway.current_user("t1").await.unwrap().unwrap().display_name,
            "Ada"
        );
    }
}
