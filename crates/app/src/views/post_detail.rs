use agora_core::CoreError;
use agora_core::domain::identity::Identity;
use agora_core::domain::posts::Post;
use serde::Serialize;

use crate::forum::Forum;
use crate::views::comment_thread::{CollapseState, CommentThreadView};
use crate::views::post_list::community_label;
use crate::views::vote_bar::VoteBar;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostDetailView {
    pub post: Post,
    pub community: String,
    pub votes: VoteBar,
    pub comments: CommentThreadView,
}

impl PostDetailView {
    pub async fn load(
        forum: &Forum,
        identity: &Identity,
        post_id: i64,
        collapse: &CollapseState,
    ) -> Result<Self, CoreError> {
        let (post, votes, comments) = tokio::try_join!(
            forum.post(post_id),
            VoteBar::load(forum, identity, post_id),
            CommentThreadView::load(forum, identity, post_id, collapse),
        )?;
        let community = community_label(post.community.as_deref());
        Ok(Self {
            post,
            community,
            votes,
            comments,
        })
    }
}
