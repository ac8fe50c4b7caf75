use std::collections::HashSet;
use std::str::FromStr;

use agora_core::CoreError;
use agora_core::domain::comments::{Comment, CommentNode};
use agora_core::domain::identity::Identity;
use serde::Serialize;

use crate::forum::Forum;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollapseState(HashSet<i64>);

impl CollapseState {
    pub fn is_collapsed(&self, comment_id: i64) -> bool {
        self.0.contains(&comment_id)
    }
}

impl FromStr for CollapseState {
    type Err = CoreError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut ids = HashSet::new();
        for part in raw.split(',').map(str::trim).filter(|part| !part.is_empty()) {
            let id = part
                .parse()
                .map_err(|_| CoreError::Validation(format!("invalid comment id: {part}")))?;
            ids.insert(id);
        }
        Ok(Self(ids))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentNodeView {
    #[serde(flatten)]
    pub comment: Comment,
    pub collapsed: bool,
    pub reply_count: usize,
    pub can_reply: bool,
    pub children: Vec<CommentNodeView>,
}

impl CommentNodeView {
    fn new(node: CommentNode, collapse: &CollapseState, can_reply: bool) -> Self {
        let collapsed = collapse.is_collapsed(node.id());
        let reply_count = node.descendant_count();
        let children = if collapsed {
            Vec::new()
        } else {
            node.children
                .into_iter()
                .map(|child| CommentNodeView::new(child, collapse, can_reply))
                .collect()
        };
        Self {
            comment: node.comment,
            collapsed,
            reply_count,
            can_reply,
            children,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentThreadView {
    pub post_id: i64,
    pub total: usize,
    pub can_reply: bool,
    pub comments: Vec<CommentNodeView>,
}

impl CommentThreadView {
    pub fn new(
        post_id: i64,
        forest: Vec<CommentNode>,
        identity: &Identity,
        collapse: &CollapseState,
    ) -> Self {
        let can_reply = identity.is_authenticated();
        let total = forest
            .iter()
            .map(|root| 1 + root.descendant_count())
            .sum();
        Self {
            post_id,
            total,
            can_reply,
            comments: forest
                .into_iter()
                .map(|root| CommentNodeView::new(root, collapse, can_reply))
                .collect(),
        }
    }

    pub async fn load(
        forum: &Forum,
        identity: &Identity,
        post_id: i64,
        collapse: &CollapseState,
    ) -> Result<Self, CoreError> {
        let forest = forum.comment_tree(post_id).await?;
        Ok(Self::new(post_id, forest, identity, collapse))
    }
}
