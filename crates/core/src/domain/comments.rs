use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub parent_comment_id: Option<i64>,
    pub content: String,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub author: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewComment {
    pub post_id: i64,
    pub parent_comment_id: Option<i64>,
    pub content: String,
    pub user_id: Uuid,
    pub author: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub children: Vec<CommentNode>,
}

impl CommentNode {
    pub fn id(&self) -> i64 {
        self.comment.id
    }

    pub fn descendant_count(&self) -> usize {
        let mut count = 0;
        let mut stack: Vec<&CommentNode> = self.children.iter().collect();
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }
}

/// Turns a flat, parent-pointer list of comments for one post into a reply forest.
///
/// Children keep the relative order they have in `comments`. A comment whose parent is not
/// in the list becomes a root. Duplicate ids, replies pointing at a comment of another post
/// and reply cycles are rejected with [`CoreError::DataIntegrity`].
pub fn build_comment_tree(comments: Vec<Comment>) -> Result<Vec<CommentNode>, CoreError> {
    let mut index = HashMap::with_capacity(comments.len());
    for (idx, comment) in comments.iter().enumerate() {
        if index.insert(comment.id, idx).is_some() {
            return Err(CoreError::DataIntegrity(format!(
                "duplicate comment id {}",
                comment.id
            )));
        }
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); comments.len()];
    let mut roots = Vec::new();
    for (idx, comment) in comments.iter().enumerate() {
        let parent_idx = comment
            .parent_comment_id
            .and_then(|parent_id| index.get(&parent_id).copied());
        let Some(parent_idx) = parent_idx else {
            roots.push(idx);
            continue;
        };
        let parent = &comments[parent_idx];
        if parent.post_id != comment.post_id {
            return Err(CoreError::DataIntegrity(format!(
                "comment {} replies to comment {} of post {}",
                comment.id, parent.id, parent.post_id
            )));
        }
        children[parent_idx].push(idx);
    }

    // Post-order walk from the roots; whatever stays unreached sits on a parent cycle.
    let mut order = Vec::with_capacity(comments.len());
    let mut stack: Vec<(usize, bool)> = roots.iter().rev().map(|idx| (*idx, false)).collect();
    while let Some((idx, expanded)) = stack.pop() {
        if expanded {
            order.push(idx);
            continue;
        }
        stack.push((idx, true));
        for child in children[idx].iter().rev() {
            stack.push((*child, false));
        }
    }
    if order.len() != comments.len() {
        return Err(CoreError::DataIntegrity(format!(
            "{} comments form a reply cycle",
            comments.len() - order.len()
        )));
    }

    let mut slots: Vec<Option<Comment>> = comments.into_iter().map(Some).collect();
    let mut built: Vec<Option<CommentNode>> = Vec::with_capacity(slots.len());
    built.resize_with(slots.len(), || None);
    for idx in order {
        let Some(comment) = slots[idx].take() else {
            continue;
        };
        let node_children = children[idx]
            .iter()
            .filter_map(|child| built[*child].take())
            .collect();
        built[idx] = Some(CommentNode {
            comment,
            children: node_children,
        });
    }
    Ok(roots
        .into_iter()
        .filter_map(|idx| built[idx].take())
        .collect())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{Comment, CommentNode, build_comment_tree};
    use crate::error::CoreError;

    fn comment(id: i64, parent: Option<i64>) -> Comment {
        Comment {
            id,
            post_id: 1,
            parent_comment_id: parent,
            content: format!("comment {id}"),
            user_id: None,
            author: "ada".to_string(),
            avatar_url: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + chrono::Duration::minutes(id),
        }
    }

    fn ids(nodes: &[CommentNode]) -> Vec<i64> {
        nodes.iter().map(CommentNode::id).collect()
    }

    fn total(nodes: &[CommentNode]) -> usize {
        nodes.len() + nodes.iter().map(CommentNode::descendant_count).sum::<usize>()
    }

    #[test]
    fn nests_replies_in_input_order() {
        let tree = build_comment_tree(vec![
            comment(1, None),
            comment(2, Some(1)),
            comment(3, Some(1)),
            comment(4, Some(2)),
        ])
        .unwrap();
        assert_eq!(ids(&tree), vec![1]);
        assert_eq!(ids(&tree[0].children), vec![2, 3]);
        assert_eq!(ids(&tree[0].children[0].children), vec![4]);
        assert!(tree[0].children[1].children.is_empty());
    }

    #[test]
    fn orphaned_reply_becomes_root() {
        let tree =
            build_comment_tree(vec![comment(1, None), comment(5, Some(999)), comment(6, None)])
                .unwrap();
        assert_eq!(ids(&tree), vec![1, 5, 6]);
    }

    #[test]
    fn empty_input_yields_empty_forest() {
        assert!(build_comment_tree(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn reply_listed_before_parent_still_nests() {
        let tree = build_comment_tree(vec![comment(2, Some(1)), comment(1, None)]).unwrap();
        assert_eq!(ids(&tree), vec![1]);
        assert_eq!(ids(&tree[0].children), vec![2]);
    }

    #[test]
    fn keeps_every_comment_exactly_once() {
        let input = vec![
            comment(1, None),
            comment(2, Some(1)),
            comment(3, None),
            comment(4, Some(3)),
            comment(5, Some(4)),
            comment(6, Some(42)),
            comment(7, Some(2)),
        ];
        let len = input.len();
        let tree = build_comment_tree(input).unwrap();
        assert_eq!(total(&tree), len);
        assert_eq!(ids(&tree), vec![1, 3, 6]);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = build_comment_tree(vec![comment(1, None), comment(1, None)]).unwrap_err();
        assert!(matches!(err, CoreError::DataIntegrity(_)));
    }

    #[test]
    fn rejects_reply_cycles() {
        let err = build_comment_tree(vec![comment(1, Some(2)), comment(2, Some(1))]).unwrap_err();
        assert!(matches!(err, CoreError::DataIntegrity(_)));
        let err = build_comment_tree(vec![comment(3, Some(3))]).unwrap_err();
        assert!(matches!(err, CoreError::DataIntegrity(_)));
    }

    #[test]
    fn rejects_reply_to_other_post() {
        let mut other = comment(2, Some(1));
        other.post_id = 9;
        let err = build_comment_tree(vec![comment(1, None), other]).unwrap_err();
        assert!(matches!(err, CoreError::DataIntegrity(_)));
    }

    #[test]
    fn deep_chains_do_not_recurse() {
        let mut input = vec![comment(0, None)];
        for id in 1..1_000 {
            input.push(comment(id, Some(id - 1)));
        }
        let tree = build_comment_tree(input).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].descendant_count(), 999);
    }
}
