use agora_core::CoreError;
use agora_core::domain::identity::Identity;
use agora_core::domain::votes::{Vote, VoteTally, VoteValue, vote_of};
use serde::Serialize;

use crate::forum::Forum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoteBar {
    pub likes: usize,
    pub dislikes: usize,
    pub user_vote: Option<VoteValue>,
    pub can_vote: bool,
}

impl VoteBar {
    pub fn new(votes: &[Vote], identity: &Identity) -> Self {
        let tally = VoteTally::from_votes(votes);
        Self {
            likes: tally.likes,
            dislikes: tally.dislikes,
            user_vote: identity.user().and_then(|user| vote_of(votes, user.id)),
            can_vote: identity.is_authenticated(),
        }
    }

    pub async fn load(forum: &Forum, identity: &Identity, post_id: i64) -> Result<Self, CoreError> {
        let votes = forum.votes(post_id).await?;
        Ok(Self::new(&votes, identity))
    }
}

#[cfg(test)]
mod tests {
    use agora_core::domain::identity::{Identity, User};
    use agora_core::domain::votes::{Vote, VoteValue};
    use uuid::Uuid;

    use super::VoteBar;

    fn vote(id: i64, user_id: Uuid, value: VoteValue) -> Vote {
        Vote {
            id,
            post_id: 1,
            user_id,
            value,
        }
    }

    #[test]
    fn counts_both_directions_and_marks_own_vote() {
        let me = User {
            id: Uuid::new_v4(),
            display_name: "me".to_string(),
            avatar_url: None,
            access_token: "t".to_string(),
        };
        let votes = vec![
            vote(1, Uuid::new_v4(), VoteValue::Up),
            vote(2, me.id, VoteValue::Down),
            vote(3, Uuid::new_v4(), VoteValue::Up),
        ];
        let bar = VoteBar::new(&votes, &Identity::Authenticated(me));
        assert_eq!(bar.likes, 2);
        assert_eq!(bar.dislikes, 1);
        assert_eq!(bar.user_vote, Some(VoteValue::Down));
        assert!(bar.can_vote);
    }

    #[test]
    fn anonymous_viewer_cannot_vote() {
        let votes = vec![vote(1, Uuid::new_v4(), VoteValue::Up)];
        let bar = VoteBar::new(&votes, &Identity::Anonymous);
        assert_eq!(bar.user_vote, None);
        assert!(!bar.can_vote);
    }
}
