use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub enum VoteValue {
    Up,
    Down,
}

impl VoteValue {
    pub fn as_i16(self) -> i16 {
        match self {
            VoteValue::Up => 1,
            VoteValue::Down => -1,
        }
    }
}

impl TryFrom<i16> for VoteValue {
    type Error = CoreError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(VoteValue::Up),
            -1 => Ok(VoteValue::Down),
            other => Err(CoreError::Validation(format!(
                "vote must be 1 or -1, got {other}"
            ))),
        }
    }
}

impl From<VoteValue> for i16 {
    fn from(value: VoteValue) -> Self {
        value.as_i16()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: i64,
    pub post_id: i64,
    pub user_id: Uuid,
    #[serde(rename = "vote")]
    pub value: VoteValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteAction {
    Insert(VoteValue),
    Update { vote_id: i64, value: VoteValue },
    Retract { vote_id: i64 },
}

impl VoteAction {
    pub fn plan(existing: Option<&Vote>, value: VoteValue) -> Self {
        match existing {
            None => VoteAction::Insert(value),
            Some(vote) if vote.value == value => VoteAction::Retract { vote_id: vote.id },
            Some(vote) => VoteAction::Update {
                vote_id: vote.id,
                value,
            },
        }
    }

    pub fn outcome(self) -> VoteOutcome {
        match self {
            VoteAction::Insert(value) => VoteOutcome::Cast(value),
            VoteAction::Update { value, .. } => VoteOutcome::Changed(value),
            VoteAction::Retract { .. } => VoteOutcome::Retracted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum VoteOutcome {
    Cast(VoteValue),
    Changed(VoteValue),
    Retracted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VoteTally {
    pub likes: usize,
    pub dislikes: usize,
}

impl VoteTally {
    pub fn from_votes(votes: &[Vote]) -> Self {
        votes.iter().fold(VoteTally::default(), |mut tally, vote| {
            match vote.value {
                VoteValue::Up => tally.likes += 1,
                VoteValue::Down => tally.dislikes += 1,
            }
            tally
        })
    }
}

pub fn vote_of(votes: &[Vote], user_id: Uuid) -> Option<VoteValue> {
    votes
        .iter()
        .find(|vote| vote.user_id == user_id)
        .map(|vote| vote.value)
}
