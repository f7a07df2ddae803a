use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// A poll with its options embedded (stored in MongoDB).
///
/// Embedding keeps the lifecycle transactional without multi-document
/// coordination: options are written with the poll, belong to exactly one
/// poll, and disappear with it on delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poll {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub question: String,

    /// Public token granting voting access. Unique, never the internal id.
    pub vote_id: String,

    /// Public token granting results access. Unique, distinct from vote_id.
    pub results_id: String,

    /// user_id of the owner; None for anonymously created polls.
    pub creator_id: Option<String>,

    /// Unix seconds; None means the poll never expires.
    pub expires_at: Option<i64>,

    pub allow_multiple: bool,

    /// Chart kind for the results view ("bar", "pie" or "doughnut").
    pub chart_type: String,

    pub created_at: i64,
    pub updated_at: i64,

    pub options: Vec<PollOption>,
}

/// A single selectable choice, embedded in its poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollOption {
    pub id: String,
    pub text: String,
    pub vote_count: i64,
}

impl Poll {
    pub fn total_votes(&self) -> i64 {
        self.options.iter().map(|opt| opt.vote_count).sum()
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }

    pub fn option(&self, option_id: &str) -> Option<&PollOption> {
        self.options.iter().find(|opt| opt.id == option_id)
    }

    pub fn voting_url(&self) -> String {
        format!("/poll/{}", self.vote_id)
    }

    pub fn results_url(&self) -> String {
        format!("/results/{}", self.results_id)
    }
}

/// Request to create a poll
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreatePollRequest {
    pub question: String,
    pub options: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub allow_multiple: Option<bool>,
    pub chart_type: Option<String>,
}

/// Request to update a poll; absent fields are left unchanged
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdatePollRequest {
    pub question: Option<String>,
    pub options: Option<Vec<String>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub allow_multiple: Option<bool>,
    pub chart_type: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CreatePollResponse {
    pub id: String,
    pub vote_id: String,
    pub results_id: String,
    pub voting_url: String,
    pub results_url: String,
}

impl From<&Poll> for CreatePollResponse {
    fn from(poll: &Poll) -> Self {
        CreatePollResponse {
            id: poll.id.map(|id| id.to_hex()).unwrap_or_default(),
            vote_id: poll.vote_id.clone(),
            results_id: poll.results_id.clone(),
            voting_url: poll.voting_url(),
            results_url: poll.results_url(),
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct OptionView {
    pub id: String,
    pub text: String,
    pub vote_count: i64,
}

/// The voter-facing view: vote counts are always zeroed so tallies stay
/// behind the results link.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct BallotResponse {
    pub id: String,
    pub question: String,
    pub options: Vec<OptionView>,
    pub allow_multiple: bool,
    pub expired: bool,
}

impl BallotResponse {
    pub fn from_poll(poll: &Poll, now: i64) -> Self {
        BallotResponse {
            id: poll.id.map(|id| id.to_hex()).unwrap_or_default(),
            question: poll.question.clone(),
            options: poll
                .options
                .iter()
                .map(|opt| OptionView {
                    id: opt.id.clone(),
                    text: opt.text.clone(),
                    vote_count: 0, // hidden from voters
                })
                .collect(),
            allow_multiple: poll.allow_multiple,
            expired: poll.is_expired(now),
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ResultsResponse {
    pub id: String,
    pub question: String,
    pub options: Vec<OptionView>,
    pub total_votes: i64,
    pub chart_type: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub expired: bool,
    pub created_at: i64,
}

impl ResultsResponse {
    pub fn from_poll(poll: &Poll, now: i64) -> Self {
        ResultsResponse {
            id: poll.id.map(|id| id.to_hex()).unwrap_or_default(),
            question: poll.question.clone(),
            options: poll
                .options
                .iter()
                .map(|opt| OptionView {
                    id: opt.id.clone(),
                    text: opt.text.clone(),
                    vote_count: opt.vote_count,
                })
                .collect(),
            total_votes: poll.total_votes(),
            chart_type: poll.chart_type.clone(),
            expires_at: poll.expires_at.and_then(|at| DateTime::from_timestamp(at, 0)),
            expired: poll.is_expired(now),
            created_at: poll.created_at,
        }
    }
}

/// Public listing entry; only the voting link is exposed here.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct PollListItem {
    pub id: String,
    pub question: String,
    pub option_count: usize,
    pub total_votes: i64,
    pub created_at: i64,
    pub voting_url: String,
}

impl From<&Poll> for PollListItem {
    fn from(poll: &Poll) -> Self {
        PollListItem {
            id: poll.id.map(|id| id.to_hex()).unwrap_or_default(),
            question: poll.question.clone(),
            option_count: poll.options.len(),
            total_votes: poll.total_votes(),
            created_at: poll.created_at,
            voting_url: poll.voting_url(),
        }
    }
}

/// Owner-facing listing entry with both links and full tallies.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MyPollItem {
    pub id: String,
    pub question: String,
    pub options: Vec<OptionView>,
    pub total_votes: i64,
    pub vote_id: String,
    pub results_id: String,
    pub voting_url: String,
    pub results_url: String,
    pub chart_type: String,
    pub allow_multiple: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub expired: bool,
    pub created_at: i64,
}

impl MyPollItem {
    pub fn from_poll(poll: &Poll, now: i64) -> Self {
        MyPollItem {
            id: poll.id.map(|id| id.to_hex()).unwrap_or_default(),
            question: poll.question.clone(),
            options: poll
                .options
                .iter()
                .map(|opt| OptionView {
                    id: opt.id.clone(),
                    text: opt.text.clone(),
                    vote_count: opt.vote_count,
                })
                .collect(),
            total_votes: poll.total_votes(),
            vote_id: poll.vote_id.clone(),
            results_id: poll.results_id.clone(),
            voting_url: poll.voting_url(),
            results_url: poll.results_url(),
            chart_type: poll.chart_type.clone(),
            allow_multiple: poll.allow_multiple,
            expires_at: poll.expires_at.and_then(|at| DateTime::from_timestamp(at, 0)),
            expired: poll.is_expired(now),
            created_at: poll.created_at,
        }
    }
}

/// Body of POST /api/vote/{option_id}
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct VoteRequest {
    pub vote_id: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct VoteResponse {
    pub success: bool,
    pub message: String,
    pub vote_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_poll() -> Poll {
        Poll {
            id: Some(ObjectId::new()),
            question: "Is this a poll?".to_string(),
            vote_id: "votetoken00000000000000a".to_string(),
            results_id: "resultstoken0000000000b1".to_string(),
            creator_id: None,
            expires_at: None,
            allow_multiple: false,
            chart_type: "bar".to_string(),
            created_at: 1_700_000_000,
            updated_at: 1_700_000_000,
            options: vec![
                PollOption { id: "a1".to_string(), text: "A".to_string(), vote_count: 3 },
                PollOption { id: "b2".to_string(), text: "B".to_string(), vote_count: 4 },
            ],
        }
    }

    #[test]
    fn test_total_votes() {
        assert_eq!(sample_poll().total_votes(), 7);
    }

    #[test]
    fn test_expiry() {
        let mut poll = sample_poll();
        assert!(!poll.is_expired(1_700_000_100));
        poll.expires_at = Some(1_700_000_000);
        assert!(poll.is_expired(1_700_000_000));
        assert!(!poll.is_expired(1_699_999_999));
    }

    #[test]
    fn test_option_lookup() {
        let poll = sample_poll();
        assert_eq!(poll.option("b2").map(|o| o.vote_count), Some(4));
        assert!(poll.option("missing").is_none());
    }

    #[test]
    fn test_ballot_hides_vote_counts() {
        let poll = sample_poll();
        let ballot = BallotResponse::from_poll(&poll, 1_700_000_100);
        assert_eq!(ballot.options.len(), 2);
        assert!(ballot.options.iter().all(|opt| opt.vote_count == 0));
        assert!(!ballot.expired);
    }

    #[test]
    fn test_results_keep_vote_counts() {
        let poll = sample_poll();
        let results = ResultsResponse::from_poll(&poll, 1_700_000_100);
        assert_eq!(results.total_votes, 7);
        assert_eq!(results.options[1].vote_count, 4);
    }

    #[test]
    fn test_listing_exposes_only_voting_url() {
        let poll = sample_poll();
        let item = PollListItem::from(&poll);
        assert!(item.voting_url.contains(&poll.vote_id));
        assert!(!item.voting_url.contains(&poll.results_id));
    }
}
