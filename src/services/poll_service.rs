use crate::database::{MongoDB, POLLS_COLLECTION};
use crate::models::{CreatePollRequest, Poll, PollOption, UpdatePollRequest};
use crate::services::auth_service::Claims;
use crate::utils::error::AppError;
use crate::utils::{sanitize, token, validate};
use chrono::{DateTime, Utc};
use futures::stream::StreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};
use serde::Serialize;

const LIST_LIMIT: i64 = 50;

/// Builds the two public access tokens, guaranteed distinct from each other.
/// Cross-poll uniqueness is enforced by the unique indexes.
fn new_token_pair() -> (String, String) {
    let vote_id = token::access_token();
    let mut results_id = token::access_token();
    while results_id == vote_id {
        results_id = token::access_token();
    }
    (vote_id, results_id)
}

fn build_options(texts: Vec<String>) -> Vec<PollOption> {
    texts
        .into_iter()
        .map(|text| PollOption {
            id: ObjectId::new().to_hex(),
            text,
            vote_count: 0,
        })
        .collect()
}

fn expiry_timestamp(expires_at: Option<DateTime<Utc>>, now: i64) -> Result<Option<i64>, AppError> {
    match expires_at {
        Some(dt) => {
            let at = dt.timestamp();
            if at <= now {
                return Err(AppError::Validation(
                    "Expiration date must be in the future".to_string(),
                ));
            }
            Ok(Some(at))
        }
        None => Ok(None),
    }
}

/// Owned polls are managed by their creator only. Anonymous polls
/// (creator_id null) are managed by whoever holds the results link.
fn check_ownership(poll: &Poll, caller: Option<&Claims>) -> Result<(), AppError> {
    match &poll.creator_id {
        Some(owner) => match caller {
            Some(claims) if claims.sub == *owner => Ok(()),
            _ => Err(AppError::Forbidden(
                "You do not have permission to modify this poll".to_string(),
            )),
        },
        None => Ok(()),
    }
}

pub async fn create_poll(
    db: &MongoDB,
    request: &CreatePollRequest,
    creator_id: Option<String>,
) -> Result<Poll, AppError> {
    let question = validate::validate_question(&sanitize::strip_xss(&request.question))?;
    let sanitized: Vec<String> = request.options.iter().map(|opt| sanitize::strip_xss(opt)).collect();
    let option_texts = validate::validate_options(&sanitized)?;

    let chart_type = match &request.chart_type {
        Some(raw) => validate::validate_chart_type(raw)?,
        None => "bar".to_string(),
    };

    let now = Utc::now().timestamp();
    let expires_at = expiry_timestamp(request.expires_at, now)?;
    let (vote_id, results_id) = new_token_pair();

    let mut poll = Poll {
        id: None,
        question,
        vote_id,
        results_id,
        creator_id,
        expires_at,
        allow_multiple: request.allow_multiple.unwrap_or(false),
        chart_type,
        created_at: now,
        updated_at: now,
        options: build_options(option_texts),
    };

    let result = db
        .collection::<Poll>(POLLS_COLLECTION)
        .insert_one(&poll)
        .await
        .map_err(|e| AppError::Database(format!("Failed to create poll: {}", e)))?;

    poll.id = result.inserted_id.as_object_id();

    log::info!(
        "🗳️  Poll created: {} ({} options, creator: {})",
        poll.vote_id,
        poll.options.len(),
        poll.creator_id.as_deref().unwrap_or("anonymous")
    );

    Ok(poll)
}

pub async fn find_by_vote_id(db: &MongoDB, vote_id: &str) -> Result<Poll, AppError> {
    db.collection::<Poll>(POLLS_COLLECTION)
        .find_one(doc! { "vote_id": vote_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Poll not found".to_string()))
}

pub async fn find_by_results_id(db: &MongoDB, results_id: &str) -> Result<Poll, AppError> {
    db.collection::<Poll>(POLLS_COLLECTION)
        .find_one(doc! { "results_id": results_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Poll not found".to_string()))
}

/// Casts one vote: resolves the poll from the public vote token, checks the
/// option belongs to it, then increments the counter with a single atomic
/// `$inc` on the embedded option. Returns the post-increment count.
pub async fn cast_vote(db: &MongoDB, vote_id: &str, option_id: &str) -> Result<i64, AppError> {
    let poll = find_by_vote_id(db, vote_id).await?;

    let now = Utc::now().timestamp();
    if poll.is_expired(now) {
        return Err(AppError::Forbidden("This poll has expired".to_string()));
    }

    if poll.option(option_id).is_none() {
        return Err(AppError::Validation(
            "Option does not belong to this poll".to_string(),
        ));
    }

    let result = db
        .collection::<Poll>(POLLS_COLLECTION)
        .update_one(
            doc! { "vote_id": vote_id, "options.id": option_id },
            doc! { "$inc": { "options.$.vote_count": 1 } },
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to record vote: {}", e)))?;

    if result.matched_count == 0 {
        // Poll vanished between lookup and update
        return Err(AppError::NotFound("Poll not found".to_string()));
    }

    let updated = find_by_vote_id(db, vote_id).await?;
    let count = updated
        .option(option_id)
        .map(|opt| opt.vote_count)
        .unwrap_or(0);

    log::info!("✅ Vote recorded: poll {} option {} -> {}", vote_id, option_id, count);

    Ok(count)
}

/// Turns an update request into the `$set` document for it, enforcing the
/// edit rules: once any vote is in, the question and options are frozen,
/// while expiration and presentation fields stay editable. Returns a 400
/// when the request carries nothing to change.
fn build_update(poll: &Poll, request: &UpdatePollRequest, now: i64) -> Result<Document, AppError> {
    let has_votes = poll.total_votes() > 0;

    let mut set = doc! {};

    if let Some(raw_question) = &request.question {
        if has_votes {
            return Err(AppError::Forbidden(
                "Poll cannot be edited after voting has started".to_string(),
            ));
        }
        let question = validate::validate_question(&sanitize::strip_xss(raw_question))?;
        set.insert("question", question);
    }

    if let Some(raw_options) = &request.options {
        if has_votes {
            return Err(AppError::Forbidden(
                "Poll cannot be edited after voting has started".to_string(),
            ));
        }
        let sanitized: Vec<String> = raw_options.iter().map(|opt| sanitize::strip_xss(opt)).collect();
        let texts = validate::validate_options(&sanitized)?;
        // Wholesale replacement: fresh option ids, counters back to zero
        let options = build_options(texts);
        let bson_options = mongodb::bson::to_bson(&options)
            .map_err(|e| AppError::Database(format!("Failed to encode options: {}", e)))?;
        set.insert("options", bson_options);
    }

    // Expiration and presentation stay editable regardless of votes
    if let Some(dt) = request.expires_at {
        let at = expiry_timestamp(Some(dt), now)?;
        set.insert("expires_at", at);
    }

    if let Some(raw_chart) = &request.chart_type {
        set.insert("chart_type", validate::validate_chart_type(raw_chart)?);
    }

    if let Some(allow_multiple) = request.allow_multiple {
        set.insert("allow_multiple", allow_multiple);
    }

    if set.is_empty() {
        return Err(AppError::Validation("No editable fields provided".to_string()));
    }

    set.insert("updated_at", now);

    Ok(set)
}

pub async fn update_poll(
    db: &MongoDB,
    results_id: &str,
    request: &UpdatePollRequest,
    caller: Option<&Claims>,
) -> Result<Poll, AppError> {
    let poll = find_by_results_id(db, results_id).await?;
    check_ownership(&poll, caller)?;

    let set = build_update(&poll, request, Utc::now().timestamp())?;

    db.collection::<Poll>(POLLS_COLLECTION)
        .update_one(doc! { "results_id": results_id }, doc! { "$set": set })
        .await
        .map_err(|e| AppError::Database(format!("Failed to update poll: {}", e)))?;

    log::info!("✏️  Poll updated: {}", results_id);

    find_by_results_id(db, results_id).await
}

pub async fn delete_poll(
    db: &MongoDB,
    results_id: &str,
    caller: Option<&Claims>,
) -> Result<(), AppError> {
    let poll = find_by_results_id(db, results_id).await?;
    check_ownership(&poll, caller)?;

    // Options are embedded, so this is the cascade
    let result = db
        .collection::<Poll>(POLLS_COLLECTION)
        .delete_one(doc! { "results_id": results_id })
        .await
        .map_err(|e| AppError::Database(format!("Failed to delete poll: {}", e)))?;

    if result.deleted_count == 0 {
        return Err(AppError::NotFound("Poll not found".to_string()));
    }

    log::info!("🗑️  Poll deleted: {}", results_id);

    Ok(())
}

async fn collect_polls(
    mut cursor: mongodb::Cursor<Poll>,
) -> Result<Vec<Poll>, AppError> {
    let mut polls = Vec::new();
    while let Some(result) = cursor.next().await {
        match result {
            Ok(poll) => polls.push(poll),
            Err(e) => log::error!("❌ Failed to decode poll document: {}", e),
        }
    }
    Ok(polls)
}

/// Recent polls for the public listing, newest first.
pub async fn list_polls(db: &MongoDB) -> Result<Vec<Poll>, AppError> {
    let cursor = db
        .collection::<Poll>(POLLS_COLLECTION)
        .find(doc! {})
        .sort(doc! { "created_at": -1 })
        .limit(LIST_LIMIT)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    collect_polls(cursor).await
}

pub async fn polls_by_creator(db: &MongoDB, user_id: &str) -> Result<Vec<Poll>, AppError> {
    let cursor = db
        .collection::<Poll>(POLLS_COLLECTION)
        .find(doc! { "creator_id": user_id })
        .sort(doc! { "created_at": -1 })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    collect_polls(cursor).await
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UserStats {
    pub polls_created: usize,
    pub total_votes_received: i64,
    pub active_polls: usize,
}

pub async fn user_stats(db: &MongoDB, user_id: &str) -> Result<UserStats, AppError> {
    let polls = polls_by_creator(db, user_id).await?;
    let now = Utc::now().timestamp();

    Ok(UserStats {
        polls_created: polls.len(),
        total_votes_received: polls.iter().map(Poll::total_votes).sum(),
        active_polls: polls.iter().filter(|poll| !poll.is_expired(now)).count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims_for(user_id: &str) -> Claims {
        Claims {
            sub: user_id.to_string(),
            email: "student@campus.edu".to_string(),
            name: None,
            iat: 0,
            exp: usize::MAX,
            jti: "test".to_string(),
            aud: "campus-poll-api".to_string(),
            iss: "campus-poll-service".to_string(),
        }
    }

    fn poll_with_creator(creator_id: Option<&str>) -> Poll {
        Poll {
            id: None,
            question: "Is this a poll?".to_string(),
            vote_id: "v".repeat(24),
            results_id: "r".repeat(24),
            creator_id: creator_id.map(str::to_string),
            expires_at: None,
            allow_multiple: false,
            chart_type: "bar".to_string(),
            created_at: 0,
            updated_at: 0,
            options: vec![],
        }
    }

    #[test]
    fn test_token_pair_is_distinct_and_well_formed() {
        let (vote_id, results_id) = new_token_pair();
        assert_ne!(vote_id, results_id);
        assert!(token::is_access_token(&vote_id));
        assert!(token::is_access_token(&results_id));
    }

    #[test]
    fn test_build_options_assigns_fresh_zeroed_counters() {
        let options = build_options(vec!["A".to_string(), "B".to_string()]);
        assert_eq!(options.len(), 2);
        assert!(options.iter().all(|opt| opt.vote_count == 0));
        assert_ne!(options[0].id, options[1].id);
    }

    #[test]
    fn test_expiry_must_be_in_the_future() {
        let now = Utc::now().timestamp();
        let past = DateTime::from_timestamp(now - 60, 0).unwrap();
        let future = DateTime::from_timestamp(now + 3600, 0).unwrap();
        assert!(expiry_timestamp(Some(past), now).is_err());
        assert_eq!(expiry_timestamp(Some(future), now).unwrap(), Some(now + 3600));
        assert_eq!(expiry_timestamp(None, now).unwrap(), None);
    }

    #[test]
    fn test_owned_poll_requires_matching_caller() {
        let poll = poll_with_creator(Some("owner-1"));
        assert!(check_ownership(&poll, Some(&claims_for("owner-1"))).is_ok());
        assert!(check_ownership(&poll, Some(&claims_for("someone-else"))).is_err());
        assert!(check_ownership(&poll, None).is_err());
    }

    #[test]
    fn test_anonymous_poll_is_managed_via_link() {
        let poll = poll_with_creator(None);
        assert!(check_ownership(&poll, None).is_ok());
        assert!(check_ownership(&poll, Some(&claims_for("anyone"))).is_ok());
    }

    fn poll_with_votes(vote_count: i64) -> Poll {
        let mut poll = poll_with_creator(None);
        poll.options = vec![
            PollOption {
                id: ObjectId::new().to_hex(),
                text: "Yes".to_string(),
                vote_count,
            },
            PollOption {
                id: ObjectId::new().to_hex(),
                text: "No".to_string(),
                vote_count: 0,
            },
        ];
        poll
    }

    fn empty_update() -> UpdatePollRequest {
        UpdatePollRequest {
            question: None,
            options: None,
            expires_at: None,
            allow_multiple: None,
            chart_type: None,
        }
    }

    #[test]
    fn test_question_edit_is_rejected_once_votes_are_in() {
        let poll = poll_with_votes(1);
        let request = UpdatePollRequest {
            question: Some("What should we change it to?".to_string()),
            ..empty_update()
        };
        match build_update(&poll, &request, 0) {
            Err(AppError::Forbidden(_)) => {}
            other => panic!("expected Forbidden, got {:?}", other),
        }
    }

    #[test]
    fn test_option_edit_is_rejected_once_votes_are_in() {
        let poll = poll_with_votes(1);
        let request = UpdatePollRequest {
            options: Some(vec!["Maybe".to_string(), "Never".to_string()]),
            ..empty_update()
        };
        match build_update(&poll, &request, 0) {
            Err(AppError::Forbidden(_)) => {}
            other => panic!("expected Forbidden, got {:?}", other),
        }
    }

    #[test]
    fn test_presentation_fields_stay_editable_after_votes() {
        let poll = poll_with_votes(3);
        let now = Utc::now().timestamp();
        let request = UpdatePollRequest {
            expires_at: Some(DateTime::from_timestamp(now + 3600, 0).unwrap()),
            allow_multiple: Some(true),
            chart_type: Some("pie".to_string()),
            ..empty_update()
        };
        let set = build_update(&poll, &request, now).unwrap();
        assert_eq!(set.get_i64("expires_at").unwrap(), now + 3600);
        assert_eq!(set.get_bool("allow_multiple").unwrap(), true);
        assert_eq!(set.get_str("chart_type").unwrap(), "pie");
        assert_eq!(set.get_i64("updated_at").unwrap(), now);
        assert!(!set.contains_key("question"));
        assert!(!set.contains_key("options"));
    }

    #[test]
    fn test_content_edits_allowed_before_any_vote() {
        let poll = poll_with_votes(0);
        let request = UpdatePollRequest {
            question: Some("Is this the final wording?".to_string()),
            options: Some(vec!["Sure".to_string(), "Not yet".to_string()]),
            ..empty_update()
        };
        let set = build_update(&poll, &request, 5).unwrap();
        assert_eq!(set.get_str("question").unwrap(), "Is this the final wording?");
        // Replacement options come back with zeroed counters and fresh ids
        let options: Vec<PollOption> =
            mongodb::bson::from_bson(set.get("options").unwrap().clone()).unwrap();
        assert_eq!(options.len(), 2);
        assert!(options.iter().all(|opt| opt.vote_count == 0));
        assert!(options.iter().all(|opt| poll.option(&opt.id).is_none()));
    }

    #[test]
    fn test_update_with_no_fields_is_rejected() {
        let poll = poll_with_votes(0);
        match build_update(&poll, &empty_update(), 0) {
            Err(AppError::Validation(message)) => {
                assert_eq!(message, "No editable fields provided");
            }
            other => panic!("expected Validation, got {:?}", other),
        }
    }
}
