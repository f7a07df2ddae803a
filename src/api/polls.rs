use actix_web::{web, HttpResponse};
use chrono::Utc;

use crate::database::MongoDB;
use crate::models::{
    BallotResponse, CreatePollRequest, CreatePollResponse, MyPollItem, PollListItem,
    ResultsResponse, UpdatePollRequest, VoteRequest, VoteResponse,
};
use crate::services::auth_service::Claims;
use crate::services::poll_service;
use crate::utils::error::AppError;
use crate::utils::token;

fn checked_token(value: &str, label: &str) -> Result<(), AppError> {
    if token::is_access_token(value) {
        Ok(())
    } else {
        Err(AppError::Validation(format!("Invalid {} format", label)))
    }
}

#[utoipa::path(
    post,
    path = "/api/polls",
    tag = "Polls",
    request_body = CreatePollRequest,
    responses(
        (status = 201, description = "Poll created", body = CreatePollResponse),
        (status = 400, description = "Validation failed"),
        (status = 429, description = "Too many polls created")
    ),
    security(
        (),
        ("bearer_auth" = [])
    )
)]
pub async fn create_poll(
    db: web::Data<MongoDB>,
    user: Option<web::ReqData<Claims>>,
    request: web::Json<CreatePollRequest>,
) -> HttpResponse {
    let creator_id = user.as_ref().map(|claims| claims.sub.clone());
    log::info!(
        "🗳️  POST /api/polls - creator: {}",
        creator_id.as_deref().unwrap_or("anonymous")
    );

    match poll_service::create_poll(&db, &request, creator_id).await {
        Ok(poll) => HttpResponse::Created().json(CreatePollResponse::from(&poll)),
        Err(e) => e.to_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/polls",
    tag = "Polls",
    responses(
        (status = 200, description = "Recent polls", body = [PollListItem])
    )
)]
pub async fn list_polls(db: web::Data<MongoDB>) -> HttpResponse {
    match poll_service::list_polls(&db).await {
        Ok(polls) => {
            let items: Vec<PollListItem> = polls.iter().map(PollListItem::from).collect();
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "polls": items,
                "total": items.len()
            }))
        }
        Err(e) => e.to_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/my-polls",
    tag = "Polls",
    responses(
        (status = 200, description = "The caller's polls", body = [MyPollItem]),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn my_polls(db: web::Data<MongoDB>, user: web::ReqData<Claims>) -> HttpResponse {
    match poll_service::polls_by_creator(&db, &user.sub).await {
        Ok(polls) => {
            let now = Utc::now().timestamp();
            let items: Vec<MyPollItem> = polls
                .iter()
                .map(|poll| MyPollItem::from_poll(poll, now))
                .collect();
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "polls": items,
                "total": items.len()
            }))
        }
        Err(e) => e.to_response(),
    }
}

#[utoipa::path(
    put,
    path = "/api/polls/{results_id}",
    tag = "Polls",
    request_body = UpdatePollRequest,
    params(("results_id" = String, Path, description = "Results access token")),
    responses(
        (status = 200, description = "Poll updated", body = ResultsResponse),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Not the owner, or voting already started"),
        (status = 404, description = "Poll not found")
    ),
    security(
        (),
        ("bearer_auth" = [])
    )
)]
pub async fn update_poll(
    db: web::Data<MongoDB>,
    user: Option<web::ReqData<Claims>>,
    path: web::Path<String>,
    request: web::Json<UpdatePollRequest>,
) -> HttpResponse {
    let results_id = path.into_inner();
    if let Err(e) = checked_token(&results_id, "results ID") {
        return e.to_response();
    }
    log::info!("✏️  PUT /api/polls/{}", results_id);

    let claims = user.as_deref();
    match poll_service::update_poll(&db, &results_id, &request, claims).await {
        Ok(poll) => {
            let now = Utc::now().timestamp();
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "poll": ResultsResponse::from_poll(&poll, now)
            }))
        }
        Err(e) => e.to_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/api/polls/{results_id}",
    tag = "Polls",
    params(("results_id" = String, Path, description = "Results access token")),
    responses(
        (status = 200, description = "Poll and its options deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Poll not found")
    ),
    security(
        (),
        ("bearer_auth" = [])
    )
)]
pub async fn delete_poll(
    db: web::Data<MongoDB>,
    user: Option<web::ReqData<Claims>>,
    path: web::Path<String>,
) -> HttpResponse {
    let results_id = path.into_inner();
    if let Err(e) = checked_token(&results_id, "results ID") {
        return e.to_response();
    }
    log::info!("🗑️  DELETE /api/polls/{}", results_id);

    let claims = user.as_deref();
    match poll_service::delete_poll(&db, &results_id, claims).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Poll deleted successfully"
        })),
        Err(e) => e.to_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/poll/{vote_id}",
    tag = "Voting",
    params(("vote_id" = String, Path, description = "Voting access token")),
    responses(
        (status = 200, description = "Ballot with vote counts hidden", body = BallotResponse),
        (status = 404, description = "Poll not found")
    )
)]
pub async fn get_ballot(db: web::Data<MongoDB>, path: web::Path<String>) -> HttpResponse {
    let vote_id = path.into_inner();
    if let Err(e) = checked_token(&vote_id, "vote ID") {
        return e.to_response();
    }

    match poll_service::find_by_vote_id(&db, &vote_id).await {
        Ok(poll) => {
            let now = Utc::now().timestamp();
            HttpResponse::Ok().json(BallotResponse::from_poll(&poll, now))
        }
        Err(e) => e.to_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/vote/{option_id}",
    tag = "Voting",
    request_body = VoteRequest,
    params(("option_id" = String, Path, description = "Option id from the ballot")),
    responses(
        (status = 200, description = "Vote recorded", body = VoteResponse),
        (status = 400, description = "Option does not belong to this poll"),
        (status = 403, description = "Poll has expired"),
        (status = 404, description = "Poll not found"),
        (status = 429, description = "Too many vote attempts")
    )
)]
pub async fn cast_vote(
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    request: web::Json<VoteRequest>,
) -> HttpResponse {
    let option_id = path.into_inner();
    let vote_id = request.vote_id.trim();
    if let Err(e) = checked_token(vote_id, "vote ID") {
        return e.to_response();
    }
    if option_id.is_empty() {
        return AppError::Validation("Option ID is required".to_string()).to_response();
    }

    match poll_service::cast_vote(&db, vote_id, &option_id).await {
        Ok(vote_count) => HttpResponse::Ok().json(VoteResponse {
            success: true,
            message: "Vote recorded successfully".to_string(),
            vote_count,
        }),
        Err(e) => e.to_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/results/{results_id}",
    tag = "Results",
    params(("results_id" = String, Path, description = "Results access token")),
    responses(
        (status = 200, description = "Full tallies", body = ResultsResponse),
        (status = 404, description = "Poll not found"),
        (status = 429, description = "Too many requests")
    )
)]
pub async fn get_results(db: web::Data<MongoDB>, path: web::Path<String>) -> HttpResponse {
    let results_id = path.into_inner();
    if let Err(e) = checked_token(&results_id, "results ID") {
        return e.to_response();
    }

    match poll_service::find_by_results_id(&db, &results_id).await {
        Ok(poll) => {
            let now = Utc::now().timestamp();
            HttpResponse::Ok().json(ResultsResponse::from_poll(&poll, now))
        }
        Err(e) => e.to_response(),
    }
}
