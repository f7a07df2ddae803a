use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Campus Poll API",
        version = "1.0.0",
        description = "REST API for Campus Poll: create polls, share the generated voting and results links, cast votes and read tallies.\n\n**Access model:** every poll gets two unguessable tokens - a vote_id granting voting access and a results_id granting results access - independent of each other and of the internal id.\n\n**Authentication:** optional for poll creation (logged-in creators own their polls), required for the /my-polls and /auth/* account endpoints.",
        contact(
            name = "Campus Poll Team"
        )
    ),
    paths(
        // Auth endpoints
        crate::api::auth::register,
        crate::api::auth::login,
        crate::api::auth::get_me,
        crate::api::auth::get_stats,
        crate::api::auth::update_profile,
        crate::api::auth::change_password,

        // Poll lifecycle
        crate::api::polls::create_poll,
        crate::api::polls::list_polls,
        crate::api::polls::my_polls,
        crate::api::polls::update_poll,
        crate::api::polls::delete_poll,

        // Voting & results
        crate::api::polls::get_ballot,
        crate::api::polls::cast_vote,
        crate::api::polls::get_results,

        // Health
        crate::api::health::health_check,
    ),
    components(
        schemas(
            // Auth
            crate::services::auth_service::LoginRequest,
            crate::services::auth_service::RegisterRequest,
            crate::services::auth_service::UpdateProfileRequest,
            crate::services::auth_service::ChangePasswordRequest,
            crate::services::auth_service::AuthResponse,
            crate::services::poll_service::UserStats,
            crate::models::user::UserInfo,

            // Polls
            crate::models::poll::CreatePollRequest,
            crate::models::poll::UpdatePollRequest,
            crate::models::poll::CreatePollResponse,
            crate::models::poll::PollListItem,
            crate::models::poll::MyPollItem,
            crate::models::poll::OptionView,
            crate::models::poll::BallotResponse,
            crate::models::poll::ResultsResponse,
            crate::models::poll::VoteRequest,
            crate::models::poll::VoteResponse,

            // Health
            crate::api::health::HealthResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Registration, login and account management."),
        (name = "Polls", description = "Poll lifecycle: create, list, edit and delete. Edits to question or options are blocked once voting has started."),
        (name = "Voting", description = "Ballot retrieval and vote casting via the public vote_id token. Vote counts are hidden from voters."),
        (name = "Results", description = "Tallies via the public results_id token."),
        (name = "Health", description = "Service health check."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Enter your JWT token"))
                        .build(),
                ),
            );
        }
    }
}
