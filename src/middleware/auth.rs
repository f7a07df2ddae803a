use crate::services::auth_service::{self, Claims};
use crate::utils::error::AppError;
use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    let header = req.headers().get("Authorization")?;
    let value = header.to_str().ok()?;
    value.strip_prefix("Bearer ").map(str::to_string)
}

/// Rejects with the same `{ success: false, error }` JSON body the handlers
/// produce, so clients see one error shape everywhere.
fn unauthorized<B>(req: ServiceRequest, message: &str) -> ServiceResponse<EitherBody<B>> {
    let response = AppError::Unauthorized(message.to_string()).to_response();
    req.into_response(response).map_into_right_body()
}

/// Requires a valid bearer token; decoded claims land in request extensions
/// for handlers to pick up via `web::ReqData<Claims>`.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = match bearer_token(&req) {
            Some(token) => token,
            None => {
                let res = unauthorized(req, "Missing authorization token");
                return Box::pin(async move { Ok(res) });
            }
        };

        match auth_service::verify_token(&token) {
            Ok(claims) => {
                req.extensions_mut().insert::<Claims>(claims);
                let fut = self.service.call(req);
                Box::pin(async move {
                    let res = fut.await?;
                    Ok(res.map_into_left_body())
                })
            }
            Err(e) => {
                log::debug!("🔒 Rejected token: {}", e);
                let res = unauthorized(req, "Invalid or expired token");
                Box::pin(async move { Ok(res) })
            }
        }
    }
}

/// Attaches claims when a valid bearer token is present but never rejects:
/// anonymous requests (and requests with bad tokens) pass through without
/// claims. Used where poll creators may or may not be logged in.
pub struct OptionalAuth;

impl<S, B> Transform<S, ServiceRequest> for OptionalAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = OptionalAuthService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(OptionalAuthService { service }))
    }
}

pub struct OptionalAuthService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for OptionalAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if let Some(token) = bearer_token(&req) {
            if let Ok(claims) = auth_service::verify_token(&token) {
                req.extensions_mut().insert::<Claims>(claims);
            }
        }
        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use actix_web::{test, web, App, HttpResponse};

    async fn whoami(user: web::ReqData<Claims>) -> HttpResponse {
        HttpResponse::Ok().json(serde_json::json!({ "sub": user.sub }))
    }

    fn sample_token() -> (String, String) {
        let user = User {
            id: None,
            user_id: "user-auth-mw".to_string(),
            email: "student@campus.edu".to_string(),
            password: "hash".to_string(),
            name: None,
            created_at: None,
            updated_at: None,
            last_login: None,
        };
        (user.user_id.clone(), auth_service::generate_jwt(&user).unwrap())
    }

    #[actix_web::test]
    async fn test_missing_token_yields_json_401() {
        let app = test::init_service(
            App::new().service(
                web::resource("/private")
                    .wrap(AuthMiddleware)
                    .route(web::get().to(whoami)),
            ),
        )
        .await;

        let req = test::TestRequest::get().uri("/private").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), actix_web::http::StatusCode::UNAUTHORIZED);

        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Missing authorization token");
    }

    #[actix_web::test]
    async fn test_garbage_token_yields_json_401() {
        let app = test::init_service(
            App::new().service(
                web::resource("/private")
                    .wrap(AuthMiddleware)
                    .route(web::get().to(whoami)),
            ),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/private")
            .insert_header(("Authorization", "Bearer not.a.token"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), actix_web::http::StatusCode::UNAUTHORIZED);

        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["success"], false);
    }

    #[actix_web::test]
    async fn test_valid_token_reaches_handler_with_claims() {
        let (user_id, token) = sample_token();
        let app = test::init_service(
            App::new().service(
                web::resource("/private")
                    .wrap(AuthMiddleware)
                    .route(web::get().to(whoami)),
            ),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/private")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), actix_web::http::StatusCode::OK);

        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["sub"], user_id);
    }

    #[actix_web::test]
    async fn test_optional_auth_lets_anonymous_through() {
        async fn maybe(user: Option<web::ReqData<Claims>>) -> HttpResponse {
            HttpResponse::Ok().json(serde_json::json!({
                "anonymous": user.is_none()
            }))
        }

        let app = test::init_service(
            App::new().service(
                web::resource("/open")
                    .wrap(OptionalAuth)
                    .route(web::get().to(maybe)),
            ),
        )
        .await;

        let req = test::TestRequest::get().uri("/open").to_request();
        let body: serde_json::Value =
            test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["anonymous"], true);

        let (_, token) = sample_token();
        let req = test::TestRequest::get()
            .uri("/open")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        let body: serde_json::Value =
            test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["anonymous"], false);
    }
}
