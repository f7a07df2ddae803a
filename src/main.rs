mod api;
mod database;
mod middleware;
mod models;
mod services;
mod utils;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::env;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use middleware::auth::{AuthMiddleware, OptionalAuth};
use middleware::rate_limit::RateLimiter;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    // Get configuration from environment
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "5000".to_string());
    let database_url = env::var("DATABASE_URL")
        .unwrap_or_else(|_| "mongodb://localhost:27017/campus_poll".to_string());
    let frontend_url =
        env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());

    log::info!("🚀 Starting Campus Poll Service...");

    // Initialize MongoDB connection
    let db = database::MongoDB::new(&database_url)
        .await
        .expect("Failed to connect to MongoDB");

    let db_data = web::Data::new(db);

    log::info!("✅ MongoDB connected successfully");
    log::info!("🌐 Server starting on {}:{}", host, port);
    log::info!("📚 Swagger UI available at: http://{}:{}/swagger-ui/", host, port);
    log::info!("🔗 CORS enabled for: {}", frontend_url);

    // Start HTTP server
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&frontend_url)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
            ])
            .supports_credentials()
            .max_age(3600);

        // Generate OpenAPI specification
        let openapi = api::swagger::ApiDoc::openapi();

        App::new()
            .app_data(db_data.clone())
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(Logger::default())
            // Swagger UI
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone()),
            )
            // Health check (never rate limited)
            .route("/health", web::get().to(api::health::health_check))
            // Auth endpoints
            .service(
                web::scope("/api/auth")
                    .service(
                        web::resource("/register")
                            .wrap(RateLimiter::auth())
                            .route(web::post().to(api::auth::register)),
                    )
                    .service(
                        web::resource("/login")
                            .wrap(RateLimiter::auth())
                            .route(web::post().to(api::auth::login)),
                    )
                    .service(
                        web::scope("")
                            .wrap(AuthMiddleware)
                            .route("/me", web::get().to(api::auth::get_me))
                            .route("/stats", web::get().to(api::auth::get_stats))
                            .route("/profile", web::put().to(api::auth::update_profile))
                            .route("/password", web::put().to(api::auth::change_password)),
                    ),
            )
            // Poll lifecycle, voting and results
            .service(
                web::scope("/api")
                    .wrap(RateLimiter::api())
                    .service(
                        web::resource("/polls")
                            .wrap(RateLimiter::create_poll())
                            .wrap(OptionalAuth)
                            .route(web::post().to(api::polls::create_poll))
                            .route(web::get().to(api::polls::list_polls)),
                    )
                    .service(
                        web::resource("/my-polls")
                            .wrap(AuthMiddleware)
                            .route(web::get().to(api::polls::my_polls)),
                    )
                    .service(
                        web::resource("/polls/{results_id}")
                            .wrap(OptionalAuth)
                            .route(web::put().to(api::polls::update_poll))
                            .route(web::delete().to(api::polls::delete_poll)),
                    )
                    .route("/poll/{vote_id}", web::get().to(api::polls::get_ballot))
                    .service(
                        web::resource("/vote/{option_id}")
                            .wrap(RateLimiter::vote())
                            .route(web::post().to(api::polls::cast_vote)),
                    )
                    .service(
                        web::resource("/results/{results_id}")
                            .wrap(RateLimiter::results())
                            .route(web::get().to(api::polls::get_results)),
                    ),
            )
    })
    .bind(format!("{}:{}", host, port))?
    .run()
    .await
}
