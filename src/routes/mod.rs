pub mod health;
pub mod invite;
pub mod recruiter_code;
pub mod user_assessment;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::middleware::auth::{require_auth, require_recruiter, require_student};
use crate::middleware::cors::frontend_cors;
use crate::middleware::rate_limit::{rps_middleware, RateLimiter};
use crate::AppState;

/// Builds the full HTTP surface with auth, rate limiting, CORS and tracing applied.
pub fn router(state: AppState) -> Router {
    let config = state.config.clone();

    let public_api = Router::new()
        .route("/health", get(health::health))
        .route("/api/invites/validate/:token", get(invite::validate_invite))
        .route("/api/invites/status/:token", get(invite::invite_status))
        .route(
            "/api/recruiter-code/validate",
            post(recruiter_code::validate_code),
        )
        .layer(from_fn_with_state(
            RateLimiter::per_second(config.public_rps),
            rps_middleware,
        ));

    let any_user_api = Router::new()
        .route("/api/invites/accept/:token", post(invite::accept_invite))
        .route(
            "/api/user-assessments/:id/answers",
            get(user_assessment::assessment_answers),
        )
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let student_api = Router::new()
        .route("/api/recruiter-code/link", post(recruiter_code::link))
        .route(
            "/api/recruiter-code/my-recruiter",
            get(recruiter_code::my_recruiter),
        )
        .route(
            "/api/recruiter-code/recruiter-assessments",
            get(recruiter_code::recruiter_assessments),
        )
        .route(
            "/api/user-assessments/students/me/assessments",
            get(user_assessment::my_assessments),
        )
        .route(
            "/api/user-assessments/start",
            post(user_assessment::start_assessment),
        )
        .route(
            "/api/user-assessments/:id/submit",
            post(user_assessment::submit_assessment),
        )
        .route_layer(from_fn_with_state(state.clone(), require_student));

    let recruiter_api = Router::new()
        .route("/api/invites/send", post(invite::send_invites))
        .route("/api/recruiter-code/me", get(recruiter_code::my_code))
        .route(
            "/api/user-assessments/recruiter/stats",
            get(user_assessment::recruiter_stats),
        )
        .route(
            "/api/user-assessments/recruiter/students",
            get(user_assessment::recruiter_students),
        )
        .route(
            "/api/user-assessments/statistics",
            get(user_assessment::statistics),
        )
        .route_layer(from_fn_with_state(state.clone(), require_recruiter));

    let authenticated_api = any_user_api
        .merge(student_api)
        .merge(recruiter_api)
        .layer(from_fn_with_state(
            RateLimiter::per_second(config.api_rps),
            rps_middleware,
        ));

    public_api
        .merge(authenticated_api)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(frontend_cors(&config.frontend_url))
                .layer(DefaultBodyLimit::max(1024 * 1024)),
        )
}
