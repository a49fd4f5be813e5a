// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, exams, questions, sessions},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, admin, exams, questions, sessions).
/// * Protects everything but login with the JWT middleware.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new().route("/login", post(auth::login));

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route("/teachers", post(admin::create_teacher))
        .route("/students", post(admin::create_student))
        // Auth first, then the admin check
        .route_layer(middleware::from_fn(admin_middleware))
        .route_layer(auth.clone());

    let exam_routes = Router::new()
        .route("/", get(exams::list_exams).post(exams::create_exam))
        .route("/assigned", get(exams::list_assigned))
        .route("/submit", post(sessions::submit_exam))
        .route("/sessions", get(sessions::list_my_sessions))
        .route("/sessions/{id}", get(sessions::get_session))
        .route(
            "/{id}",
            get(exams::get_exam)
                .put(exams::update_exam)
                .delete(exams::delete_exam),
        )
        .route("/{id}/students", post(exams::assign_students))
        .route(
            "/{id}/questions",
            get(questions::list_questions).post(questions::add_question),
        )
        .route("/{id}/paper", get(questions::exam_paper))
        .route("/{id}/sessions", get(sessions::list_exam_sessions))
        .route_layer(auth.clone());

    let question_routes = Router::new()
        .route("/bulk", post(questions::add_questions_bulk))
        .route(
            "/{id}",
            put(questions::update_question).delete(questions::delete_question),
        )
        .route_layer(auth);

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api/exams", exam_routes)
        .nest("/api/questions", question_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
