// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{attempt, auth, course, mock_test},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Public: registration, login, catalog listings and mock test metadata.
/// * Behind `auth_middleware`: question sets (answer keys), attempts and authoring.
/// * Global middleware: Trace, CORS.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
            HeaderValue::from_static("http://localhost:5173"),
        ])
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let require_auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me).route_layer(require_auth.clone()));

    let course_routes = Router::new()
        .route(
            "/",
            get(course::list_courses)
                .merge(post(course::create_course).route_layer(require_auth.clone())),
        )
        .route("/{id}", get(course::get_course));

    let mock_test_routes = Router::new()
        .route(
            "/",
            get(mock_test::list_mock_tests)
                .merge(post(mock_test::create_mock_test).route_layer(require_auth.clone())),
        )
        .route("/{id}", get(mock_test::get_mock_test))
        .route(
            "/{id}/questions",
            get(mock_test::get_questions)
                .post(mock_test::create_question)
                .route_layer(require_auth.clone()),
        );

    let attempt_routes = Router::new()
        .route(
            "/",
            post(attempt::create_attempt).get(attempt::list_my_attempts),
        )
        .route_layer(require_auth);

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .nest("/api/courses", course_routes)
        .nest("/api/mock-tests", mock_test_routes)
        .nest("/api/test-attempts", attempt_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
