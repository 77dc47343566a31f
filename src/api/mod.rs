//! API handlers for Bookies REST endpoints

pub mod auth;
pub mod book_requests;
pub mod books;
pub mod health;
pub mod openapi;
pub mod uploads;

use axum::{
    async_trait,
    extract::{DefaultBodyLimit, FromRequestParts},
    http::request::Parts,
    routing::{get, post},
    Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::{
    error::AppError,
    models::{user::UserClaims, Caller},
    services::uploads::UPLOADS_ROUTE,
    AppState,
};

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

impl AuthenticatedUser {
    pub fn caller(&self) -> Caller {
        self.0.caller()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::Authentication("Missing or invalid authorization header".to_string()))?;

        let claims = UserClaims::from_token(bearer.token(), &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let uploads_dir = state.services.uploads.dir().to_path_buf();
    // Room for the multipart framing around a maximum-size image
    let upload_limit = DefaultBodyLimit::max(state.services.uploads.max_bytes() + 64 * 1024);

    let api = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/auth/change-password", post(auth::change_password))
        // Books
        .route("/books", get(books::list_books).post(books::create_book))
        .route("/books/categories", get(books::list_categories))
        .route("/books/mine", get(books::my_books))
        .route(
            "/books/:id",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        // Borrow / return requests
        .route("/book-requests", post(book_requests::create_request))
        .route("/book-requests/pending", get(book_requests::list_pending))
        .route("/book-requests/mine", get(book_requests::my_requests))
        .route("/book-requests/user/:email", get(book_requests::user_requests))
        .route("/book-requests/:id", get(book_requests::get_request))
        .route("/book-requests/:id/approve", post(book_requests::approve_request))
        .route("/book-requests/:id/reject", post(book_requests::reject_request))
        // Cover images
        .route("/upload/image", post(uploads::upload_image).layer(upload_limit))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .nest_service(UPLOADS_ROUTE, ServeDir::new(uploads_dir))
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}
