//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, book_requests, books, health, uploads};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bookies API",
        version = "1.0.0",
        description = "Library book lending REST API"
    ),
    servers(
        (url = "/api", description = "API")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::login,
        auth::me,
        auth::change_password,
        // Books
        books::list_books,
        books::list_categories,
        books::my_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Requests
        book_requests::create_request,
        book_requests::list_pending,
        book_requests::my_requests,
        book_requests::user_requests,
        book_requests::get_request,
        book_requests::approve_request,
        book_requests::reject_request,
        // Uploads
        uploads::upload_image,
    ),
    components(
        schemas(
            // Auth
            auth::LoginResponse,
            auth::MessageResponse,
            crate::models::user::UserInfo,
            crate::models::user::Role,
            crate::models::user::RegisterUser,
            crate::models::user::LoginRequest,
            crate::models::user::ChangePassword,
            // Books
            crate::models::book::BookView,
            crate::models::book::BookStatus,
            crate::models::book::CirculationFields,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            crate::models::book::BookQuery,
            // Requests
            crate::models::book_request::BookRequest,
            crate::models::book_request::RequestType,
            crate::models::book_request::RequestStatus,
            crate::models::book_request::RequestDetails,
            crate::models::book_request::CreateBookRequest,
            crate::models::book_request::ResolveRequest,
            crate::services::circulation::RequestOutcome,
            book_requests::ResolveResponse,
            // Uploads
            uploads::ImageUpload,
            uploads::UploadResponse,
            // Health
            health::HealthResponse,
            health::ReadinessResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "books", description = "Book catalog"),
        (name = "book-requests", description = "Borrow and return requests"),
        (name = "uploads", description = "Cover image uploads")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
