//! Borrow / return request endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookView},
        book_request::{BookRequest, CreateBookRequest, RequestDetails, ResolveRequest},
        Resolution,
    },
    services::circulation::RequestOutcome,
    AppState,
};

use super::AuthenticatedUser;

/// Result of an approval or rejection
#[derive(Serialize, ToSchema)]
pub struct ResolveResponse {
    pub request: BookRequest,
    #[schema(value_type = BookView)]
    pub book: Book,
    pub message: String,
}

/// File a borrow or return request
#[utoipa::path(
    post,
    path = "/book-requests",
    tag = "book-requests",
    security(("bearer_auth" = [])),
    request_body = CreateBookRequest,
    responses(
        (status = 201, description = "Request filed", body = RequestOutcome),
        (status = 403, description = "Only the borrower can return a book"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Book already has a pending request"),
        (status = 422, description = "Book status does not allow this request")
    )
)]
pub async fn create_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateBookRequest>,
) -> AppResult<(StatusCode, Json<RequestOutcome>)> {
    body.validate()?;

    let outcome = state
        .services
        .circulation
        .request(&user.caller(), body.book_id, body.request_type, body.notes)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Pending requests, oldest first
#[utoipa::path(
    get,
    path = "/book-requests/pending",
    tag = "book-requests",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Pending requests", body = Vec<RequestDetails>),
        (status = 403, description = "Administrator privileges required")
    )
)]
pub async fn list_pending(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<RequestDetails>>> {
    let requests = state.services.circulation.list_pending(&user.caller()).await?;
    Ok(Json(requests))
}

/// The caller's own requests, newest first
#[utoipa::path(
    get,
    path = "/book-requests/mine",
    tag = "book-requests",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's requests", body = Vec<RequestDetails>)
    )
)]
pub async fn my_requests(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<RequestDetails>>> {
    let caller = user.caller();
    let requests = state
        .services
        .circulation
        .list_for_user(&caller, &caller.email)
        .await?;
    Ok(Json(requests))
}

/// Requests filed by a user
#[utoipa::path(
    get,
    path = "/book-requests/user/{email}",
    tag = "book-requests",
    security(("bearer_auth" = [])),
    params(
        ("email" = String, Path, description = "User email")
    ),
    responses(
        (status = 200, description = "User's requests", body = Vec<RequestDetails>),
        (status = 403, description = "Not the user and not an administrator")
    )
)]
pub async fn user_requests(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(email): Path<String>,
) -> AppResult<Json<Vec<RequestDetails>>> {
    let requests = state
        .services
        .circulation
        .list_for_user(&user.caller(), &email)
        .await?;
    Ok(Json(requests))
}

/// Get a request by ID
#[utoipa::path(
    get,
    path = "/book-requests/{id}",
    tag = "book-requests",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Request ID")
    ),
    responses(
        (status = 200, description = "Request details", body = RequestDetails),
        (status = 403, description = "Not the requester and not an administrator"),
        (status = 404, description = "Request not found")
    )
)]
pub async fn get_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RequestDetails>> {
    let request = state.services.circulation.get_request(&user.caller(), id).await?;
    Ok(Json(request))
}

/// Approve a pending request
#[utoipa::path(
    post,
    path = "/book-requests/{id}/approve",
    tag = "book-requests",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Request ID")
    ),
    request_body(content = ResolveRequest, description = "Optional admin notes"),
    responses(
        (status = 200, description = "Request approved", body = ResolveResponse),
        (status = 403, description = "Administrator privileges required"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request already processed"),
        (status = 500, description = "Book and request disagree")
    )
)]
pub async fn approve_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    body: Option<Json<ResolveRequest>>,
) -> AppResult<Json<ResolveResponse>> {
    resolve(state, user, id, Resolution::Approve, body).await
}

/// Reject a pending request
#[utoipa::path(
    post,
    path = "/book-requests/{id}/reject",
    tag = "book-requests",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Request ID")
    ),
    request_body(content = ResolveRequest, description = "Optional admin notes"),
    responses(
        (status = 200, description = "Request rejected", body = ResolveResponse),
        (status = 403, description = "Administrator privileges required"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request already processed"),
        (status = 500, description = "Book and request disagree")
    )
)]
pub async fn reject_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    body: Option<Json<ResolveRequest>>,
) -> AppResult<Json<ResolveResponse>> {
    resolve(state, user, id, Resolution::Reject, body).await
}

async fn resolve(
    state: AppState,
    user: AuthenticatedUser,
    id: Uuid,
    resolution: Resolution,
    body: Option<Json<ResolveRequest>>,
) -> AppResult<Json<ResolveResponse>> {
    let body = body.map(|Json(body)| body).unwrap_or_default();
    body.validate()?;

    let RequestOutcome { request, book } = state
        .services
        .circulation
        .resolve(&user.caller(), id, resolution, body.notes)
        .await?;

    let message = match resolution {
        Resolution::Approve => format!("{} request approved", request.request_type.as_str().to_lowercase()),
        Resolution::Reject => format!("{} request rejected", request.request_type.as_str().to_lowercase()),
    };

    Ok(Json(ResolveResponse {
        request,
        book,
        message,
    }))
}
