//! Book catalog endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppResult,
    models::book::{Book, BookQuery, BookView, CreateBook, UpdateBook},
    AppState,
};

use super::AuthenticatedUser;

/// List books, optionally filtered
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(BookQuery),
    responses(
        (status = 200, description = "Books in creation order", body = Vec<BookView>)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<BookQuery>,
) -> Json<Vec<Book>> {
    Json(state.services.catalog.list(&query).await)
}

/// Distinct book categories
#[utoipa::path(
    get,
    path = "/books/categories",
    tag = "books",
    responses(
        (status = 200, description = "Categories in first-seen order", body = Vec<String>)
    )
)]
pub async fn list_categories(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.services.catalog.categories().await)
}

/// Books the caller has requested, borrowed or is returning
#[utoipa::path(
    get,
    path = "/books/mine",
    tag = "books",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Books held by the caller", body = Vec<BookView>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn my_books(State(state): State<AppState>, user: AuthenticatedUser) -> Json<Vec<Book>> {
    Json(state.services.catalog.held_by(&user.caller()).await)
}

/// Get a book by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = Uuid, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = BookView),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<Book>> {
    let book = state.services.catalog.get(id).await?;
    Ok(Json(book))
}

/// Add a book to the catalog
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = BookView),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Administrator privileges required")
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(book): Json<CreateBook>,
) -> AppResult<(StatusCode, Json<Book>)> {
    book.validate()?;

    let created = state.services.catalog.create(&user.caller(), book).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Edit a book's metadata. Status and borrower fields cannot be changed here.
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Book ID")
    ),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = BookView),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Administrator privileges required"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(patch): Json<UpdateBook>,
) -> AppResult<Json<Book>> {
    patch.validate()?;

    let book = state.services.catalog.update(&user.caller(), id, patch).await?;
    Ok(Json(book))
}

/// Delete a book. Its pending request, if any, is rejected.
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Book ID")
    ),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 403, description = "Administrator privileges required"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete(&user.caller(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
