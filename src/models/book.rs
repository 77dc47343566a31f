//! Book model and circulation state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::not_blank;
use crate::error::AppError;

/// Book status as exposed on the wire and stored in the database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BookStatus {
    Available,
    PendingRequest,
    Borrowed,
    PendingReturn,
}

impl BookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Available => "available",
            BookStatus::PendingRequest => "pending_request",
            BookStatus::Borrowed => "borrowed",
            BookStatus::PendingReturn => "pending_return",
        }
    }

    /// Statuses that require an outstanding request in the ledger
    pub fn is_pending(&self) -> bool {
        matches!(self, BookStatus::PendingRequest | BookStatus::PendingReturn)
    }
}

impl std::fmt::Display for BookStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BookStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(BookStatus::Available),
            "pending_request" => Ok(BookStatus::PendingRequest),
            "borrowed" => Ok(BookStatus::Borrowed),
            "pending_return" => Ok(BookStatus::PendingReturn),
            _ => Err(format!("Invalid book status: {}", s)),
        }
    }
}

/// Circulation state of a book.
///
/// Each variant carries exactly the fields that are allowed for its status, so a
/// book can never hold a borrower while available or a requester while borrowed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Circulation {
    #[default]
    Available,
    PendingRequest {
        requested_by: String,
        request_date: DateTime<Utc>,
    },
    Borrowed {
        borrowed_by: String,
        borrowed_date: DateTime<Utc>,
    },
    PendingReturn {
        borrowed_by: String,
        borrowed_date: DateTime<Utc>,
        return_request_date: DateTime<Utc>,
    },
}

impl Circulation {
    pub fn status(&self) -> BookStatus {
        match self {
            Circulation::Available => BookStatus::Available,
            Circulation::PendingRequest { .. } => BookStatus::PendingRequest,
            Circulation::Borrowed { .. } => BookStatus::Borrowed,
            Circulation::PendingReturn { .. } => BookStatus::PendingReturn,
        }
    }

    pub fn requested_by(&self) -> Option<&str> {
        match self {
            Circulation::PendingRequest { requested_by, .. } => Some(requested_by),
            _ => None,
        }
    }

    pub fn borrowed_by(&self) -> Option<&str> {
        match self {
            Circulation::Borrowed { borrowed_by, .. }
            | Circulation::PendingReturn { borrowed_by, .. } => Some(borrowed_by),
            _ => None,
        }
    }

    /// User currently tied to the book, as requester or borrower
    pub fn holder(&self) -> Option<&str> {
        self.requested_by().or_else(|| self.borrowed_by())
    }

    /// Flatten into the optional wire/database fields
    pub fn fields(&self) -> CirculationFields {
        match self.clone() {
            Circulation::Available => CirculationFields::default(),
            Circulation::PendingRequest {
                requested_by,
                request_date,
            } => CirculationFields {
                requested_by: Some(requested_by),
                request_date: Some(request_date),
                ..Default::default()
            },
            Circulation::Borrowed {
                borrowed_by,
                borrowed_date,
            } => CirculationFields {
                borrowed_by: Some(borrowed_by),
                borrowed_date: Some(borrowed_date),
                ..Default::default()
            },
            Circulation::PendingReturn {
                borrowed_by,
                borrowed_date,
                return_request_date,
            } => CirculationFields {
                borrowed_by: Some(borrowed_by),
                borrowed_date: Some(borrowed_date),
                return_request_date: Some(return_request_date),
                ..Default::default()
            },
        }
    }

    /// Rebuild from a status and its flat fields, rejecting any combination
    /// where a field is present for the wrong status or missing for the right one
    pub fn from_fields(status: BookStatus, fields: CirculationFields) -> Result<Self, String> {
        let CirculationFields {
            requested_by,
            request_date,
            borrowed_by,
            borrowed_date,
            return_request_date,
        } = fields;

        match (
            status,
            requested_by,
            request_date,
            borrowed_by,
            borrowed_date,
            return_request_date,
        ) {
            (BookStatus::Available, None, None, None, None, None) => Ok(Circulation::Available),
            (BookStatus::PendingRequest, Some(requested_by), Some(request_date), None, None, None) => {
                Ok(Circulation::PendingRequest {
                    requested_by,
                    request_date,
                })
            }
            (BookStatus::Borrowed, None, None, Some(borrowed_by), Some(borrowed_date), None) => {
                Ok(Circulation::Borrowed {
                    borrowed_by,
                    borrowed_date,
                })
            }
            (
                BookStatus::PendingReturn,
                None,
                None,
                Some(borrowed_by),
                Some(borrowed_date),
                Some(return_request_date),
            ) => Ok(Circulation::PendingReturn {
                borrowed_by,
                borrowed_date,
                return_request_date,
            }),
            (status, ..) => Err(format!(
                "circulation fields do not match status '{}'",
                status
            )),
        }
    }
}

/// Flat representation of the circulation fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CirculationFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub borrowed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub borrowed_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_request_date: Option<DateTime<Utc>>,
}

/// Book record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "BookView")]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub category: String,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub description: Option<String>,
    pub published_date: Option<String>,
    pub cover_image: Option<String>,
    pub added_date: DateTime<Utc>,
    pub circulation: Circulation,
}

impl Book {
    /// Build a new, available book
    pub fn new(fields: CreateBook, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: fields.title.trim().to_string(),
            author: fields.author.trim().to_string(),
            category: fields.category.trim().to_string(),
            isbn: fields.isbn,
            publisher: fields.publisher,
            description: fields.description,
            published_date: fields.published_date,
            cover_image: fields.cover_image,
            added_date: now,
            circulation: Circulation::Available,
        }
    }

    pub fn status(&self) -> BookStatus {
        self.circulation.status()
    }

    /// Apply an edit to the descriptive metadata. Circulation is never touched here.
    pub fn apply(&mut self, patch: UpdateBook) {
        if let Some(title) = patch.title {
            self.title = title.trim().to_string();
        }
        if let Some(author) = patch.author {
            self.author = author.trim().to_string();
        }
        if let Some(category) = patch.category {
            self.category = category.trim().to_string();
        }
        if let Some(isbn) = patch.isbn {
            self.isbn = isbn;
        }
        if let Some(publisher) = patch.publisher {
            self.publisher = publisher;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if patch.published_date.is_some() {
            self.published_date = patch.published_date;
        }
        if patch.cover_image.is_some() {
            self.cover_image = patch.cover_image;
        }
    }
}

/// Book as serialized in API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookView {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub added_date: DateTime<Utc>,
    pub status: BookStatus,
    #[serde(flatten)]
    pub circulation: CirculationFields,
}

impl From<Book> for BookView {
    fn from(book: Book) -> Self {
        Self {
            status: book.circulation.status(),
            circulation: book.circulation.fields(),
            id: book.id,
            title: book.title,
            author: book.author,
            category: book.category,
            isbn: book.isbn,
            publisher: book.publisher,
            description: book.description,
            published_date: book.published_date,
            cover_image: book.cover_image,
            added_date: book.added_date,
        }
    }
}

/// Internal row structure for database queries
#[derive(Debug, Clone, FromRow)]
pub struct BookRow {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub category: String,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub description: Option<String>,
    pub published_date: Option<String>,
    pub cover_image: Option<String>,
    pub added_date: DateTime<Utc>,
    pub status: String,
    pub requested_by: Option<String>,
    pub request_date: Option<DateTime<Utc>>,
    pub borrowed_by: Option<String>,
    pub borrowed_date: Option<DateTime<Utc>>,
    pub return_request_date: Option<DateTime<Utc>>,
}

impl TryFrom<BookRow> for Book {
    type Error = AppError;

    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        let status: BookStatus = row
            .status
            .parse()
            .map_err(|e: String| AppError::ConsistencyFault(format!("book {}: {}", row.id, e)))?;

        let fields = CirculationFields {
            requested_by: row.requested_by,
            request_date: row.request_date,
            borrowed_by: row.borrowed_by,
            borrowed_date: row.borrowed_date,
            return_request_date: row.return_request_date,
        };
        let circulation = Circulation::from_fields(status, fields)
            .map_err(|e| AppError::ConsistencyFault(format!("book {}: {}", row.id, e)))?;

        Ok(Self {
            id: row.id,
            title: row.title,
            author: row.author,
            category: row.category,
            isbn: row.isbn,
            publisher: row.publisher,
            description: row.description,
            published_date: row.published_date,
            cover_image: row.cover_image,
            added_date: row.added_date,
            circulation,
        })
    }
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBook {
    #[validate(custom(function = "not_blank", message = "Title is required"))]
    pub title: String,
    #[validate(custom(function = "not_blank", message = "Author is required"))]
    pub author: String,
    #[validate(custom(function = "not_blank", message = "Category is required"))]
    pub category: String,
    #[validate(length(min = 10, max = 17, message = "ISBN must be 10 to 17 characters"))]
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub description: Option<String>,
    pub published_date: Option<String>,
    #[validate(url(message = "Cover image must be a URL"))]
    pub cover_image: Option<String>,
}

/// Edit of the descriptive metadata. Status and borrower fields are not editable.
///
/// Absent fields are left unchanged. `isbn`, `publisher` and `description` may be
/// sent as `null` to clear them.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_isbn_edit"))]
pub struct UpdateBook {
    #[validate(custom(function = "not_blank", message = "Title cannot be empty"))]
    pub title: Option<String>,
    #[validate(custom(function = "not_blank", message = "Author cannot be empty"))]
    pub author: Option<String>,
    #[validate(custom(function = "not_blank", message = "Category cannot be empty"))]
    pub category: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub isbn: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub publisher: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub published_date: Option<String>,
    #[validate(url(message = "Cover image must be a URL"))]
    pub cover_image: Option<String>,
}

fn validate_isbn_edit(patch: &UpdateBook) -> Result<(), ValidationError> {
    match patch.isbn {
        Some(Some(ref isbn)) if !(10..=17).contains(&isbn.chars().count()) => {
            let mut error = ValidationError::new("length");
            error.message = Some("ISBN must be 10 to 17 characters".into());
            Err(error)
        }
        _ => Ok(()),
    }
}

/// Book list filter
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Case-insensitive substring matched against title, author and ISBN
    pub search: Option<String>,
    /// Exact category
    pub category: Option<String>,
    pub status: Option<BookStatus>,
}

impl BookQuery {
    pub fn matches(&self, book: &Book) -> bool {
        if let Some(ref category) = self.category {
            if !category.is_empty() && book.category != *category {
                return false;
            }
        }

        if let Some(status) = self.status {
            if book.status() != status {
                return false;
            }
        }

        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                book.title.to_lowercase().contains(&term)
                    || book.author.to_lowercase().contains(&term)
                    || book
                        .isbn
                        .as_deref()
                        .map(|isbn| isbn.to_lowercase().contains(&term))
                        .unwrap_or(false)
            }
        }
    }
}
