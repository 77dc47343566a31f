//! Borrow / return request model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;

use super::book::Book;

/// Kind of request a user files against a book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestType {
    Borrow,
    Return,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::Borrow => "BORROW",
            RequestType::Return => "RETURN",
        }
    }
}

impl std::fmt::Display for RequestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RequestType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BORROW" => Ok(RequestType::Borrow),
            "RETURN" => Ok(RequestType::Return),
            _ => Err(format!("Invalid request type: {}", s)),
        }
    }
}

/// Approval status of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::Approved => "APPROVED",
            RequestStatus::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(RequestStatus::Pending),
            "APPROVED" => Ok(RequestStatus::Approved),
            "REJECTED" => Ok(RequestStatus::Rejected),
            _ => Err(format!("Invalid request status: {}", s)),
        }
    }
}

/// Admin decision on a pending request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Approve,
    Reject,
}

impl Resolution {
    /// Terminal status the request ends in
    pub fn status(self) -> RequestStatus {
        match self {
            Resolution::Approve => RequestStatus::Approved,
            Resolution::Reject => RequestStatus::Rejected,
        }
    }
}

/// Borrow or return request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookRequest {
    pub id: Uuid,
    pub book_id: Uuid,
    pub user_email: String,
    pub request_type: RequestType,
    pub status: RequestStatus,
    pub requested_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl BookRequest {
    pub fn new(
        book_id: Uuid,
        user_email: &str,
        request_type: RequestType,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            book_id,
            user_email: user_email.to_string(),
            request_type,
            status: RequestStatus::Pending,
            requested_at: now,
            processed_at: None,
            processed_by: None,
            notes,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}

/// Internal row structure for database queries
#[derive(Debug, Clone, FromRow)]
pub struct BookRequestRow {
    pub id: Uuid,
    pub book_id: Uuid,
    pub user_email: String,
    pub request_type: String,
    pub status: String,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub processed_by: Option<String>,
    pub notes: Option<String>,
}

impl TryFrom<BookRequestRow> for BookRequest {
    type Error = AppError;

    fn try_from(row: BookRequestRow) -> Result<Self, Self::Error> {
        let fault = |e: String| AppError::ConsistencyFault(format!("request {}: {}", row.id, e));

        Ok(Self {
            request_type: row.request_type.parse().map_err(fault)?,
            status: row.status.parse().map_err(fault)?,
            id: row.id,
            book_id: row.book_id,
            user_email: row.user_email,
            requested_at: row.requested_at,
            processed_at: row.processed_at,
            processed_by: row.processed_by,
            notes: row.notes,
        })
    }
}

/// Request with the title and author of its book, for review screens
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestDetails {
    #[serde(flatten)]
    pub request: BookRequest,
    /// Absent once the book has been deleted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book_author: Option<String>,
}

impl RequestDetails {
    pub fn new(request: BookRequest, book: Option<&Book>) -> Self {
        Self {
            book_title: book.map(|b| b.title.clone()),
            book_author: book.map(|b| b.author.clone()),
            request,
        }
    }
}

/// Create request body
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookRequest {
    pub book_id: Uuid,
    pub request_type: RequestType,
    #[validate(length(max = 500, message = "Notes must be at most 500 characters"))]
    pub notes: Option<String>,
}

/// Approve / reject body
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    #[validate(length(max = 500, message = "Notes must be at most 500 characters"))]
    pub notes: Option<String>,
}
