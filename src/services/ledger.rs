//! In-memory request ledger

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::book_request::{BookRequest, RequestType, Resolution},
};

/// Every request ever filed, in filing order.
///
/// `open` and `resolve` only build the next version of a request; nothing changes
/// until it is passed to `record`, so the caller can persist it first.
#[derive(Debug, Default, Clone)]
pub struct RequestLedger {
    requests: IndexMap<Uuid, BookRequest>,
}

impl RequestLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_requests(requests: impl IntoIterator<Item = BookRequest>) -> Self {
        Self {
            requests: requests.into_iter().map(|r| (r.id, r)).collect(),
        }
    }

    pub fn get(&self, id: Uuid) -> AppResult<&BookRequest> {
        self.requests
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Request with id {} not found", id)))
    }

    /// Outstanding request for a book, if any
    pub fn pending_for(&self, book_id: Uuid) -> Option<&BookRequest> {
        self.requests
            .values()
            .find(|r| r.book_id == book_id && r.is_pending())
    }

    /// Build a new pending request, failing with `Conflict` when the book already has one
    pub fn open(
        &self,
        book_id: Uuid,
        user_email: &str,
        request_type: RequestType,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<BookRequest> {
        if let Some(existing) = self.pending_for(book_id) {
            return Err(AppError::Conflict(format!(
                "Book {} already has a pending {} request",
                book_id,
                existing.request_type.as_str().to_lowercase()
            )));
        }

        Ok(BookRequest::new(book_id, user_email, request_type, notes, now))
    }

    /// Build the resolved version of a pending request
    pub fn resolve(
        &self,
        id: Uuid,
        resolution: Resolution,
        admin_email: &str,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<BookRequest> {
        let request = self.get(id)?;

        if !request.is_pending() {
            return Err(AppError::InvalidState(format!(
                "Request {} has already been processed ({})",
                id, request.status
            )));
        }

        let mut resolved = request.clone();
        resolved.status = resolution.status();
        resolved.processed_at = Some(now);
        resolved.processed_by = Some(admin_email.to_string());
        if notes.is_some() {
            resolved.notes = notes;
        }
        Ok(resolved)
    }

    /// Store a request built by `open` or `resolve`
    pub fn record(&mut self, request: BookRequest) {
        self.requests.insert(request.id, request);
    }

    /// Pending requests, oldest first
    pub fn list_pending(&self) -> Vec<BookRequest> {
        let mut pending: Vec<BookRequest> = self
            .requests
            .values()
            .filter(|r| r.is_pending())
            .cloned()
            .collect();
        // stable: equal timestamps keep filing order
        pending.sort_by_key(|r| r.requested_at);
        pending
    }

    /// All requests filed by a user, newest first
    pub fn list_for_user(&self, email: &str) -> Vec<BookRequest> {
        let mut requests: Vec<BookRequest> = self
            .requests
            .values()
            .filter(|r| r.user_email == email)
            .cloned()
            .collect();
        requests.reverse();
        requests.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        requests
    }

    pub fn iter(&self) -> impl Iterator<Item = &BookRequest> {
        self.requests.values()
    }
}
