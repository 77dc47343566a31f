//! Borrow and return workflow

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::BookView,
        book_request::RequestDetails, user::normalize_email, Book, BookRequest, Caller,
        RequestType, Resolution,
    },
    repository::Store,
};

use super::{
    lifecycle::{Action, LifecycleEngine},
    Library, SharedLibrary,
};

/// A request together with the book it moved
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RequestOutcome {
    pub request: BookRequest,
    #[schema(value_type = BookView)]
    pub book: Book,
}

#[derive(Clone)]
pub struct CirculationService {
    store: Arc<dyn Store>,
    library: SharedLibrary,
}

impl CirculationService {
    pub fn new(store: Arc<dyn Store>, library: SharedLibrary) -> Self {
        Self { store, library }
    }

    /// File a borrow or return request for a book
    pub async fn request(
        &self,
        caller: &Caller,
        book_id: Uuid,
        request_type: RequestType,
        notes: Option<String>,
    ) -> AppResult<RequestOutcome> {
        let now = Utc::now();
        let mut library = self.library.lock().await;
        let Library { registry, ledger } = &mut *library;

        let book = registry.get(book_id)?;
        let request = ledger.open(book_id, &caller.email, request_type, notes, now)?;
        LifecycleEngine::verify(book, None)?;

        let action = match request_type {
            RequestType::Borrow => Action::RequestBorrow,
            RequestType::Return => Action::RequestReturn,
        };
        let book = LifecycleEngine::apply(book, caller, action, now)?;

        self.store.save_transition(&book, &request).await?;
        registry.put(book.clone());
        ledger.record(request.clone());

        tracing::info!(
            book_id = %book.id,
            request_id = %request.id,
            user = %caller.email,
            "{} requested, book is now {}",
            request_type,
            book.status()
        );

        Ok(RequestOutcome { request, book })
    }

    /// Approve or reject a pending request
    pub async fn resolve(
        &self,
        caller: &Caller,
        request_id: Uuid,
        resolution: Resolution,
        notes: Option<String>,
    ) -> AppResult<RequestOutcome> {
        caller.require_admin()?;

        let now = Utc::now();
        let mut library = self.library.lock().await;
        let Library { registry, ledger } = &mut *library;

        let resolved = ledger.resolve(request_id, resolution, &caller.email, notes, now)?;
        let pending = ledger.get(request_id)?;
        let book = registry.get(pending.book_id).map_err(|_| {
            AppError::ConsistencyFault(format!(
                "request {} points at missing book {}",
                pending.id, pending.book_id
            ))
        })?;

        let book = LifecycleEngine::apply(
            book,
            caller,
            Action::Resolve {
                request: pending,
                resolution,
            },
            now,
        )?;

        self.store.save_transition(&book, &resolved).await?;
        registry.put(book.clone());
        ledger.record(resolved.clone());

        tracing::info!(
            book_id = %book.id,
            request_id = %resolved.id,
            admin = %caller.email,
            "{} request {}, book is now {}",
            resolved.request_type,
            resolved.status,
            book.status()
        );

        Ok(RequestOutcome {
            request: resolved,
            book,
        })
    }

    /// Pending requests for review, oldest first
    pub async fn list_pending(&self, caller: &Caller) -> AppResult<Vec<RequestDetails>> {
        caller.require_admin()?;

        let library = self.library.lock().await;
        Ok(library
            .ledger
            .list_pending()
            .into_iter()
            .map(|r| details(&library, r))
            .collect())
    }

    /// Request history of a user, newest first
    pub async fn list_for_user(&self, caller: &Caller, email: &str) -> AppResult<Vec<RequestDetails>> {
        caller.require_self_or_admin(email)?;

        let library = self.library.lock().await;
        Ok(library
            .ledger
            .list_for_user(&normalize_email(email))
            .into_iter()
            .map(|r| details(&library, r))
            .collect())
    }

    /// A single request, visible to its owner and to admins
    pub async fn get_request(&self, caller: &Caller, id: Uuid) -> AppResult<RequestDetails> {
        let library = self.library.lock().await;
        let request = library.ledger.get(id)?.clone();

        if !caller.is_admin && request.user_email != caller.email {
            return Err(AppError::Authorization(
                "Cannot access another user's requests".to_string(),
            ));
        }

        Ok(details(&library, request))
    }

    /// Disagreements between book statuses and pending requests
    pub async fn audit(&self) -> Vec<AppError> {
        self.library.lock().await.audit()
    }
}

fn details(library: &Library, request: BookRequest) -> RequestDetails {
    let book = library.registry.get(request.book_id).ok();
    RequestDetails::new(request, book)
}
