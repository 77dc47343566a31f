//! Catalog management service

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        book::{CreateBook, UpdateBook},
        Book, BookQuery, Caller, Resolution,
    },
    repository::Store,
};

use super::{Library, SharedLibrary};

/// Note recorded on a pending request when its book is deleted
pub const BOOK_DELETED_NOTE: &str = "book deleted";

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
    library: SharedLibrary,
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>, library: SharedLibrary) -> Self {
        Self { store, library }
    }

    /// List books matching a filter, in creation order
    pub async fn list(&self, query: &BookQuery) -> Vec<Book> {
        self.library.lock().await.registry.list(query)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Book> {
        self.library.lock().await.registry.get(id).cloned()
    }

    pub async fn categories(&self) -> Vec<String> {
        self.library.lock().await.registry.categories()
    }

    /// Books the caller has requested, borrowed or is returning
    pub async fn held_by(&self, caller: &Caller) -> Vec<Book> {
        self.library.lock().await.registry.held_by(&caller.email)
    }

    /// Add a book. New books are always available.
    pub async fn create(&self, caller: &Caller, fields: CreateBook) -> AppResult<Book> {
        caller.require_admin()?;

        let book = Book::new(fields, Utc::now());
        let mut library = self.library.lock().await;

        self.store.save_book(&book).await?;
        library.registry.put(book.clone());

        tracing::info!(book_id = %book.id, title = %book.title, by = %caller.email, "Book added");
        Ok(book)
    }

    /// Edit a book's descriptive metadata
    pub async fn update(&self, caller: &Caller, id: Uuid, patch: UpdateBook) -> AppResult<Book> {
        caller.require_admin()?;

        let mut library = self.library.lock().await;
        let mut book = library.registry.get(id)?.clone();
        book.apply(patch);

        self.store.save_book(&book).await?;
        library.registry.put(book.clone());

        tracing::info!(book_id = %id, by = %caller.email, "Book updated");
        Ok(book)
    }

    /// Delete a book. A pending request for it is rejected in the same write.
    pub async fn delete(&self, caller: &Caller, id: Uuid) -> AppResult<()> {
        caller.require_admin()?;

        let mut library = self.library.lock().await;
        let Library { registry, ledger } = &mut *library;
        registry.get(id)?;

        let orphaned = ledger
            .pending_for(id)
            .map(|request| {
                ledger.resolve(
                    request.id,
                    Resolution::Reject,
                    &caller.email,
                    Some(BOOK_DELETED_NOTE.to_string()),
                    Utc::now(),
                )
            })
            .transpose()?;

        self.store.delete_book(id, orphaned.clone()).await?;
        registry.remove(id)?;

        if let Some(request) = orphaned {
            tracing::info!(book_id = %id, request_id = %request.id, "Pending request closed by book deletion");
            ledger.record(request);
        }

        tracing::info!(book_id = %id, by = %caller.email, "Book deleted");
        Ok(())
    }
}
