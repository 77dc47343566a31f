//! In-process store, used by tests and `storage.backend = "memory"`

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use indexmap::IndexMap;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Book, BookRequest, User},
};

use super::{Snapshot, Store};

#[derive(Default)]
struct Tables {
    books: IndexMap<Uuid, Book>,
    requests: IndexMap<Uuid, BookRequest>,
    users: IndexMap<Uuid, User>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with a snapshot
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        let tables = Tables {
            books: snapshot.books.into_iter().map(|b| (b.id, b)).collect(),
            requests: snapshot.requests.into_iter().map(|r| (r.id, r)).collect(),
            users: snapshot.users.into_iter().map(|u| (u.id, u)).collect(),
        };
        Self {
            tables: Mutex::new(tables),
        }
    }

    fn tables(&self) -> AppResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| AppError::Internal("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn load(&self) -> AppResult<Snapshot> {
        let tables = self.tables()?;
        Ok(Snapshot {
            books: tables.books.values().cloned().collect(),
            requests: tables.requests.values().cloned().collect(),
            users: tables.users.values().cloned().collect(),
        })
    }

    async fn save_book(&self, book: &Book) -> AppResult<()> {
        self.tables()?.books.insert(book.id, book.clone());
        Ok(())
    }

    async fn delete_book(&self, id: Uuid, orphaned: Option<BookRequest>) -> AppResult<()> {
        let mut tables = self.tables()?;
        if !tables.books.contains_key(&id) {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        if let Some(request) = orphaned {
            tables.requests.insert(request.id, request);
        }
        tables.books.shift_remove(&id);
        Ok(())
    }

    async fn save_transition(&self, book: &Book, request: &BookRequest) -> AppResult<()> {
        let mut tables = self.tables()?;
        let duplicate = tables
            .requests
            .values()
            .any(|r| r.book_id == request.book_id && r.is_pending() && r.id != request.id);
        if request.is_pending() && duplicate {
            return Err(AppError::Conflict("Book already has a pending request".to_string()));
        }
        tables.books.insert(book.id, book.clone());
        tables.requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn save_user(&self, user: &User) -> AppResult<()> {
        let mut tables = self.tables()?;
        let taken = tables
            .users
            .values()
            .any(|u| u.email == user.email && u.id != user.id);
        if taken {
            return Err(AppError::Conflict("Email already exists".to_string()));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }
}
