//! Persistence layer
//!
//! The server keeps books, requests and users in memory and writes every change
//! through a [`Store`] before publishing it. [`Repository`] stores to PostgreSQL,
//! [`memory::MemoryStore`] keeps everything in process.

pub mod books;
pub mod memory;
pub mod requests;
pub mod users;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Book, BookRequest, User},
};

/// Everything the server needs at startup
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// In creation order
    pub books: Vec<Book>,
    /// In filing order
    pub requests: Vec<BookRequest>,
    pub users: Vec<User>,
}

/// Durable storage for books, requests and users.
///
/// Each method is one atomic write: either everything it is given is stored,
/// or nothing is and an error is returned.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Store: Send + Sync {
    /// Load every stored record
    async fn load(&self) -> AppResult<Snapshot>;

    /// Insert or replace a book
    async fn save_book(&self, book: &Book) -> AppResult<()>;

    /// Delete a book, closing its orphaned pending request in the same write
    async fn delete_book(&self, id: Uuid, orphaned: Option<BookRequest>) -> AppResult<()>;

    /// Write a book together with the request that moved it
    async fn save_transition(&self, book: &Book, request: &BookRequest) -> AppResult<()>;

    /// Insert or replace a user
    async fn save_user(&self, user: &User) -> AppResult<()>;
}

/// PostgreSQL store
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub books: books::BooksRepository,
    pub requests: requests::RequestsRepository,
    pub users: users::UsersRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: books::BooksRepository::new(pool.clone()),
            requests: requests::RequestsRepository::new(pool.clone()),
            users: users::UsersRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl Store for Repository {
    async fn load(&self) -> AppResult<Snapshot> {
        Ok(Snapshot {
            books: self.books.load_all().await?,
            requests: self.requests.load_all().await?,
            users: self.users.load_all().await?,
        })
    }

    async fn save_book(&self, book: &Book) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        books::BooksRepository::upsert(&mut tx, book).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_book(&self, id: Uuid, orphaned: Option<BookRequest>) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        if let Some(ref request) = orphaned {
            requests::RequestsRepository::upsert(&mut tx, request).await?;
        }
        books::BooksRepository::delete(&mut tx, id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn save_transition(&self, book: &Book, request: &BookRequest) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        books::BooksRepository::upsert(&mut tx, book).await?;
        requests::RequestsRepository::upsert(&mut tx, request)
            .await
            .map_err(|e| unique_violation_as_conflict(e, "Book already has a pending request"))?;
        tx.commit().await?;
        Ok(())
    }

    async fn save_user(&self, user: &User) -> AppResult<()> {
        self.users
            .upsert(user)
            .await
            .map_err(|e| unique_violation_as_conflict(e, "Email already exists"))
    }
}

/// Map a unique index violation to `Conflict`, leaving other errors untouched
fn unique_violation_as_conflict(err: AppError, message: &str) -> AppError {
    match err {
        AppError::Database(sqlx::Error::Database(ref db)) if db.is_unique_violation() => {
            AppError::Conflict(message.to_string())
        }
        other => other,
    }
}
