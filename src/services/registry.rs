//! In-memory book registry

use indexmap::IndexMap;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery},
};

/// Current book records, in creation order
#[derive(Debug, Default, Clone)]
pub struct BookRegistry {
    books: IndexMap<Uuid, Book>,
}

impl BookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_books(books: impl IntoIterator<Item = Book>) -> Self {
        Self {
            books: books.into_iter().map(|b| (b.id, b)).collect(),
        }
    }

    pub fn get(&self, id: Uuid) -> AppResult<&Book> {
        self.books
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.books.contains_key(&id)
    }

    /// Insert a new book or replace the stored version of an existing one
    pub fn put(&mut self, book: Book) {
        self.books.insert(book.id, book);
    }

    pub fn remove(&mut self, id: Uuid) -> AppResult<Book> {
        self.books
            .shift_remove(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    pub fn list(&self, filter: &BookQuery) -> Vec<Book> {
        self.books
            .values()
            .filter(|book| filter.matches(book))
            .cloned()
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Book> {
        self.books.values()
    }

    /// Distinct categories in first-seen order
    pub fn categories(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for book in self.books.values() {
            if !seen.contains(&book.category) {
                seen.push(book.category.clone());
            }
        }
        seen
    }

    /// Books requested, borrowed or being returned by `email`
    pub fn held_by(&self, email: &str) -> Vec<Book> {
        self.books
            .values()
            .filter(|book| book.circulation.holder() == Some(email))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}
