//! Books repository for database operations

use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookRow},
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Load all books in creation order.
    /// A row whose status and circulation columns disagree fails the whole load.
    pub async fn load_all(&self) -> AppResult<Vec<Book>> {
        let rows = sqlx::query_as::<_, BookRow>(
            r#"
            SELECT id, title, author, category, isbn, publisher, description,
                   published_date, cover_image, added_date, status,
                   requested_by, request_date, borrowed_by, borrowed_date,
                   return_request_date
            FROM books
            ORDER BY added_date, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Book::try_from).collect()
    }

    /// Insert or replace a book
    pub async fn upsert(conn: &mut PgConnection, book: &Book) -> AppResult<()> {
        let fields = book.circulation.fields();

        sqlx::query(
            r#"
            INSERT INTO books (
                id, title, author, category, isbn, publisher, description,
                published_date, cover_image, added_date, status,
                requested_by, request_date, borrowed_by, borrowed_date,
                return_request_date
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16
            )
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                author = EXCLUDED.author,
                category = EXCLUDED.category,
                isbn = EXCLUDED.isbn,
                publisher = EXCLUDED.publisher,
                description = EXCLUDED.description,
                published_date = EXCLUDED.published_date,
                cover_image = EXCLUDED.cover_image,
                status = EXCLUDED.status,
                requested_by = EXCLUDED.requested_by,
                request_date = EXCLUDED.request_date,
                borrowed_by = EXCLUDED.borrowed_by,
                borrowed_date = EXCLUDED.borrowed_date,
                return_request_date = EXCLUDED.return_request_date
            "#,
        )
        .bind(book.id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.category)
        .bind(&book.isbn)
        .bind(&book.publisher)
        .bind(&book.description)
        .bind(&book.published_date)
        .bind(&book.cover_image)
        .bind(book.added_date)
        .bind(book.status().as_str())
        .bind(&fields.requested_by)
        .bind(fields.request_date)
        .bind(&fields.borrowed_by)
        .bind(fields.borrowed_date)
        .bind(fields.return_request_date)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Delete a book row
    pub async fn delete(conn: &mut PgConnection, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        Ok(())
    }
}
