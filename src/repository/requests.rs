//! Book requests repository for database operations

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::AppResult,
    models::book_request::{BookRequest, BookRequestRow},
};

#[derive(Clone)]
pub struct RequestsRepository {
    pool: Pool<Postgres>,
}

impl RequestsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Load all requests in the order they were filed
    pub async fn load_all(&self) -> AppResult<Vec<BookRequest>> {
        let rows = sqlx::query_as::<_, BookRequestRow>(
            r#"
            SELECT id, book_id, user_email, request_type, status,
                   requested_at, processed_at, processed_by, notes
            FROM book_requests
            ORDER BY seq
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(BookRequest::try_from).collect()
    }

    /// Insert a request, or record its resolution.
    /// Only the resolution columns change once a request exists.
    pub async fn upsert(conn: &mut PgConnection, request: &BookRequest) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO book_requests (
                id, book_id, user_email, request_type, status,
                requested_at, processed_at, processed_by, notes
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                processed_at = EXCLUDED.processed_at,
                processed_by = EXCLUDED.processed_by,
                notes = EXCLUDED.notes
            "#,
        )
        .bind(request.id)
        .bind(request.book_id)
        .bind(&request.user_email)
        .bind(request.request_type.as_str())
        .bind(request.status.as_str())
        .bind(request.requested_at)
        .bind(request.processed_at)
        .bind(&request.processed_by)
        .bind(&request.notes)
        .execute(conn)
        .await?;

        Ok(())
    }
}
