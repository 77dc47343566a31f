//! Data models for Bookies

pub mod book;
pub mod book_request;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BookQuery, BookStatus, Circulation};
pub use book_request::{BookRequest, RequestStatus, RequestType, Resolution};
pub use user::{Caller, Role, User};

use std::borrow::Cow;

use validator::ValidationError;

/// Rejects values that are empty once surrounding whitespace is removed
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some(Cow::Borrowed("Value must not be blank"));
        return Err(error);
    }
    Ok(())
}
