//! Book lifecycle state machine
//!
//! ```text
//! available ── request borrow ──> pending_request ── approve ──> borrowed
//!     ^                                 │                          │
//!     └───────────── reject ────────────┘                  request return
//!     ^                                                            v
//!     └──────────── approve ───────── pending_return ── reject ──> borrowed
//! ```
//!
//! Every legal move of a book lives in [`LifecycleEngine::apply`]. The engine is
//! pure: it takes the current book and returns the next version, leaving storage
//! and the request ledger to the caller.

use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, AppResult},
    models::{
        book_request::{BookRequest, RequestType, Resolution},
        Book, Caller, Circulation,
    },
};

/// Something a user or an admin asks to happen to a book
#[derive(Debug, Clone, Copy)]
pub enum Action<'a> {
    RequestBorrow,
    RequestReturn,
    Resolve {
        request: &'a BookRequest,
        resolution: Resolution,
    },
}

impl Action<'_> {
    fn name(&self) -> &'static str {
        match self {
            Action::RequestBorrow => "request borrow",
            Action::RequestReturn => "request return",
            Action::Resolve {
                resolution: Resolution::Approve,
                ..
            } => "approve",
            Action::Resolve {
                resolution: Resolution::Reject,
                ..
            } => "reject",
        }
    }
}

pub struct LifecycleEngine;

impl LifecycleEngine {
    /// Compute the book that results from `action`.
    ///
    /// Fails with `InvalidTransition` when the book's status does not allow the action,
    /// `Authorization` when the caller may not perform it, and `ConsistencyFault` when
    /// a request being resolved does not match the book it points at.
    pub fn apply(book: &Book, caller: &Caller, action: Action<'_>, now: DateTime<Utc>) -> AppResult<Book> {
        let circulation = match (&book.circulation, action) {
            (Circulation::Available, Action::RequestBorrow) => Circulation::PendingRequest {
                requested_by: caller.email.clone(),
                request_date: now,
            },

            (
                Circulation::Borrowed {
                    borrowed_by,
                    borrowed_date,
                },
                Action::RequestReturn,
            ) => {
                if *borrowed_by != caller.email {
                    return Err(AppError::Authorization(
                        "Only the borrower can return this book".to_string(),
                    ));
                }
                Circulation::PendingReturn {
                    borrowed_by: borrowed_by.clone(),
                    borrowed_date: *borrowed_date,
                    return_request_date: now,
                }
            }

            (current, Action::Resolve { request, resolution }) => {
                caller.require_admin()?;
                Self::resolve(book, current, request, resolution, now)?
            }

            (current, action) => {
                return Err(AppError::InvalidTransition(format!(
                    "Cannot {} book {}: book is {}",
                    action.name(),
                    book.id,
                    current.status()
                )))
            }
        };

        let mut next = book.clone();
        next.circulation = circulation;
        Ok(next)
    }

    fn resolve(
        book: &Book,
        current: &Circulation,
        request: &BookRequest,
        resolution: Resolution,
        now: DateTime<Utc>,
    ) -> AppResult<Circulation> {
        if !request.is_pending() {
            return Err(AppError::InvalidState(format!(
                "Request {} has already been processed ({})",
                request.id, request.status
            )));
        }

        let fault = || {
            AppError::ConsistencyFault(format!(
                "book {} is {} but request {} is a {} request from {}",
                book.id,
                current.status(),
                request.id,
                request.request_type,
                request.user_email
            ))
        };

        if request.book_id != book.id {
            return Err(fault());
        }

        match (current, request.request_type, resolution) {
            (Circulation::PendingRequest { requested_by, .. }, RequestType::Borrow, resolution)
                if *requested_by == request.user_email =>
            {
                Ok(match resolution {
                    Resolution::Approve => Circulation::Borrowed {
                        borrowed_by: requested_by.clone(),
                        borrowed_date: now,
                    },
                    Resolution::Reject => Circulation::Available,
                })
            }

            (
                Circulation::PendingReturn {
                    borrowed_by,
                    borrowed_date,
                    ..
                },
                RequestType::Return,
                resolution,
            ) if *borrowed_by == request.user_email => Ok(match resolution {
                Resolution::Approve => Circulation::Available,
                Resolution::Reject => Circulation::Borrowed {
                    borrowed_by: borrowed_by.clone(),
                    borrowed_date: *borrowed_date,
                },
            }),

            _ => Err(fault()),
        }
    }

    /// Check that a book's status agrees with the ledger's pending request for it.
    ///
    /// A pending status needs a pending request of the matching type from the holder;
    /// any other status needs none.
    pub fn verify(book: &Book, pending: Option<&BookRequest>) -> AppResult<()> {
        let agrees = match (&book.circulation, pending) {
            (Circulation::Available | Circulation::Borrowed { .. }, None) => true,
            (Circulation::PendingRequest { requested_by, .. }, Some(request)) => {
                request.request_type == RequestType::Borrow && request.user_email == *requested_by
            }
            (Circulation::PendingReturn { borrowed_by, .. }, Some(request)) => {
                request.request_type == RequestType::Return && request.user_email == *borrowed_by
            }
            _ => false,
        };

        if agrees {
            return Ok(());
        }

        Err(AppError::ConsistencyFault(match pending {
            Some(request) => format!(
                "book {} is {} but has a pending {} request {} from {}",
                book.id,
                book.status(),
                request.request_type,
                request.id,
                request.user_email
            ),
            None => format!("book {} is {} but has no pending request", book.id, book.status()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::models::{book::CreateBook, BookStatus, RequestStatus};

    fn book() -> Book {
        Book::new(
            CreateBook {
                title: "Dune".into(),
                author: "Frank Herbert".into(),
                category: "Fiction".into(),
                isbn: None,
                publisher: None,
                description: None,
                published_date: None,
                cover_image: None,
            },
            Utc::now(),
        )
    }

    fn request(book: &Book, email: &str, request_type: RequestType) -> BookRequest {
        BookRequest::new(book.id, email, request_type, None, Utc::now())
    }

    fn admin() -> Caller {
        Caller::admin("admin@bookies.com")
    }

    #[test]
    fn borrow_approve_sets_borrower_and_clears_requester() {
        let now = Utc::now();
        let user = Caller::user("a@x.com");
        let available = book();

        let pending = LifecycleEngine::apply(&available, &user, Action::RequestBorrow, now).unwrap();
        assert_eq!(pending.status(), BookStatus::PendingRequest);
        assert_eq!(pending.circulation.requested_by(), Some("a@x.com"));

        let borrow = request(&pending, "a@x.com", RequestType::Borrow);
        let later = now + Duration::minutes(5);
        let borrowed = LifecycleEngine::apply(
            &pending,
            &admin(),
            Action::Resolve {
                request: &borrow,
                resolution: Resolution::Approve,
            },
            later,
        )
        .unwrap();

        assert_eq!(
            borrowed.circulation,
            Circulation::Borrowed {
                borrowed_by: "a@x.com".into(),
                borrowed_date: later,
            }
        );
        assert_eq!(borrowed.circulation.requested_by(), None);
    }

    #[test]
    fn rejecting_a_borrow_makes_the_book_available_again() {
        let now = Utc::now();
        let pending =
            LifecycleEngine::apply(&book(), &Caller::user("a@x.com"), Action::RequestBorrow, now).unwrap();
        let borrow = request(&pending, "a@x.com", RequestType::Borrow);

        let rejected = LifecycleEngine::apply(
            &pending,
            &admin(),
            Action::Resolve {
                request: &borrow,
                resolution: Resolution::Reject,
            },
            now,
        )
        .unwrap();

        assert_eq!(rejected.circulation, Circulation::Available);
    }

    #[test]
    fn return_round_trip_restores_the_created_book() {
        let now = Utc::now();
        let user = Caller::user("a@x.com");
        let original = book();

        let mut current = LifecycleEngine::apply(&original, &user, Action::RequestBorrow, now).unwrap();
        let borrow = request(&current, "a@x.com", RequestType::Borrow);
        current = LifecycleEngine::apply(
            &current,
            &admin(),
            Action::Resolve {
                request: &borrow,
                resolution: Resolution::Approve,
            },
            now,
        )
        .unwrap();

        current = LifecycleEngine::apply(&current, &user, Action::RequestReturn, now).unwrap();
        assert_eq!(current.status(), BookStatus::PendingReturn);

        let give_back = request(&current, "a@x.com", RequestType::Return);
        current = LifecycleEngine::apply(
            &current,
            &admin(),
            Action::Resolve {
                request: &give_back,
                resolution: Resolution::Approve,
            },
            now,
        )
        .unwrap();

        assert_eq!(current, original);
    }

    #[test]
    fn rejecting_a_return_keeps_the_borrower() {
        let borrowed_date = Utc::now() - Duration::days(3);
        let mut b = book();
        b.circulation = Circulation::PendingReturn {
            borrowed_by: "a@x.com".into(),
            borrowed_date,
            return_request_date: Utc::now(),
        };
        let give_back = request(&b, "a@x.com", RequestType::Return);

        let kept = LifecycleEngine::apply(
            &b,
            &admin(),
            Action::Resolve {
                request: &give_back,
                resolution: Resolution::Reject,
            },
            Utc::now(),
        )
        .unwrap();

        assert_eq!(
            kept.circulation,
            Circulation::Borrowed {
                borrowed_by: "a@x.com".into(),
                borrowed_date,
            }
        );
    }

    #[test]
    fn borrowing_a_book_that_is_not_available_is_invalid() {
        let now = Utc::now();
        let user = Caller::user("b@x.com");
        let mut b = book();

        for circulation in [
            Circulation::PendingRequest {
                requested_by: "a@x.com".into(),
                request_date: now,
            },
            Circulation::Borrowed {
                borrowed_by: "a@x.com".into(),
                borrowed_date: now,
            },
            Circulation::PendingReturn {
                borrowed_by: "a@x.com".into(),
                borrowed_date: now,
                return_request_date: now,
            },
        ] {
            b.circulation = circulation;
            let result = LifecycleEngine::apply(&b, &user, Action::RequestBorrow, now);
            assert!(matches!(result, Err(AppError::InvalidTransition(_))));
        }
    }

    #[test]
    fn only_the_borrower_may_return() {
        let now = Utc::now();
        let mut b = book();
        b.circulation = Circulation::Borrowed {
            borrowed_by: "a@x.com".into(),
            borrowed_date: now,
        };

        let stranger = LifecycleEngine::apply(&b, &Caller::user("b@x.com"), Action::RequestReturn, now);
        assert!(matches!(stranger, Err(AppError::Authorization(_))));

        let available = LifecycleEngine::apply(&book(), &Caller::user("a@x.com"), Action::RequestReturn, now);
        assert!(matches!(available, Err(AppError::InvalidTransition(_))));
    }

    #[test]
    fn resolving_requires_an_admin() {
        let now = Utc::now();
        let pending =
            LifecycleEngine::apply(&book(), &Caller::user("a@x.com"), Action::RequestBorrow, now).unwrap();
        let borrow = request(&pending, "a@x.com", RequestType::Borrow);

        let result = LifecycleEngine::apply(
            &pending,
            &Caller::user("a@x.com"),
            Action::Resolve {
                request: &borrow,
                resolution: Resolution::Approve,
            },
            now,
        );
        assert!(matches!(result, Err(AppError::Authorization(_))));
    }

    #[test]
    fn resolving_a_mismatched_request_is_a_consistency_fault() {
        let now = Utc::now();
        let mut b = book();
        b.circulation = Circulation::Borrowed {
            borrowed_by: "a@x.com".into(),
            borrowed_date: now,
        };

        // borrowed book, but a borrow request is being approved
        let stale = request(&b, "a@x.com", RequestType::Borrow);
        let result = LifecycleEngine::apply(
            &b,
            &admin(),
            Action::Resolve {
                request: &stale,
                resolution: Resolution::Approve,
            },
            now,
        );
        assert!(matches!(result, Err(AppError::ConsistencyFault(_))));

        // right type, wrong user
        b.circulation = Circulation::PendingRequest {
            requested_by: "a@x.com".into(),
            request_date: now,
        };
        let foreign = request(&b, "b@x.com", RequestType::Borrow);
        let result = LifecycleEngine::apply(
            &b,
            &admin(),
            Action::Resolve {
                request: &foreign,
                resolution: Resolution::Reject,
            },
            now,
        );
        assert!(matches!(result, Err(AppError::ConsistencyFault(_))));
    }

    #[test]
    fn resolved_requests_cannot_drive_a_transition() {
        let now = Utc::now();
        let pending =
            LifecycleEngine::apply(&book(), &Caller::user("a@x.com"), Action::RequestBorrow, now).unwrap();
        let mut borrow = request(&pending, "a@x.com", RequestType::Borrow);
        borrow.status = RequestStatus::Approved;

        let result = LifecycleEngine::apply(
            &pending,
            &admin(),
            Action::Resolve {
                request: &borrow,
                resolution: Resolution::Approve,
            },
            now,
        );
        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }

    #[test]
    fn verify_detects_drift_between_book_and_ledger() {
        let now = Utc::now();
        let mut b = book();
        assert!(LifecycleEngine::verify(&b, None).is_ok());

        b.circulation = Circulation::PendingRequest {
            requested_by: "a@x.com".into(),
            request_date: now,
        };
        assert!(matches!(
            LifecycleEngine::verify(&b, None),
            Err(AppError::ConsistencyFault(_))
        ));

        let borrow = request(&b, "a@x.com", RequestType::Borrow);
        assert!(LifecycleEngine::verify(&b, Some(&borrow)).is_ok());

        let give_back = request(&b, "a@x.com", RequestType::Return);
        assert!(LifecycleEngine::verify(&b, Some(&give_back)).is_err());

        b.circulation = Circulation::Available;
        assert!(LifecycleEngine::verify(&b, Some(&borrow)).is_err());
    }
}
