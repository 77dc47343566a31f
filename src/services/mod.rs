//! Business logic services

pub mod auth;
pub mod catalog;
pub mod circulation;
pub mod ledger;
pub mod lifecycle;
pub mod registry;
pub mod uploads;

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
    models::{Book, BookRequest},
    repository::Store,
};

use self::{ledger::RequestLedger, lifecycle::LifecycleEngine, registry::BookRegistry};

/// Books and their requests.
///
/// Both halves sit behind one lock so that a book and the request that moves it
/// always change together.
#[derive(Debug, Default)]
pub struct Library {
    pub registry: BookRegistry,
    pub ledger: RequestLedger,
}

pub type SharedLibrary = Arc<Mutex<Library>>;

impl Library {
    pub fn new(books: Vec<Book>, requests: Vec<BookRequest>) -> Self {
        Self {
            registry: BookRegistry::from_books(books),
            ledger: RequestLedger::from_requests(requests),
        }
    }

    /// Every disagreement between book statuses and pending requests
    pub fn audit(&self) -> Vec<AppError> {
        let mut faults: Vec<AppError> = self
            .registry
            .iter()
            .filter_map(|book| LifecycleEngine::verify(book, self.ledger.pending_for(book.id)).err())
            .collect();

        for request in self.ledger.iter().filter(|r| r.is_pending()) {
            if !self.registry.contains(request.book_id) {
                faults.push(AppError::ConsistencyFault(format!(
                    "pending request {} points at missing book {}",
                    request.id, request.book_id
                )));
            }
            let others = self
                .ledger
                .iter()
                .filter(|r| r.book_id == request.book_id && r.is_pending())
                .count();
            if others > 1 && self.ledger.pending_for(request.book_id).map(|r| r.id) == Some(request.id) {
                faults.push(AppError::ConsistencyFault(format!(
                    "book {} has {} pending requests",
                    request.book_id, others
                )));
            }
        }

        faults
    }
}

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub catalog: catalog::CatalogService,
    pub circulation: circulation::CirculationService,
    pub uploads: uploads::UploadService,
}

impl Services {
    /// Load everything from the store and build the services on top of it
    pub async fn new(store: Arc<dyn Store>, config: &AppConfig) -> AppResult<Self> {
        let snapshot = store.load().await?;

        tracing::info!(
            books = snapshot.books.len(),
            requests = snapshot.requests.len(),
            users = snapshot.users.len(),
            "Loaded library state"
        );

        let library = Library::new(snapshot.books, snapshot.requests);
        for fault in library.audit() {
            tracing::error!("{}", fault);
        }
        let library: SharedLibrary = Arc::new(Mutex::new(library));

        Ok(Self {
            auth: auth::AuthService::new(store.clone(), config.auth.clone(), snapshot.users),
            catalog: catalog::CatalogService::new(store.clone(), library.clone()),
            circulation: circulation::CirculationService::new(store, library),
            uploads: uploads::UploadService::new(&config.storage, &config.server.public_url),
        })
    }
}
