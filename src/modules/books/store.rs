use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use time::OffsetDateTime;
use uuid::Uuid;

use super::error::BookError;
use super::models::{Book, BookFilter, BookInput, BookSummary};

/// Fresh ids are retried this many times when they collide with a stored book.
const MAX_ID_ATTEMPTS: usize = 8;

/// Source of book identifiers.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Source of timestamps for `insertedAt` / `updatedAt`.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

/// Random UUID v4 ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Wall clock in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Insertion-ordered, in-memory collection of books.
///
/// Mutations hold the write lock for the whole check-then-modify step, so
/// readers never see a half-applied change.
pub struct BookStore {
    books: RwLock<Vec<Book>>,
    ids: Box<dyn IdGenerator>,
    clock: Box<dyn Clock>,
}

impl BookStore {
    pub fn new() -> Self {
        Self::with_collaborators(UuidIds, SystemClock)
    }

    pub fn with_collaborators(
        ids: impl IdGenerator + 'static,
        clock: impl Clock + 'static,
    ) -> Self {
        Self {
            books: RwLock::new(Vec::new()),
            ids: Box::new(ids),
            clock: Box::new(clock),
        }
    }

    // Validation runs before any write, so a poisoned guard still holds consistent data.
    fn read(&self) -> RwLockReadGuard<'_, Vec<Book>> {
        self.books.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Book>> {
        self.books.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validate and append a new book, returning its id.
    pub fn create(&self, input: BookInput) -> Result<String, BookError> {
        if let Err(e) = input.validate() {
            tracing::debug!(error = %e, "book creation rejected");
            return Err(e.into());
        }

        let mut books = self.write();
        let id = (0..MAX_ID_ATTEMPTS)
            .map(|_| self.ids.generate())
            .find(|candidate| books.iter().all(|book| &book.id != candidate))
            .ok_or(BookError::IdExhausted {
                attempts: MAX_ID_ATTEMPTS,
            })?;

        let book = Book::create(id.clone(), input, self.clock.now());
        tracing::info!(book_id = %book.id, finished = book.finished, "book created");
        books.push(book);

        Ok(id)
    }

    /// Projections of every book matching `filter`, in insertion order.
    pub fn list(&self, filter: &BookFilter) -> Vec<BookSummary> {
        self.read()
            .iter()
            .filter(|book| filter.matches(book))
            .map(BookSummary::from)
            .collect()
    }

    pub fn get(&self, id: &str) -> Result<Book, BookError> {
        self.read()
            .iter()
            .find(|book| book.id == id)
            .cloned()
            .ok_or_else(|| BookError::not_found(id))
    }

    /// Merge `input` over the stored book and return the new record.
    pub fn update(&self, id: &str, input: BookInput) -> Result<Book, BookError> {
        let mut books = self.write();
        let slot = books
            .iter_mut()
            .find(|book| book.id == id)
            .ok_or_else(|| BookError::not_found(id))?;

        let updated = input
            .validate()
            .and_then(|()| slot.merged(input, self.clock.now()))
            .map_err(|e| {
                tracing::debug!(book_id = %id, error = %e, "book update rejected");
                BookError::from(e)
            })?;

        *slot = updated.clone();
        tracing::info!(book_id = %id, finished = updated.finished, "book updated");

        Ok(updated)
    }

    /// Remove and return the book.
    pub fn delete(&self, id: &str) -> Result<Book, BookError> {
        let mut books = self.write();
        let index = books
            .iter()
            .position(|book| book.id == id)
            .ok_or_else(|| BookError::not_found(id))?;

        let removed = books.remove(index);
        tracing::info!(book_id = %id, "book deleted");

        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

impl Default for BookStore {
    fn default() -> Self {
        Self::new()
    }
}
