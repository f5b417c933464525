use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::error::ValidationError;
use crate::utils::query_flag;

/// A book with its reading progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Unique identifier, assigned at creation
    pub id: String,
    pub name: String,
    pub year: Option<i32>,
    pub author: Option<String>,
    pub summary: Option<String>,
    pub publisher: Option<String>,
    pub page_count: u32,
    pub read_page: u32,
    /// Always `read_page == page_count`
    pub finished: bool,
    pub reading: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub inserted_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Book {
    /// Build a new record from validated input.
    pub(crate) fn create(id: String, input: BookInput, now: OffsetDateTime) -> Self {
        let page_count = input.page_count.unwrap_or_default();
        let read_page = input.read_page.unwrap_or_default();

        Self {
            id,
            name: input.name.unwrap_or_default(),
            year: input.year,
            author: input.author,
            summary: input.summary,
            publisher: input.publisher,
            page_count,
            read_page,
            finished: read_page == page_count,
            reading: input.reading.unwrap_or_default(),
            inserted_at: now,
            updated_at: now,
        }
    }

    /// Merge `input` over this record, keeping `id` and `inserted_at`.
    ///
    /// Fails without touching `self` when the merged progress would have
    /// `read_page > page_count`.
    pub(crate) fn merged(&self, input: BookInput, now: OffsetDateTime) -> Result<Self, ValidationError> {
        let page_count = input.page_count.unwrap_or(self.page_count);
        let read_page = input.read_page.unwrap_or(self.read_page);
        if read_page > page_count {
            return Err(ValidationError::ReadPageExceedsPageCount);
        }

        Ok(Self {
            id: self.id.clone(),
            name: input.name.unwrap_or_else(|| self.name.clone()),
            year: input.year.or(self.year),
            author: input.author.or_else(|| self.author.clone()),
            summary: input.summary.or_else(|| self.summary.clone()),
            publisher: input.publisher.or_else(|| self.publisher.clone()),
            page_count,
            read_page,
            finished: read_page == page_count,
            reading: input.reading.unwrap_or(self.reading),
            inserted_at: self.inserted_at,
            updated_at: now,
        })
    }
}

/// Request body for create and update. Absent fields are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookInput {
    pub name: Option<String>,
    pub year: Option<i32>,
    pub author: Option<String>,
    pub summary: Option<String>,
    pub publisher: Option<String>,
    pub page_count: Option<u32>,
    pub read_page: Option<u32>,
    pub reading: Option<bool>,
}

impl BookInput {
    /// Checks the incoming fields on their own; absent page counts count as 0.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => {}
            _ => return Err(ValidationError::NameRequired),
        }

        if self.read_page.unwrap_or_default() > self.page_count.unwrap_or_default() {
            return Err(ValidationError::ReadPageExceedsPageCount);
        }

        Ok(())
    }
}

/// List view of a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookSummary {
    pub id: String,
    pub name: String,
    pub publisher: Option<String>,
}

impl From<&Book> for BookSummary {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id.clone(),
            name: book.name.clone(),
            publisher: book.publisher.clone(),
        }
    }
}

/// Conditions for listing books; all present conditions must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    /// Case-insensitive substring of the name
    pub name: Option<String>,
    pub reading: Option<bool>,
    pub finished: Option<bool>,
}

impl BookFilter {
    pub fn matches(&self, book: &Book) -> bool {
        if let Some(name) = self.name.as_deref().filter(|name| !name.is_empty()) {
            if !book.name.to_lowercase().contains(&name.to_lowercase()) {
                return false;
            }
        }

        self.reading.map_or(true, |reading| book.reading == reading)
            && self.finished.map_or(true, |finished| book.finished == finished)
    }
}

/// Raw `GET /books` query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListBooksQuery {
    pub name: Option<String>,
    pub reading: Option<String>,
    pub finished: Option<String>,
}

impl ListBooksQuery {
    /// Collect decoded query pairs; the first value of a repeated key wins.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "name" => &mut query.name,
                "reading" => &mut query.reading,
                "finished" => &mut query.finished,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        query
    }
}

impl From<ListBooksQuery> for BookFilter {
    fn from(query: ListBooksQuery) -> Self {
        Self {
            name: query.name.filter(|name| !name.is_empty()),
            reading: query.reading.as_deref().map(query_flag),
            finished: query.finished.as_deref().map(query_flag),
        }
    }
}
