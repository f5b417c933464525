use thiserror::Error;

/// Input rejected before any mutation of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("name required")]
    NameRequired,

    #[error("readPage exceeds pageCount")]
    ReadPageExceedsPageCount,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("book '{id}' not found")]
    NotFound { id: String },

    #[error("could not allocate a unique book id after {attempts} attempts")]
    IdExhausted { attempts: usize },
}

impl BookError {
    pub(crate) fn not_found(id: &str) -> Self {
        Self::NotFound { id: id.to_string() }
    }
}
