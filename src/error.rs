use thiserror::Error;

use crate::{loan::LoanId, user::Standing};

/// Errors raised by the library registry and its records
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LibraryError {
    /// Malformed or empty input
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The catalog number is not 10 or 13 digits once separators are removed
    #[error("invalid catalog number {input:?}: {reason}")]
    InvalidIdentifier { input: String, reason: String },
    /// A record with the same key is already registered
    #[error("{entity} {id} already exists")]
    AlreadyExists { entity: &'static str, id: String },
    /// No user is registered under the id
    #[error("user {0} not found")]
    UserNotFound(String),
    /// No book is registered under the catalog number
    #[error("book {0} not found")]
    BookNotFound(String),
    /// No loan is recorded under the id
    #[error("loan {0} not found")]
    LoanNotFound(LoanId),
    /// The user's standing forbids borrowing
    #[error("user {user_id} cannot borrow: standing is {standing}")]
    NotEligible { user_id: String, standing: Standing },
    /// The book has no free copy
    #[error("book {0} is not available")]
    Unavailable(String),
    /// A due date could not be represented
    #[error("due date overflows the supported time range")]
    ClockOverflow,
}

/// Result alias used throughout the crate
pub type LibraryResult<T> = Result<T, LibraryError>;
