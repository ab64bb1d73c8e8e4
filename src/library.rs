use std::{
    collections::{HashMap, hash_map::Entry},
    fmt,
};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    book::{Book, CatalogNumber},
    clock::{Clock, SystemClock},
    error::{LibraryError, LibraryResult},
    events::LibraryEvent,
    loan::{Loan, LoanId},
    observers::LibraryObserver,
    user::{Category, User},
};

/// One row of the open-loan listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenLoan {
    /// Position in the loan log
    pub loan_id: LoanId,
    /// Borrower's display name
    pub user_name: String,
    /// Title of the borrowed book
    pub book_title: String,
    /// When the book is due back
    pub due_at: DateTime<Utc>,
}

/// Registry of books, users and the loan log
pub struct Library {
    /// Books keyed by normalized catalog number
    books: HashMap<CatalogNumber, Book>,
    /// Users keyed by trimmed id
    users: HashMap<String, User>,
    /// Every loan ever opened, in issue order
    loans: Vec<Loan>,
    /// Time source for loans and default return times
    clock: Box<dyn Clock>,
    /// Registered state change observers
    observers: Vec<Box<dyn LibraryObserver>>,
}

// Manual implementation of Debug for Library
impl fmt::Debug for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Library")
            .field("books", &self.books)
            .field("users", &self.users)
            .field("loans", &self.loans)
            .field("now", &self.clock.now())
            .field("observers_count", &self.observers.len())
            .finish()
    }
}

impl Default for Library {
    fn default() -> Self {
        Self::new()
    }
}

impl Library {
    /// Create an empty library on the system clock
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    /// Create an empty library reading time from `clock`
    #[must_use]
    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self {
            books: HashMap::new(),
            users: HashMap::new(),
            loans: Vec::new(),
            clock: Box::new(clock),
            observers: Vec::new(),
        }
    }

    /// Register an observer to be notified of state changes
    pub fn register_observer(&mut self, observer: Box<dyn LibraryObserver>) {
        self.observers.push(observer);
    }

    /// Deliver an event to every observer
    fn notify(observers: &[Box<dyn LibraryObserver>], event: &LibraryEvent) {
        for observer in observers {
            observer.on_event(event);
        }
    }

    /// Add a book to the catalog
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::InvalidIdentifier` or
    /// `LibraryError::InvalidArgument` for malformed input, and
    /// `LibraryError::AlreadyExists` when the normalized catalog number is
    /// taken. An existing record is never replaced.
    pub fn register_book(
        &mut self,
        catalog_number: &str,
        title: &str,
        author: &str,
    ) -> LibraryResult<&Book> {
        let book = Book::register(catalog_number, title, author).inspect_err(|e| {
            tracing::warn!(catalog_number, error = %e, "book registration rejected");
        })?;

        match self.books.entry(book.catalog_number().clone()) {
            Entry::Occupied(entry) => {
                tracing::warn!(catalog_number = %entry.key(), "book already registered");
                Err(LibraryError::AlreadyExists { entity: "book", id: entry.key().to_string() })
            }
            Entry::Vacant(entry) => {
                let event = LibraryEvent::BookRegistered { catalog_number: entry.key().clone() };
                let book = entry.insert(book);
                tracing::debug!(
                    catalog_number = %book.catalog_number(),
                    title = book.title(),
                    "book stored"
                );
                Self::notify(&self.observers, &event);
                Ok(book)
            }
        }
    }

    /// Register a borrower
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::InvalidArgument` for a blank id or name and
    /// `LibraryError::AlreadyExists` when the id is taken.
    pub fn register_user(
        &mut self,
        user_id: &str,
        name: &str,
        category: Category,
    ) -> LibraryResult<&User> {
        let user = User::register(user_id, name, category).inspect_err(|e| {
            tracing::warn!(user_id, error = %e, "user registration rejected");
        })?;

        match self.users.entry(user.id().to_string()) {
            Entry::Occupied(entry) => {
                tracing::warn!(user_id = %entry.key(), "user already registered");
                Err(LibraryError::AlreadyExists { entity: "user", id: entry.key().clone() })
            }
            Entry::Vacant(entry) => {
                let event = LibraryEvent::UserRegistered { user_id: entry.key().clone() };
                let user = entry.insert(user);
                tracing::debug!(user_id = user.id(), %category, "user stored");
                Self::notify(&self.observers, &event);
                Ok(user)
            }
        }
    }

    /// Lend a book to a user
    ///
    /// Both ids are resolved before anything changes.
    ///
    /// # Errors
    ///
    /// - `LibraryError::UserNotFound` if no user has `user_id`
    /// - `LibraryError::BookNotFound` if no book has `catalog_number`
    /// - `LibraryError::NotEligible` if the user is blocked
    /// - `LibraryError::Unavailable` if the book is already out
    pub fn open_loan(&mut self, user_id: &str, catalog_number: &str) -> LibraryResult<&Loan> {
        let user = self
            .users
            .get(user_id.trim())
            .ok_or_else(|| LibraryError::UserNotFound(user_id.to_string()))?;
        let book = CatalogNumber::parse(catalog_number)
            .ok()
            .and_then(|key| self.books.get_mut(&key))
            .ok_or_else(|| LibraryError::BookNotFound(catalog_number.to_string()))?;

        if !user.can_borrow() {
            tracing::warn!(user_id = user.id(), standing = %user.standing(), "loan refused");
            return Err(LibraryError::NotEligible {
                user_id: user.id().to_string(),
                standing: user.standing(),
            });
        }

        let loan_id = LoanId(self.loans.len());
        let loan = Loan::open(loan_id, user, book, self.clock.now())?;

        if !book.loan() {
            tracing::warn!(catalog_number = %book.catalog_number(), "book is not available");
            return Err(LibraryError::Unavailable(book.catalog_number().to_string()));
        }

        let event = LibraryEvent::LoanOpened {
            loan_id,
            user_id: loan.user_id().to_string(),
            catalog_number: loan.catalog_number().clone(),
            due_at: loan.due_at(),
        };
        self.loans.push(loan);
        Self::notify(&self.observers, &event);

        self.loans.get(loan_id.0).ok_or(LibraryError::LoanNotFound(loan_id))
    }

    /// Close a loan and charge any late fee
    ///
    /// `returned_at` defaults to the library clock. Returning a loan twice
    /// yields `0.0` and changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::LoanNotFound` for an unknown loan id.
    pub fn return_loan(
        &mut self,
        loan_id: LoanId,
        returned_at: Option<DateTime<Utc>>,
    ) -> LibraryResult<f64> {
        let returned_at = returned_at.unwrap_or_else(|| self.clock.now());
        let loan = self.loans.get_mut(loan_id.0).ok_or(LibraryError::LoanNotFound(loan_id))?;

        if loan.is_returned() {
            tracing::warn!(%loan_id, "loan already returned");
            return Ok(0.0);
        }

        let user = self
            .users
            .get_mut(loan.user_id())
            .ok_or_else(|| LibraryError::UserNotFound(loan.user_id().to_string()))?;
        let book = self
            .books
            .get_mut(loan.catalog_number())
            .ok_or_else(|| LibraryError::BookNotFound(loan.catalog_number().to_string()))?;

        let was_active = user.can_borrow();
        let fee = loan.return_now(user, book, returned_at)?;

        let mut events =
            vec![LibraryEvent::LoanReturned { loan_id, late_days: loan.late_days(), fee }];
        if fee > 0.0 {
            events.push(LibraryEvent::FeeAccrued {
                user_id: user.id().to_string(),
                amount: fee,
                total: user.accumulated_fees(),
            });
        }
        if was_active && !user.can_borrow() {
            events.push(LibraryEvent::UserBlocked {
                user_id: user.id().to_string(),
                total: user.accumulated_fees(),
            });
        }

        for event in &events {
            Self::notify(&self.observers, event);
        }

        Ok(fee)
    }

    /// Unreturned loans in issue order
    ///
    /// Each call walks the loan log afresh.
    pub fn list_open_loans(&self) -> impl Iterator<Item = OpenLoan> {
        self.loans.iter().filter(|loan| !loan.is_returned()).filter_map(|loan| {
            let user = self.users.get(loan.user_id())?;
            let book = self.books.get(loan.catalog_number())?;
            Some(OpenLoan {
                loan_id: loan.id(),
                user_name: user.name().to_string(),
                book_title: book.title().to_string(),
                due_at: loan.due_at(),
            })
        })
    }

    /// Unreturned loans held by one user, in issue order
    pub fn open_loans_for_user(&self, user_id: &str) -> impl Iterator<Item = &Loan> {
        let user_id = user_id.trim().to_string();
        self.loans.iter().filter(move |loan| !loan.is_returned() && loan.user_id() == user_id)
    }

    /// Every loan of one book, returned ones included, in issue order
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::BookNotFound` if the book is not registered.
    pub fn loan_history_for_book(
        &self,
        catalog_number: &str,
    ) -> LibraryResult<impl Iterator<Item = &Loan>> {
        let key = CatalogNumber::parse(catalog_number)
            .ok()
            .filter(|key| self.books.contains_key(key))
            .ok_or_else(|| LibraryError::BookNotFound(catalog_number.to_string()))?;

        Ok(self.loans.iter().filter(move |loan| *loan.catalog_number() == key))
    }

    /// Look up a book by raw or normalized catalog number
    #[must_use]
    pub fn book(&self, catalog_number: &str) -> Option<&Book> {
        let key = CatalogNumber::parse(catalog_number).ok()?;
        self.books.get(&key)
    }

    /// Look up a user by id
    #[must_use]
    pub fn user(&self, user_id: &str) -> Option<&User> {
        self.users.get(user_id.trim())
    }

    /// Look up a loan by id
    #[must_use]
    pub fn loan(&self, loan_id: LoanId) -> Option<&Loan> {
        self.loans.get(loan_id.0)
    }

    /// The full loan log
    #[must_use]
    pub fn loans(&self) -> &[Loan] {
        &self.loans
    }
}

impl fmt::Display for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} books, {} users, {} open loans",
            self.books.len(),
            self.users.len(),
            self.list_open_loans().count()
        )
    }
}
