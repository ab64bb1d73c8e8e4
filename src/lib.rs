//! Library loan tracking: books, users and loans.
//!
//! This crate implements the loan rules of a small library: who may borrow,
//! when a loan is due, and what a late return costs.

pub mod book;
pub mod clock;
pub mod error;
pub mod events;
pub mod library;
pub mod loan;
pub mod observers;
pub mod report;
pub mod user;

pub use book::{Book, CatalogNumber};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{LibraryError, LibraryResult};
pub use events::LibraryEvent;
pub use library::{Library, OpenLoan};
pub use loan::{Loan, LoanId, LoanStatus};
pub use observers::{DelinquencyAlert, LibraryObserver, TracingObserver};
pub use report::LoanReport;
pub use user::{Category, Standing, User};
