use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    book::{Book, CatalogNumber},
    error::{LibraryError, LibraryResult},
    user::{Category, User},
};

/// Position of a loan in the library's loan log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub struct LoanId(pub usize);

impl fmt::Display for LoanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a loan: open until returned, then terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum LoanStatus {
    /// The book is still out
    Open,
    /// The book came back at the given instant
    Returned(DateTime<Utc>),
}

/// A book lent to a user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Loan {
    /// Position in the loan log
    id: LoanId,
    /// Borrower
    user_id: String,
    /// Borrowed book
    catalog_number: CatalogNumber,
    /// Borrower category captured when the loan was opened
    category: Category,
    /// When the loan was issued
    loaned_at: DateTime<Utc>,
    /// `loaned_at` plus the category grace period
    due_at: DateTime<Utc>,
    /// Open or returned
    status: LoanStatus,
}

impl Loan {
    /// Issue a loan of `book` to `user` at `loaned_at`
    ///
    /// Eligibility and availability are checked by the caller; this only
    /// derives the due date from the user's category.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::ClockOverflow` if the due date is not representable.
    pub fn open(
        id: LoanId,
        user: &User,
        book: &Book,
        loaned_at: DateTime<Utc>,
    ) -> LibraryResult<Self> {
        let category = user.category();
        let due_at = loaned_at
            .checked_add_signed(category.grace_period())
            .ok_or(LibraryError::ClockOverflow)?;

        Ok(Self {
            id,
            user_id: user.id().to_string(),
            catalog_number: book.catalog_number().clone(),
            category,
            loaned_at,
            due_at,
            status: LoanStatus::Open,
        })
    }

    /// Close the loan, put the book back and charge any late fee to the user
    ///
    /// Returns the fee charged. Returning an already returned loan changes
    /// nothing and yields `0.0`.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::InvalidArgument` if `user` or `book` is not the
    /// one this loan was issued for.
    pub fn return_now(
        &mut self,
        user: &mut User,
        book: &mut Book,
        returned_at: DateTime<Utc>,
    ) -> LibraryResult<f64> {
        if self.is_returned() {
            return Ok(0.0);
        }
        if user.id() != self.user_id {
            return Err(LibraryError::InvalidArgument(format!(
                "loan {} belongs to user {}, not {}",
                self.id,
                self.user_id,
                user.id()
            )));
        }
        if book.catalog_number() != &self.catalog_number {
            return Err(LibraryError::InvalidArgument(format!(
                "loan {} is for book {}, not {}",
                self.id,
                self.catalog_number,
                book.catalog_number()
            )));
        }

        let fee = self.fee_at(returned_at);
        if fee > 0.0 {
            user.accrue_fee(fee)?;
        }

        self.status = LoanStatus::Returned(returned_at);
        book.return_item();

        Ok(fee)
    }

    /// Whole days past the due date at `returned_at`, never negative
    ///
    /// Partial days are dropped: a book returned 23 hours late is 0 days late.
    #[must_use]
    pub fn late_days_at(&self, returned_at: DateTime<Utc>) -> i64 {
        returned_at.signed_duration_since(self.due_at).num_days().max(0)
    }

    /// Late fee owed if the loan were returned at `returned_at`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fee_at(&self, returned_at: DateTime<Utc>) -> f64 {
        let late_days = self.late_days_at(returned_at);
        if late_days <= 0 {
            return 0.0;
        }
        late_days as f64 * self.category.daily_rate()
    }

    /// Whole days late, or 0 while the loan is open
    #[must_use]
    pub fn late_days(&self) -> i64 {
        self.returned_at().map_or(0, |at| self.late_days_at(at))
    }

    /// Fee charged on return, or 0 while the loan is open
    #[must_use]
    pub fn calculate_fee(&self) -> f64 {
        self.returned_at().map_or(0.0, |at| self.fee_at(at))
    }

    /// Position in the loan log
    #[must_use]
    pub fn id(&self) -> LoanId {
        self.id
    }

    /// Id of the borrower
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Catalog number of the borrowed book
    #[must_use]
    pub fn catalog_number(&self) -> &CatalogNumber {
        &self.catalog_number
    }

    /// Borrower category captured when the loan was opened
    #[must_use]
    pub fn category(&self) -> Category {
        self.category
    }

    /// Length of the grace period this loan was issued with
    #[must_use]
    pub fn grace_days(&self) -> i64 {
        self.category.grace_days()
    }

    /// When the loan was issued
    #[must_use]
    pub fn loaned_at(&self) -> DateTime<Utc> {
        self.loaned_at
    }

    /// When the book is due back
    #[must_use]
    pub fn due_at(&self) -> DateTime<Utc> {
        self.due_at
    }

    /// Open or returned
    #[must_use]
    pub fn status(&self) -> LoanStatus {
        self.status
    }

    /// True once the book has come back
    #[must_use]
    pub fn is_returned(&self) -> bool {
        matches!(self.status, LoanStatus::Returned(_))
    }

    /// Return time, or `None` while the loan is open
    #[must_use]
    pub fn returned_at(&self) -> Option<DateTime<Utc>> {
        match self.status {
            LoanStatus::Open => None,
            LoanStatus::Returned(at) => Some(at),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::user::Standing;

    fn loaned_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 10, 30, 0).single().expect("valid timestamp")
    }

    fn setup(category: Category) -> (User, Book, Loan) {
        let user = User::register("u1", "Test User", category).expect("valid user");
        let mut book =
            Book::register("9788535902772", "Clean Code", "Robert Martin").expect("valid book");
        assert!(book.loan());
        let loan = Loan::open(LoanId(0), &user, &book, loaned_at()).expect("loan opens");
        (user, book, loan)
    }

    fn assert_fee(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "fee {actual} != {expected}");
    }

    #[test]
    fn test_student_due_in_seven_days() {
        let (_, _, loan) = setup(Category::Student);
        assert_eq!(loan.due_at(), loaned_at() + Duration::days(7));
        assert_eq!(loan.grace_days(), 7);
        assert_eq!(loan.status(), LoanStatus::Open);
    }

    #[test]
    fn test_faculty_due_in_thirty_days() {
        // A faculty grace period of 3 days once slipped through review
        let (_, _, loan) = setup(Category::Faculty);
        assert_eq!(loan.due_at(), loaned_at() + Duration::days(30));
        assert_ne!(loan.due_at(), loaned_at() + Duration::days(3));
    }

    #[test]
    fn test_on_time_return_is_free() {
        let (mut user, mut book, mut loan) = setup(Category::Student);
        let fee = loan.return_now(&mut user, &mut book, loan.due_at()).expect("returns");

        assert_fee(fee, 0.0);
        assert!(book.is_available());
        assert!(loan.is_returned());
        assert_eq!(loan.returned_at(), Some(loan.due_at()));
    }

    #[test]
    fn test_early_return_is_free() {
        let (mut user, mut book, mut loan) = setup(Category::Faculty);
        let fee = loan.return_now(&mut user, &mut book, loaned_at()).expect("returns");

        assert_fee(fee, 0.0);
        assert_eq!(loan.late_days(), 0);
    }

    #[test]
    fn test_student_late_fee() {
        let (mut user, mut book, mut loan) = setup(Category::Student);
        let returned_at = loan.due_at() + Duration::days(3);
        let fee = loan.return_now(&mut user, &mut book, returned_at).expect("returns");

        assert_fee(fee, 3.0);
        assert_fee(user.accumulated_fees(), 3.0);
        assert_eq!(user.standing(), Standing::Active);
        assert_eq!(loan.late_days(), 3);
        assert_fee(loan.calculate_fee(), 3.0);
    }

    #[test]
    fn test_faculty_late_fee_is_half_rate() {
        // The faculty rate was once typed as 5.0 per day
        let (mut user, mut book, mut loan) = setup(Category::Faculty);
        let returned_at = loan.due_at() + Duration::days(5);
        let fee = loan.return_now(&mut user, &mut book, returned_at).expect("returns");

        assert_fee(fee, 2.5);
        assert!((fee - 25.0).abs() > 1.0);
    }

    #[test]
    fn test_partial_days_are_dropped() {
        let (_, _, loan) = setup(Category::Student);
        let almost_a_day = loan.due_at() + Duration::days(1) - Duration::seconds(1);
        let one_day = loan.due_at() + Duration::days(1);

        assert_eq!(loan.late_days_at(almost_a_day), 0);
        assert_fee(loan.fee_at(almost_a_day), 0.0);
        assert_eq!(loan.late_days_at(one_day), 1);
        assert_fee(loan.fee_at(one_day), 1.0);
    }

    #[test]
    fn test_second_return_is_noop() {
        let (mut user, mut book, mut loan) = setup(Category::Student);
        let returned_at = loan.due_at() + Duration::days(4);

        let first = loan.return_now(&mut user, &mut book, returned_at).expect("returns");
        assert_fee(first, 4.0);

        assert!(book.loan());
        let second = loan
            .return_now(&mut user, &mut book, returned_at + Duration::days(10))
            .expect("no-op");

        assert_fee(second, 0.0);
        assert_fee(user.accumulated_fees(), 4.0);
        assert_eq!(loan.returned_at(), Some(returned_at));
        // The no-op leaves the book alone
        assert!(!book.is_available());
    }

    #[test]
    fn test_return_with_wrong_user_is_rejected() {
        let (_, mut book, mut loan) = setup(Category::Student);
        let mut other = User::register("u2", "Other", Category::Student).expect("valid user");

        let result = loan.return_now(&mut other, &mut book, loaned_at());
        assert!(matches!(result, Err(LibraryError::InvalidArgument(_))));
        assert!(!loan.is_returned());
        assert!(!book.is_available());
    }

    #[test]
    fn test_open_loan_has_no_fee() {
        let (_, _, loan) = setup(Category::Student);
        assert_eq!(loan.returned_at(), None);
        assert_fee(loan.calculate_fee(), 0.0);
    }
}
