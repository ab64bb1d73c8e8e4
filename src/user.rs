use std::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{LibraryError, LibraryResult};

/// Borrower category, fixed when the user is registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Category {
    /// Enrolled student
    Student,
    /// Teaching staff
    Faculty,
}

impl Category {
    /// Days between issuing a loan and its due date
    #[must_use]
    pub const fn grace_days(self) -> i64 {
        match self {
            Self::Student => 7,
            Self::Faculty => 30,
        }
    }

    /// Grace period as a duration
    #[must_use]
    pub fn grace_period(self) -> Duration {
        Duration::days(self.grace_days())
    }

    /// Late fee charged per whole day past the due date
    #[must_use]
    pub const fn daily_rate(self) -> f64 {
        match self {
            Self::Student => 1.0,
            Self::Faculty => 0.5,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Student => f.write_str("student"),
            Self::Faculty => f.write_str("faculty"),
        }
    }
}

/// Whether a user may borrow
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Standing {
    /// May borrow
    #[default]
    Active,
    /// Fees exceeded the threshold; borrowing is refused
    Blocked,
}

impl fmt::Display for Standing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("active"),
            Self::Blocked => f.write_str("blocked"),
        }
    }
}

/// A registered borrower
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    /// Trimmed unique id
    id: String,
    /// Trimmed display name
    name: String,
    /// Category the loan rules are derived from
    category: Category,
    /// Current standing; only ever moves from active to blocked
    standing: Standing,
    /// Running total of fees charged
    accumulated_fees: f64,
}

impl User {
    /// Fee total above which a user is blocked
    pub const BLOCK_THRESHOLD: f64 = 50.0;

    /// Create an active user with no fees
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::InvalidArgument` if the id or name is blank.
    pub fn register(id: &str, name: &str, category: Category) -> LibraryResult<Self> {
        let id = id.trim();
        let name = name.trim();

        if id.is_empty() {
            return Err(LibraryError::InvalidArgument("user id must not be empty".to_string()));
        }
        if name.is_empty() {
            return Err(LibraryError::InvalidArgument("user name must not be empty".to_string()));
        }

        Ok(Self {
            id: id.to_string(),
            name: name.to_string(),
            category,
            standing: Standing::Active,
            accumulated_fees: 0.0,
        })
    }

    /// True exactly when the user is active
    #[must_use]
    pub fn can_borrow(&self) -> bool {
        self.standing == Standing::Active
    }

    /// Add a fee to the running total, blocking the user once it exceeds
    /// [`User::BLOCK_THRESHOLD`]
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::InvalidArgument` for a negative or non-finite
    /// amount; the total is left unchanged.
    pub fn accrue_fee(&mut self, amount: f64) -> LibraryResult<()> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(LibraryError::InvalidArgument(format!(
                "fee must be a non-negative amount, got {amount}"
            )));
        }

        self.accumulated_fees += amount;

        if self.accumulated_fees > Self::BLOCK_THRESHOLD && self.standing == Standing::Active {
            self.standing = Standing::Blocked;
        }

        Ok(())
    }

    /// Trimmed unique id
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Trimmed display name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Category the loan rules are derived from
    #[must_use]
    pub fn category(&self) -> Category {
        self.category
    }

    /// Current standing
    #[must_use]
    pub fn standing(&self) -> Standing {
        self.standing
    }

    /// Running total of fees charged
    #[must_use]
    pub fn accumulated_fees(&self) -> f64 {
        self.accumulated_fees
    }
}
