use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{book::CatalogNumber, loan::LoanId};

/// State transitions reported to observers
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum LibraryEvent {
    /// A book was added to the catalog
    BookRegistered { catalog_number: CatalogNumber },
    /// A user was registered
    UserRegistered { user_id: String },
    /// A book went out on loan
    LoanOpened {
        loan_id: LoanId,
        user_id: String,
        catalog_number: CatalogNumber,
        due_at: DateTime<Utc>,
    },
    /// A loan was closed
    LoanReturned { loan_id: LoanId, late_days: i64, fee: f64 },
    /// A late fee was added to a user's total
    FeeAccrued { user_id: String, amount: f64, total: f64 },
    /// A user's fee total crossed the block threshold
    UserBlocked { user_id: String, total: f64 },
}
