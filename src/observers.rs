use std::cell::Cell;

use crate::events::LibraryEvent;

/// Trait for library state change observation
pub trait LibraryObserver {
    /// Called after a state transition has been applied
    fn on_event(&self, event: &LibraryEvent);
}

/// Logs every transition through `tracing`
#[derive(Debug, Default)]
pub struct TracingObserver;

impl LibraryObserver for TracingObserver {
    fn on_event(&self, event: &LibraryEvent) {
        match event {
            LibraryEvent::BookRegistered { catalog_number } => {
                tracing::info!(%catalog_number, "book registered");
            }
            LibraryEvent::UserRegistered { user_id } => {
                tracing::info!(%user_id, "user registered");
            }
            LibraryEvent::LoanOpened { loan_id, user_id, catalog_number, due_at } => {
                tracing::info!(%loan_id, %user_id, %catalog_number, %due_at, "loan opened");
            }
            LibraryEvent::LoanReturned { loan_id, late_days, fee } => {
                tracing::info!(%loan_id, late_days, fee, "loan returned");
            }
            LibraryEvent::FeeAccrued { user_id, amount, total } => {
                tracing::info!(%user_id, amount, total, "fee accrued");
            }
            LibraryEvent::UserBlocked { user_id, total } => {
                tracing::warn!(%user_id, total, "user blocked for unpaid fees");
            }
        }
    }
}

/// Flags users that just got blocked
#[derive(Debug, Default)]
pub struct DelinquencyAlert {
    /// Number of block events seen
    alerts: Cell<usize>,
}

impl DelinquencyAlert {
    /// Create an observer with no alerts raised
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How many users this observer has seen blocked
    #[must_use]
    pub fn alerts(&self) -> usize {
        self.alerts.get()
    }
}

impl LibraryObserver for DelinquencyAlert {
    fn on_event(&self, event: &LibraryEvent) {
        if let LibraryEvent::UserBlocked { user_id, total } = event {
            self.alerts.set(self.alerts.get().saturating_add(1));
            tracing::warn!(%user_id, total, "ALERT: borrowing suspended until fees are settled");
        }
    }
}

impl<T: LibraryObserver + ?Sized> LibraryObserver for std::rc::Rc<T> {
    fn on_event(&self, event: &LibraryEvent) {
        (**self).on_event(event);
    }
}
