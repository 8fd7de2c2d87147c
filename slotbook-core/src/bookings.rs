use std::sync::Arc;

use chrono::{Local, NaiveDate};

use crate::{
    BookingData, BookingError, BookingView, Database, DatabaseError, Decision, HistoryScope,
    NewBooking, NewDecision, PendingRequestData, PrimaryKey,
};

/// Orchestrates slot reservation, the daily booking cap, and the
/// approve/reject lifecycle. All multi-row mutations happen inside a
/// single storage transaction.
pub struct Bookings<Db> {
    db: Arc<Db>,
}

/// Optional narrowing of a history query to a single calendar day
#[derive(Debug, Default, Clone, Copy)]
pub struct HistoryFilter {
    pub date: Option<NaiveDate>,
    pub today: bool,
}

impl HistoryFilter {
    fn day(&self) -> Option<NaiveDate> {
        if self.today {
            Some(today())
        } else {
            self.date
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

impl<Db> Bookings<Db>
where
    Db: Database,
{
    pub fn new(db: &Arc<Db>) -> Self {
        Self { db: db.clone() }
    }

    /// Books a free slot for the user, moving it to pending and
    /// appending a ledger entry. At most one booking per user per
    /// server-local calendar day.
    pub async fn book_slot(
        &self,
        user_id: PrimaryKey,
        room_id: PrimaryKey,
        slot_id: PrimaryKey,
    ) -> Result<BookingData, BookingError> {
        let now = Local::now().naive_local();

        self.db
            .create_booking(NewBooking {
                user_id,
                room_id,
                slot_id,
                day: now.date(),
                now,
            })
            .await
    }

    /// Applies a lecturer's verdict to a pending booking and releases
    /// the slot accordingly. A slot disabled in the interim is left
    /// untouched while the ledger update still goes through.
    pub async fn decide(
        &self,
        approver_id: PrimaryKey,
        booking_id: PrimaryKey,
        decision: Decision,
    ) -> Result<BookingData, BookingError> {
        self.db
            .decide_booking(NewDecision {
                booking_id,
                approver_id,
                decision,
            })
            .await
    }

    /// Frees every non-disabled slot and rejects every still-pending
    /// ledger entry. Running it twice in a day is a no-op beyond the
    /// first invocation.
    pub async fn end_of_day_reset(&self) -> Result<(), DatabaseError> {
        log::info!("Resetting slots and rejecting leftover pending bookings");
        self.db.reset_day().await
    }

    /// Today's booking for the user, if one exists
    pub async fn current_booking(&self, user_id: PrimaryKey) -> Result<BookingData, DatabaseError> {
        self.db.booking_for_user_on(user_id, today()).await
    }

    /// Ledger entries enriched with display data, scoped to the
    /// requesting side of the ledger
    pub async fn history(
        &self,
        scope: HistoryScope,
        filter: HistoryFilter,
    ) -> Result<Vec<BookingView>, DatabaseError> {
        self.db.booking_views(scope, filter.day()).await
    }

    /// Today's pending bookings awaiting a decision, oldest first
    pub async fn pending_requests(&self) -> Result<Vec<PendingRequestData>, DatabaseError> {
        self.db.pending_bookings_on(today()).await
    }
}
