use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

mod data;
pub use data::*;

mod pg;
pub use pg::*;

#[cfg(test)]
pub mod memory;

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A resource already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The resource in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A resource in the database doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
}

/// Failures specific to the booking workflow. The variants that are not
/// plain database errors correspond to rejected state transitions.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Only one booking is allowed per day")]
    DuplicateBooking,
    #[error("Slot is not available for booking")]
    SlotUnavailable,
    #[error("Booking is not in pending status")]
    NotPending,
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

/// Helper trait to reduce boilerplate
pub trait IntoDatabaseError {
    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError;
    fn any(self) -> DatabaseError;
}

/// Helper trait to reduce boilerplate
pub trait DatabaseResult {
    /// Turns the Result into a conflict error if it's Ok()
    fn conflict_or_ok(self, resource: &'static str, field: &'static str, value: &str)
        -> Result<()>;
}

impl<T> DatabaseResult for Result<T> {
    fn conflict_or_ok(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> Result<()> {
        match self {
            Ok(_) => Err(DatabaseError::Conflict {
                resource,
                field,
                value: value.to_string(),
            }),
            Err(e) => match e {
                DatabaseError::NotFound {
                    resource: _,
                    identifier: _,
                } => Ok(()),
                e => Err(e),
            },
        }
    }
}

/// Which side of the ledger a history query is scoped to
#[derive(Debug, Clone, Copy)]
pub enum HistoryScope {
    /// Entries requested by this user
    Booker(PrimaryKey),
    /// Entries decided by this user
    Decider(PrimaryKey),
    /// Every entry
    All,
}

/// Represents a type that can fetch and mutate slotbook data.
///
/// Every multi-row mutation (room + slot creation, booking, decision,
/// end-of-day reset) is a single atomic unit in the implementation.
#[async_trait]
pub trait Database: Send + Sync + 'static {
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData>;
    async fn user_by_username(&self, username: &str) -> Result<UserData>;
    async fn create_user(&self, new_user: NewUser) -> Result<UserData>;
    async fn update_user(&self, updated_user: UpdatedUser) -> Result<UserData>;
    /// Overwrites the stored active token. `None` logs the user out.
    async fn set_access_token(&self, user_id: PrimaryKey, token: Option<&str>) -> Result<()>;

    async fn room_by_id(&self, room_id: PrimaryKey) -> Result<RoomData>;
    async fn list_rooms(&self) -> Result<Vec<RoomData>>;
    async fn create_room(&self, new_room: NewRoom) -> Result<RoomData>;
    async fn update_room(&self, updated_room: UpdatedRoom) -> Result<RoomData>;
    async fn slot(&self, room_id: PrimaryKey, slot_id: PrimaryKey) -> Result<SlotData>;
    /// Conditionally moves a slot from `expected` to `status`, returning
    /// whether a row was changed.
    async fn set_slot_status_checked(
        &self,
        slot_id: PrimaryKey,
        expected: SlotStatus,
        status: SlotStatus,
    ) -> Result<bool>;

    async fn create_booking(
        &self,
        new_booking: NewBooking,
    ) -> std::result::Result<BookingData, BookingError>;
    async fn decide_booking(
        &self,
        decision: NewDecision,
    ) -> std::result::Result<BookingData, BookingError>;
    /// Frees every non-disabled slot and rejects every pending ledger entry
    async fn reset_day(&self) -> Result<()>;

    async fn booking_for_user_on(&self, user_id: PrimaryKey, day: NaiveDate)
        -> Result<BookingData>;
    async fn booking_views(
        &self,
        scope: HistoryScope,
        day: Option<NaiveDate>,
    ) -> Result<Vec<BookingView>>;
    async fn pending_bookings_on(&self, day: NaiveDate) -> Result<Vec<PendingRequestData>>;
    async fn dashboard_counts(&self) -> Result<DashboardData>;
}

#[derive(Debug)]
pub struct NewUser {
    pub id: PrimaryKey,
    pub username: String,
    pub name: String,
    /// Already hashed by the caller
    pub password: String,
    pub role: UserRole,
}

#[derive(Debug, Default)]
pub struct UpdatedUser {
    pub id: PrimaryKey,
    pub username: Option<String>,
    pub name: Option<String>,
    /// Already hashed by the caller
    pub password: Option<String>,
}

#[derive(Debug)]
pub struct NewRoom {
    pub name: String,
    pub capacity: i32,
    pub wifi: bool,
    pub image_url: String,
    /// The status all four created slots start out with
    pub policy: SlotPolicy,
}

#[derive(Debug, Default)]
pub struct UpdatedRoom {
    pub id: PrimaryKey,
    pub name: Option<String>,
    pub capacity: Option<i32>,
    pub wifi: Option<bool>,
    pub image_url: Option<String>,
}

#[derive(Debug)]
pub struct NewBooking {
    pub user_id: PrimaryKey,
    pub room_id: PrimaryKey,
    pub slot_id: PrimaryKey,
    /// The server-local calendar day the daily cap is checked against
    pub day: NaiveDate,
    pub now: NaiveDateTime,
}

#[derive(Debug)]
pub struct NewDecision {
    pub booking_id: PrimaryKey,
    pub approver_id: PrimaryKey,
    pub decision: Decision,
}
