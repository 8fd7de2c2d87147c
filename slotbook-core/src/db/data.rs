use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The type used for primary keys in the database.
pub type PrimaryKey = i32;

/// The four fixed daily time windows every room is created with.
pub const SLOT_TIME_RANGES: [&str; 4] =
    ["08:00-10:00", "10:00-12:00", "13:00-15:00", "15:00-17:00"];

/// Returned when a column holds a value outside the known set
#[derive(Debug, Error)]
#[error("unrecognized value: {0}")]
pub struct ParseValueError(pub String);

/// A slotbook account
#[derive(Debug, Clone)]
pub struct UserData {
    /// Externally assigned, such as a student number
    pub id: PrimaryKey,
    pub username: String,
    pub name: String,
    /// The argon2 PHC string, never the plaintext
    pub password: String,
    pub role: UserRole,
    /// The single live token, if the user is logged in
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    Student,
    Lecturer,
    Staff,
}

/// A bookable room and its slots
#[derive(Debug, Clone)]
pub struct RoomData {
    pub id: PrimaryKey,
    pub name: String,
    pub capacity: i32,
    pub wifi: bool,
    pub image_url: String,
    pub slots: Vec<SlotData>,
}

/// One of the four daily time windows of a room
#[derive(Debug, Clone)]
pub struct SlotData {
    pub id: PrimaryKey,
    pub room_id: PrimaryKey,
    pub time_range: String,
    pub status: SlotStatus,
    /// The requester of the active booking, if any
    pub user_id: Option<PrimaryKey>,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    Free,
    Pending,
    Reserved,
    Disabled,
}

/// The initial status all four slots of a new room share
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotPolicy {
    Free,
    Disabled,
}

/// An entry in the append-only booking ledger
#[derive(Debug, Clone)]
pub struct BookingData {
    pub id: PrimaryKey,
    pub room_id: PrimaryKey,
    pub slot_id: PrimaryKey,
    /// Snapshot of the room name at booking time
    pub room_name: String,
    pub user_id_booked: PrimaryKey,
    pub user_id_decision: Option<PrimaryKey>,
    pub decision_status: DecisionStatus,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionStatus {
    Pending,
    Approved,
    Rejected,
}

/// A lecturer's verdict on a pending booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Rejected,
}

/// A ledger entry enriched with display data from the joined
/// room, slot, and user rows
#[derive(Debug, Clone)]
pub struct BookingView {
    pub room_name: String,
    pub status: DecisionStatus,
    pub decision_maker_name: Option<String>,
    pub booked_by_name: Option<String>,
    pub created_at: NaiveDateTime,
    pub time_range: Option<String>,
    pub capacity: Option<i32>,
    pub wifi: Option<bool>,
    pub image_url: Option<String>,
}

/// A pending booking awaiting a lecturer's decision
#[derive(Debug, Clone)]
pub struct PendingRequestData {
    pub booking_id: PrimaryKey,
    pub room_id: PrimaryKey,
    pub slot_id: PrimaryKey,
    pub room_name: String,
    pub user_id_booked: PrimaryKey,
    pub created_at: NaiveDateTime,
    pub time_range: String,
    pub image_url: String,
}

/// Aggregate counts shown on the staff/lecturer dashboard
#[derive(Debug, Clone, Copy, Default)]
pub struct DashboardData {
    pub total_rooms: i64,
    pub total_slots: i64,
    pub free_slots: i64,
    pub pending_slots: i64,
    pub reserved_slots: i64,
    pub disabled_slots: i64,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "Student",
            Self::Lecturer => "Lecturer",
            Self::Staff => "Staff",
        }
    }
}

impl SlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pending => "pending",
            Self::Reserved => "reserved",
            Self::Disabled => "disabled",
        }
    }
}

impl DecisionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl SlotPolicy {
    pub fn initial_status(&self) -> SlotStatus {
        match self {
            Self::Free => SlotStatus::Free,
            Self::Disabled => SlotStatus::Disabled,
        }
    }
}

impl Decision {
    pub fn status(&self) -> DecisionStatus {
        match self {
            Self::Approved => DecisionStatus::Approved,
            Self::Rejected => DecisionStatus::Rejected,
        }
    }

    /// The slot status a decided booking releases its slot into
    pub fn slot_status(&self) -> SlotStatus {
        match self {
            Self::Approved => SlotStatus::Reserved,
            Self::Rejected => SlotStatus::Free,
        }
    }
}

impl FromStr for UserRole {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Student" => Ok(Self::Student),
            "Lecturer" => Ok(Self::Lecturer),
            "Staff" => Ok(Self::Staff),
            other => Err(ParseValueError(other.to_string())),
        }
    }
}

impl FromStr for SlotStatus {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Self::Free),
            "pending" => Ok(Self::Pending),
            "reserved" => Ok(Self::Reserved),
            "disabled" => Ok(Self::Disabled),
            other => Err(ParseValueError(other.to_string())),
        }
    }
}

impl FromStr for DecisionStatus {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(ParseValueError(other.to_string())),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
