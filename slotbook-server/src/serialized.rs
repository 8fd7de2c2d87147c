//! All schemas that are exposed from endpoints are defined here
//! along with the conversion impls

use serde::Serialize;
use slotbook_core::{
    BookingData, BookingView, DashboardData, PendingRequestData, RoomData, SessionData, SlotData,
    UserData,
};
use utoipa::ToSchema;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Serialize, ToSchema)]
pub struct User {
    id: i32,
    username: String,
    name: String,
    role: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResult {
    token: String,
    user: User,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Slot {
    id: i32,
    room_id: i32,
    time_range: String,
    status: String,
    user_id: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Room {
    id: i32,
    name: String,
    capacity: i32,
    wifi: String,
    image_url: String,
    slots: Vec<Slot>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Booking {
    id: i32,
    room_id: i32,
    slot_id: i32,
    room_name: String,
    status: String,
    created_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryEntry {
    room_name: String,
    status: String,
    booked_by_name: Option<String>,
    decision_maker_name: Option<String>,
    created_at: String,
    time_range: Option<String>,
    capacity: Option<i32>,
    wifi: Option<String>,
    image_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PendingRequest {
    booking_id: i32,
    room_id: i32,
    slot_id: i32,
    room_name: String,
    user_id_booked: i32,
    created_at: String,
    time_range: String,
    image_url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Dashboard {
    total_rooms: i64,
    total_slots: i64,
    free_slots: i64,
    pending_slots: i64,
    reserved_slots: i64,
    disabled_slots: i64,
}

fn wifi_label(wifi: bool) -> String {
    if wifi { "Free Wifi" } else { "No Wifi" }.to_string()
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl ToSerialized<User> for UserData {
    fn to_serialized(&self) -> User {
        User {
            id: self.id,
            username: self.username.clone(),
            name: self.name.clone(),
            role: self.role.as_str().to_string(),
        }
    }
}

impl ToSerialized<LoginResult> for SessionData {
    fn to_serialized(&self) -> LoginResult {
        LoginResult {
            token: self.token.clone(),
            user: self.user.to_serialized(),
        }
    }
}

impl ToSerialized<Slot> for SlotData {
    fn to_serialized(&self) -> Slot {
        Slot {
            id: self.id,
            room_id: self.room_id,
            time_range: self.time_range.clone(),
            status: self.status.as_str().to_string(),
            user_id: self.user_id,
        }
    }
}

impl ToSerialized<Room> for RoomData {
    fn to_serialized(&self) -> Room {
        Room {
            id: self.id,
            name: self.name.clone(),
            capacity: self.capacity,
            wifi: wifi_label(self.wifi),
            image_url: self.image_url.clone(),
            slots: self.slots.to_serialized(),
        }
    }
}

impl ToSerialized<Booking> for BookingData {
    fn to_serialized(&self) -> Booking {
        Booking {
            id: self.id,
            room_id: self.room_id,
            slot_id: self.slot_id,
            room_name: self.room_name.clone(),
            status: self.decision_status.as_str().to_string(),
            created_at: self.created_at.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

impl ToSerialized<HistoryEntry> for BookingView {
    fn to_serialized(&self) -> HistoryEntry {
        HistoryEntry {
            room_name: self.room_name.clone(),
            status: self.status.as_str().to_string(),
            booked_by_name: self.booked_by_name.clone(),
            decision_maker_name: self.decision_maker_name.clone(),
            created_at: self.created_at.format(TIMESTAMP_FORMAT).to_string(),
            time_range: self.time_range.clone(),
            capacity: self.capacity,
            wifi: self.wifi.map(wifi_label),
            image_url: self.image_url.clone(),
        }
    }
}

impl ToSerialized<PendingRequest> for PendingRequestData {
    fn to_serialized(&self) -> PendingRequest {
        PendingRequest {
            booking_id: self.booking_id,
            room_id: self.room_id,
            slot_id: self.slot_id,
            room_name: self.room_name.clone(),
            user_id_booked: self.user_id_booked,
            created_at: self.created_at.format(TIMESTAMP_FORMAT).to_string(),
            time_range: self.time_range.clone(),
            image_url: self.image_url.clone(),
        }
    }
}

impl ToSerialized<Dashboard> for DashboardData {
    fn to_serialized(&self) -> Dashboard {
        Dashboard {
            total_rooms: self.total_rooms,
            total_slots: self.total_slots,
            free_slots: self.free_slots,
            pending_slots: self.pending_slots,
            reserved_slots: self.reserved_slots,
            disabled_slots: self.disabled_slots,
        }
    }
}
