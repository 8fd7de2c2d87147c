//! In-memory [Database] implementation backing the unit tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;

use crate::{
    BookingData, BookingError, BookingView, DashboardData, Database, DatabaseError, DecisionStatus,
    HistoryScope, NewBooking, NewDecision, NewRoom, NewUser, PendingRequestData, PrimaryKey,
    Result, RoomData, SlotData, SlotStatus, UpdatedRoom, UpdatedUser, UserData, SLOT_TIME_RANGES,
};

#[derive(Debug, Clone)]
struct StoredRoom {
    id: PrimaryKey,
    name: String,
    capacity: i32,
    wifi: bool,
    image_url: String,
}

#[derive(Default)]
struct State {
    users: Vec<UserData>,
    rooms: Vec<StoredRoom>,
    slots: Vec<SlotData>,
    bookings: Vec<BookingData>,
    next_id: PrimaryKey,
}

impl State {
    fn generate_id(&mut self) -> PrimaryKey {
        self.next_id += 1;
        self.next_id
    }

    fn room_data(&self, room: &StoredRoom) -> RoomData {
        RoomData {
            id: room.id,
            name: room.name.clone(),
            capacity: room.capacity,
            wifi: room.wifi,
            image_url: room.image_url.clone(),
            slots: self
                .slots
                .iter()
                .filter(|s| s.room_id == room.id)
                .cloned()
                .collect(),
        }
    }

    fn user_name(&self, user_id: PrimaryKey) -> Option<String> {
        self.users
            .iter()
            .find(|u| u.id == user_id)
            .map(|u| u.name.clone())
    }

    fn view(&self, booking: &BookingData) -> BookingView {
        let slot = self.slots.iter().find(|s| s.id == booking.slot_id);
        let room = self.rooms.iter().find(|r| r.id == booking.room_id);

        BookingView {
            room_name: booking.room_name.clone(),
            status: booking.decision_status,
            decision_maker_name: booking.user_id_decision.and_then(|id| self.user_name(id)),
            booked_by_name: self.user_name(booking.user_id_booked),
            created_at: booking.created_at,
            time_range: slot.map(|s| s.time_range.clone()),
            capacity: room.map(|r| r.capacity),
            wifi: room.map(|r| r.wifi),
            image_url: room.map(|r| r.image_url.clone()),
        }
    }
}

pub struct MemoryDatabase {
    state: Mutex<State>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDatabase {
    /// Drops every slot of a room, modeling rows removed outside the
    /// normal creation flow
    pub fn strip_slots(&self, room_id: PrimaryKey) {
        self.state.lock().slots.retain(|s| s.room_id != room_id);
    }
}

fn not_found(resource: &'static str, identifier: &'static str) -> DatabaseError {
    DatabaseError::NotFound {
        resource,
        identifier,
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData> {
        self.state
            .lock()
            .users
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or_else(|| not_found("user", "id"))
    }

    async fn user_by_username(&self, username: &str) -> Result<UserData> {
        self.state
            .lock()
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned()
            .ok_or_else(|| not_found("user", "username"))
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        let mut state = self.state.lock();

        if state.users.iter().any(|u| u.id == new_user.id) {
            return Err(DatabaseError::Conflict {
                resource: "user",
                field: "id",
                value: new_user.id.to_string(),
            });
        }

        if state.users.iter().any(|u| u.username == new_user.username) {
            return Err(DatabaseError::Conflict {
                resource: "user",
                field: "username",
                value: new_user.username,
            });
        }

        let user = UserData {
            id: new_user.id,
            username: new_user.username,
            name: new_user.name,
            password: new_user.password,
            role: new_user.role,
            access_token: None,
        };

        state.users.push(user.clone());

        Ok(user)
    }

    async fn update_user(&self, updated_user: UpdatedUser) -> Result<UserData> {
        let mut state = self.state.lock();

        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == updated_user.id)
            .ok_or_else(|| not_found("user", "id"))?;

        if let Some(username) = updated_user.username {
            user.username = username;
        }
        if let Some(name) = updated_user.name {
            user.name = name;
        }
        if let Some(password) = updated_user.password {
            user.password = password;
        }

        Ok(user.clone())
    }

    async fn set_access_token(&self, user_id: PrimaryKey, token: Option<&str>) -> Result<()> {
        let mut state = self.state.lock();

        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| not_found("user", "id"))?;

        user.access_token = token.map(|t| t.to_string());

        Ok(())
    }

    async fn room_by_id(&self, room_id: PrimaryKey) -> Result<RoomData> {
        let state = self.state.lock();

        let room = state
            .rooms
            .iter()
            .find(|r| r.id == room_id)
            .map(|r| state.room_data(r))
            .ok_or_else(|| not_found("room", "id"))?;

        if room.slots.is_empty() {
            return Err(not_found("slots", "room id"));
        }

        Ok(room)
    }

    async fn list_rooms(&self) -> Result<Vec<RoomData>> {
        let state = self.state.lock();

        Ok(state.rooms.iter().map(|r| state.room_data(r)).collect())
    }

    async fn create_room(&self, new_room: NewRoom) -> Result<RoomData> {
        let mut state = self.state.lock();

        if state.rooms.iter().any(|r| r.name == new_room.name) {
            return Err(DatabaseError::Conflict {
                resource: "room",
                field: "name",
                value: new_room.name,
            });
        }

        let room_id = state.generate_id();
        let room = StoredRoom {
            id: room_id,
            name: new_room.name,
            capacity: new_room.capacity,
            wifi: new_room.wifi,
            image_url: new_room.image_url,
        };

        state.rooms.push(room.clone());

        for time_range in SLOT_TIME_RANGES {
            let slot_id = state.generate_id();
            state.slots.push(SlotData {
                id: slot_id,
                room_id,
                time_range: time_range.to_string(),
                status: new_room.policy.initial_status(),
                user_id: None,
                created_at: None,
            });
        }

        Ok(state.room_data(&room))
    }

    async fn update_room(&self, updated_room: UpdatedRoom) -> Result<RoomData> {
        let mut state = self.state.lock();

        let room = state
            .rooms
            .iter_mut()
            .find(|r| r.id == updated_room.id)
            .ok_or_else(|| not_found("room", "id"))?;

        if let Some(name) = updated_room.name {
            room.name = name;
        }
        if let Some(capacity) = updated_room.capacity {
            room.capacity = capacity;
        }
        if let Some(wifi) = updated_room.wifi {
            room.wifi = wifi;
        }
        if let Some(image_url) = updated_room.image_url {
            room.image_url = image_url;
        }

        let room = room.clone();

        Ok(state.room_data(&room))
    }

    async fn slot(&self, room_id: PrimaryKey, slot_id: PrimaryKey) -> Result<SlotData> {
        self.state
            .lock()
            .slots
            .iter()
            .find(|s| s.id == slot_id && s.room_id == room_id)
            .cloned()
            .ok_or_else(|| not_found("slot", "id"))
    }

    async fn set_slot_status_checked(
        &self,
        slot_id: PrimaryKey,
        expected: SlotStatus,
        status: SlotStatus,
    ) -> Result<bool> {
        let mut state = self.state.lock();

        let slot = state
            .slots
            .iter_mut()
            .find(|s| s.id == slot_id && s.status == expected);

        match slot {
            Some(slot) => {
                slot.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_booking(
        &self,
        new_booking: NewBooking,
    ) -> std::result::Result<BookingData, BookingError> {
        let mut state = self.state.lock();

        let already_booked = state.bookings.iter().any(|b| {
            b.user_id_booked == new_booking.user_id && b.created_at.date() == new_booking.day
        });

        if already_booked {
            return Err(BookingError::DuplicateBooking);
        }

        let room_name = state
            .rooms
            .iter()
            .find(|r| r.id == new_booking.room_id)
            .map(|r| r.name.clone())
            .ok_or_else(|| not_found("room", "id"))?;

        let slot = state
            .slots
            .iter_mut()
            .find(|s| s.id == new_booking.slot_id && s.room_id == new_booking.room_id)
            .ok_or_else(|| not_found("slot", "id"))?;

        if slot.status != SlotStatus::Free {
            return Err(BookingError::SlotUnavailable);
        }

        slot.status = SlotStatus::Pending;
        slot.user_id = Some(new_booking.user_id);
        slot.created_at = Some(new_booking.now);

        let booking = BookingData {
            id: state.generate_id(),
            room_id: new_booking.room_id,
            slot_id: new_booking.slot_id,
            room_name,
            user_id_booked: new_booking.user_id,
            user_id_decision: None,
            decision_status: DecisionStatus::Pending,
            created_at: new_booking.now,
        };

        state.bookings.push(booking.clone());

        Ok(booking)
    }

    async fn decide_booking(
        &self,
        decision: NewDecision,
    ) -> std::result::Result<BookingData, BookingError> {
        let mut state = self.state.lock();

        let booking = state
            .bookings
            .iter_mut()
            .find(|b| b.id == decision.booking_id)
            .ok_or_else(|| not_found("booking", "id"))?;

        if booking.decision_status != DecisionStatus::Pending {
            return Err(BookingError::NotPending);
        }

        booking.decision_status = decision.decision.status();
        booking.user_id_decision = Some(decision.approver_id);

        let booking = booking.clone();

        let slot = state
            .slots
            .iter_mut()
            .find(|s| s.id == booking.slot_id && s.status != SlotStatus::Disabled);

        if let Some(slot) = slot {
            slot.status = decision.decision.slot_status();
        }

        Ok(booking)
    }

    async fn reset_day(&self) -> Result<()> {
        let mut state = self.state.lock();

        for slot in state
            .slots
            .iter_mut()
            .filter(|s| s.status != SlotStatus::Disabled)
        {
            slot.status = SlotStatus::Free;
            slot.user_id = None;
        }

        for booking in state
            .bookings
            .iter_mut()
            .filter(|b| b.decision_status == DecisionStatus::Pending)
        {
            booking.decision_status = DecisionStatus::Rejected;
        }

        Ok(())
    }

    async fn booking_for_user_on(
        &self,
        user_id: PrimaryKey,
        day: NaiveDate,
    ) -> Result<BookingData> {
        self.state
            .lock()
            .bookings
            .iter()
            .find(|b| b.user_id_booked == user_id && b.created_at.date() == day)
            .cloned()
            .ok_or_else(|| not_found("booking", "user and day"))
    }

    async fn booking_views(
        &self,
        scope: HistoryScope,
        day: Option<NaiveDate>,
    ) -> Result<Vec<BookingView>> {
        let state = self.state.lock();

        let mut matching: Vec<_> = state
            .bookings
            .iter()
            .filter(|b| match scope {
                HistoryScope::Booker(id) => b.user_id_booked == id,
                HistoryScope::Decider(id) => b.user_id_decision == Some(id),
                HistoryScope::All => true,
            })
            .filter(|b| day.map_or(true, |d| b.created_at.date() == d))
            .collect();

        matching.sort_by_key(|b| b.created_at);

        Ok(matching.into_iter().map(|b| state.view(b)).collect())
    }

    async fn pending_bookings_on(&self, day: NaiveDate) -> Result<Vec<PendingRequestData>> {
        let state = self.state.lock();

        let mut pending: Vec<_> = state
            .bookings
            .iter()
            .filter(|b| b.decision_status == DecisionStatus::Pending && b.created_at.date() == day)
            .collect();

        pending.sort_by_key(|b| b.created_at);

        let mut requests = Vec::with_capacity(pending.len());

        for booking in pending {
            let slot = state.slots.iter().find(|s| s.id == booking.slot_id);
            let room = state.rooms.iter().find(|r| r.id == booking.room_id);

            if let (Some(slot), Some(room)) = (slot, room) {
                requests.push(PendingRequestData {
                    booking_id: booking.id,
                    room_id: booking.room_id,
                    slot_id: booking.slot_id,
                    room_name: booking.room_name.clone(),
                    user_id_booked: booking.user_id_booked,
                    created_at: booking.created_at,
                    time_range: slot.time_range.clone(),
                    image_url: room.image_url.clone(),
                });
            }
        }

        Ok(requests)
    }

    async fn dashboard_counts(&self) -> Result<DashboardData> {
        let state = self.state.lock();

        let count = |status: SlotStatus| {
            state.slots.iter().filter(|s| s.status == status).count() as i64
        };

        Ok(DashboardData {
            total_rooms: state.rooms.len() as i64,
            total_slots: state.slots.len() as i64,
            free_slots: count(SlotStatus::Free),
            pending_slots: count(SlotStatus::Pending),
            reserved_slots: count(SlotStatus::Reserved),
            disabled_slots: count(SlotStatus::Disabled),
        })
    }
}
