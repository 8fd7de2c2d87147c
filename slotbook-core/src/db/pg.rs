use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{
    error::DatabaseError as SqlxDatabaseError, postgres::PgPoolOptions, postgres::PgRow,
    Error as SqlxError, PgPool, Row,
};

use crate::{
    BookingData, BookingError, BookingView, DashboardData, Database, DatabaseError,
    DatabaseResult, HistoryScope, IntoDatabaseError, NewBooking, NewDecision, NewRoom, NewUser,
    ParseValueError, PendingRequestData, PrimaryKey, Result, RoomData, SlotData, SlotStatus,
    UpdatedRoom, UpdatedUser, UserData, SLOT_TIME_RANGES,
};

/// A postgres database implementation for slotbook
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    pub async fn new(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| DatabaseError::Internal(Box::new(e)))?;

        Ok(Self { pool })
    }

    async fn room_slots(&self, room_id: PrimaryKey) -> Result<Vec<SlotData>> {
        let rows = sqlx::query("SELECT * FROM slots WHERE room_id = $1 ORDER BY slot_id")
            .bind(room_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())?;

        rows.iter().map(slot_from_row).collect()
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData> {
        let row = sqlx::query("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("user", "id"))?;

        user_from_row(&row)
    }

    async fn user_by_username(&self, username: &str) -> Result<UserData> {
        let row = sqlx::query("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("user", "username"))?;

        user_from_row(&row)
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        self.user_by_id(new_user.id)
            .await
            .conflict_or_ok("user", "id", &new_user.id.to_string())?;

        self.user_by_username(&new_user.username)
            .await
            .conflict_or_ok("user", "username", &new_user.username)?;

        sqlx::query(
            "INSERT INTO users (user_id, username, name, password, role, access_token)
             VALUES ($1, $2, $3, $4, $5, NULL)",
        )
        .bind(new_user.id)
        .bind(&new_user.username)
        .bind(&new_user.name)
        .bind(&new_user.password)
        .bind(new_user.role.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| user_conflict(&new_user, e))?;

        self.user_by_id(new_user.id).await
    }

    async fn update_user(&self, updated_user: UpdatedUser) -> Result<UserData> {
        let user = self.user_by_id(updated_user.id).await?;

        sqlx::query("UPDATE users SET username = $1, name = $2, password = $3 WHERE user_id = $4")
            .bind(updated_user.username.unwrap_or(user.username))
            .bind(updated_user.name.unwrap_or(user.name))
            .bind(updated_user.password.unwrap_or(user.password))
            .bind(updated_user.id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        self.user_by_id(updated_user.id).await
    }

    async fn set_access_token(&self, user_id: PrimaryKey, token: Option<&str>) -> Result<()> {
        let result = sqlx::query("UPDATE users SET access_token = $1 WHERE user_id = $2")
            .bind(token)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound {
                resource: "user",
                identifier: "id",
            });
        }

        Ok(())
    }

    async fn room_by_id(&self, room_id: PrimaryKey) -> Result<RoomData> {
        let row = sqlx::query("SELECT * FROM rooms WHERE room_id = $1")
            .bind(room_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("room", "id"))?;

        let slots = self.room_slots(room_id).await?;

        // A room without its four slots is treated as missing
        if slots.is_empty() {
            return Err(DatabaseError::NotFound {
                resource: "slots",
                identifier: "room id",
            });
        }

        room_from_row(&row, slots)
    }

    async fn list_rooms(&self) -> Result<Vec<RoomData>> {
        let rows = sqlx::query("SELECT * FROM rooms ORDER BY room_id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())?;

        let mut rooms = Vec::with_capacity(rows.len());

        for row in rows.iter() {
            let mut room = room_from_row(row, vec![])?;
            room.slots = self.room_slots(room.id).await?;
            rooms.push(room);
        }

        Ok(rooms)
    }

    async fn create_room(&self, new_room: NewRoom) -> Result<RoomData> {
        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;

        let existing = sqlx::query("SELECT room_id FROM rooms WHERE room_name = $1")
            .bind(&new_room.name)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| e.any())?;

        if existing.is_some() {
            return Err(DatabaseError::Conflict {
                resource: "room",
                field: "name",
                value: new_room.name,
            });
        }

        let room_row = sqlx::query(
            "INSERT INTO rooms (room_name, room_capacity, is_wifi_available, image_url)
             VALUES ($1, $2, $3, $4)
             RETURNING room_id",
        )
        .bind(&new_room.name)
        .bind(new_room.capacity)
        .bind(new_room.wifi)
        .bind(&new_room.image_url)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| room_conflict(&new_room.name, e))?;

        let room_id: PrimaryKey = room_row.try_get("room_id").map_err(|e| e.any())?;
        let status = new_room.policy.initial_status();

        for time_range in SLOT_TIME_RANGES {
            sqlx::query("INSERT INTO slots (room_id, time_range, status) VALUES ($1, $2, $3)")
                .bind(room_id)
                .bind(time_range)
                .bind(status.as_str())
                .execute(&mut *tx)
                .await
                .map_err(|e| e.any())?;
        }

        tx.commit().await.map_err(|e| e.any())?;

        self.room_by_id(room_id).await
    }

    async fn update_room(&self, updated_room: UpdatedRoom) -> Result<RoomData> {
        let room = self.room_by_id(updated_room.id).await?;

        sqlx::query(
            "UPDATE rooms SET
                room_name = $1,
                room_capacity = $2,
                is_wifi_available = $3,
                image_url = $4
            WHERE room_id = $5",
        )
        .bind(updated_room.name.unwrap_or(room.name))
        .bind(updated_room.capacity.unwrap_or(room.capacity))
        .bind(updated_room.wifi.unwrap_or(room.wifi))
        .bind(updated_room.image_url.unwrap_or(room.image_url))
        .bind(updated_room.id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.room_by_id(updated_room.id).await
    }

    async fn slot(&self, room_id: PrimaryKey, slot_id: PrimaryKey) -> Result<SlotData> {
        let row = sqlx::query("SELECT * FROM slots WHERE slot_id = $1 AND room_id = $2")
            .bind(slot_id)
            .bind(room_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("slot", "id"))?;

        slot_from_row(&row)
    }

    async fn set_slot_status_checked(
        &self,
        slot_id: PrimaryKey,
        expected: SlotStatus,
        status: SlotStatus,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE slots SET status = $1 WHERE slot_id = $2 AND status = $3")
            .bind(status.as_str())
            .bind(slot_id)
            .bind(expected.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_booking(
        &self,
        new_booking: NewBooking,
    ) -> std::result::Result<BookingData, BookingError> {
        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;

        let existing = sqlx::query(
            "SELECT booking_id FROM booking_history
             WHERE user_id_booked = $1 AND created_at::date = $2",
        )
        .bind(new_booking.user_id)
        .bind(new_booking.day)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| e.any())?;

        if existing.is_some() {
            return Err(BookingError::DuplicateBooking);
        }

        let room_row = sqlx::query("SELECT room_name FROM rooms WHERE room_id = $1")
            .bind(new_booking.room_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| e.not_found_or("room", "id"))?;

        let room_name: String = room_row.try_get("room_name").map_err(|e| e.any())?;

        let reserved = sqlx::query(
            "UPDATE slots SET status = 'pending', user_id = $1, created_at = $2
             WHERE slot_id = $3 AND room_id = $4 AND status = 'free'",
        )
        .bind(new_booking.user_id)
        .bind(new_booking.now)
        .bind(new_booking.slot_id)
        .bind(new_booking.room_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| e.any())?;

        if reserved.rows_affected() == 0 {
            let slot = sqlx::query("SELECT slot_id FROM slots WHERE slot_id = $1 AND room_id = $2")
                .bind(new_booking.slot_id)
                .bind(new_booking.room_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| e.any())?;

            return match slot {
                Some(_) => Err(BookingError::SlotUnavailable),
                None => Err(DatabaseError::NotFound {
                    resource: "slot",
                    identifier: "id",
                }
                .into()),
            };
        }

        let booking_row = sqlx::query(
            "INSERT INTO booking_history
                (room_id, slot_id, room_name, user_id_booked, user_id_decision, decision_status, created_at)
             VALUES ($1, $2, $3, $4, NULL, 'pending', $5)
             RETURNING *",
        )
        .bind(new_booking.room_id)
        .bind(new_booking.slot_id)
        .bind(&room_name)
        .bind(new_booking.user_id)
        .bind(new_booking.now)
        .fetch_one(&mut *tx)
        .await
        // A same-day booking racing past the check above lands on the
        // daily unique index instead
        .map_err(booking_conflict)?;

        let booking = booking_from_row(&booking_row)?;

        tx.commit().await.map_err(|e| e.any())?;

        Ok(booking)
    }

    async fn decide_booking(
        &self,
        decision: NewDecision,
    ) -> std::result::Result<BookingData, BookingError> {
        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;

        let row = sqlx::query("SELECT * FROM booking_history WHERE booking_id = $1")
            .bind(decision.booking_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| e.not_found_or("booking", "id"))?;

        let booking = booking_from_row(&row)?;

        let updated = sqlx::query(
            "UPDATE booking_history SET decision_status = $1, user_id_decision = $2
             WHERE booking_id = $3 AND decision_status = 'pending'",
        )
        .bind(decision.decision.status().as_str())
        .bind(decision.approver_id)
        .bind(decision.booking_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| e.any())?;

        if updated.rows_affected() == 0 {
            return Err(BookingError::NotPending);
        }

        // Disabled wins: a slot toggled off mid-workflow is left untouched
        sqlx::query("UPDATE slots SET status = $1 WHERE slot_id = $2 AND status != 'disabled'")
            .bind(decision.decision.slot_status().as_str())
            .bind(booking.slot_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.any())?;

        tx.commit().await.map_err(|e| e.any())?;

        Ok(BookingData {
            user_id_decision: Some(decision.approver_id),
            decision_status: decision.decision.status(),
            ..booking
        })
    }

    async fn reset_day(&self) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;

        sqlx::query("UPDATE slots SET status = 'free', user_id = NULL WHERE status != 'disabled'")
            .execute(&mut *tx)
            .await
            .map_err(|e| e.any())?;

        sqlx::query(
            "UPDATE booking_history SET decision_status = 'rejected'
             WHERE decision_status = 'pending'",
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| e.any())?;

        tx.commit().await.map_err(|e| e.any())
    }

    async fn booking_for_user_on(
        &self,
        user_id: PrimaryKey,
        day: NaiveDate,
    ) -> Result<BookingData> {
        let row = sqlx::query(
            "SELECT * FROM booking_history
             WHERE user_id_booked = $1 AND created_at::date = $2",
        )
        .bind(user_id)
        .bind(day)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("booking", "user and day"))?;

        booking_from_row(&row)
    }

    async fn booking_views(
        &self,
        scope: HistoryScope,
        day: Option<NaiveDate>,
    ) -> Result<Vec<BookingView>> {
        let mut sql = String::from(
            "SELECT bh.room_name, bh.decision_status, bh.created_at,
                    s.time_range, r.room_capacity, r.is_wifi_available, r.image_url,
                    booker.name AS booked_by_name, decider.name AS decision_maker_name
             FROM booking_history bh
                 LEFT JOIN slots s ON bh.slot_id = s.slot_id
                 LEFT JOIN rooms r ON bh.room_id = r.room_id
                 LEFT JOIN users booker ON bh.user_id_booked = booker.user_id
                 LEFT JOIN users decider ON bh.user_id_decision = decider.user_id",
        );

        match scope {
            HistoryScope::Booker(_) => sql.push_str(" WHERE bh.user_id_booked = $1"),
            HistoryScope::Decider(_) => sql.push_str(" WHERE bh.user_id_decision = $1"),
            HistoryScope::All => {}
        }

        if day.is_some() {
            if matches!(scope, HistoryScope::All) {
                sql.push_str(" WHERE bh.created_at::date = $1");
            } else {
                sql.push_str(" AND bh.created_at::date = $2");
            }
        }

        sql.push_str(" ORDER BY bh.created_at");

        let mut query = sqlx::query(&sql);

        match scope {
            HistoryScope::Booker(id) | HistoryScope::Decider(id) => query = query.bind(id),
            HistoryScope::All => {}
        }

        if let Some(day) = day {
            query = query.bind(day);
        }

        let rows = query.fetch_all(&self.pool).await.map_err(|e| e.any())?;

        rows.iter()
            .map(|row| {
                let status: String = row.try_get("decision_status").map_err(|e| e.any())?;

                Ok(BookingView {
                    room_name: row.try_get("room_name").map_err(|e| e.any())?,
                    status: parse_value(&status)?,
                    decision_maker_name: row
                        .try_get("decision_maker_name")
                        .map_err(|e| e.any())?,
                    booked_by_name: row.try_get("booked_by_name").map_err(|e| e.any())?,
                    created_at: row.try_get("created_at").map_err(|e| e.any())?,
                    time_range: row.try_get("time_range").map_err(|e| e.any())?,
                    capacity: row.try_get("room_capacity").map_err(|e| e.any())?,
                    wifi: row.try_get("is_wifi_available").map_err(|e| e.any())?,
                    image_url: row.try_get("image_url").map_err(|e| e.any())?,
                })
            })
            .collect()
    }

    async fn pending_bookings_on(&self, day: NaiveDate) -> Result<Vec<PendingRequestData>> {
        let rows = sqlx::query(
            "SELECT bh.booking_id, bh.room_id, bh.slot_id, bh.room_name,
                    bh.user_id_booked, bh.created_at, s.time_range, r.image_url
             FROM booking_history bh
                 INNER JOIN slots s ON bh.slot_id = s.slot_id
                 INNER JOIN rooms r ON bh.room_id = r.room_id
             WHERE bh.decision_status = 'pending' AND bh.created_at::date = $1
             ORDER BY bh.created_at ASC",
        )
        .bind(day)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        rows.iter()
            .map(|row| {
                Ok(PendingRequestData {
                    booking_id: row.try_get("booking_id").map_err(|e| e.any())?,
                    room_id: row.try_get("room_id").map_err(|e| e.any())?,
                    slot_id: row.try_get("slot_id").map_err(|e| e.any())?,
                    room_name: row.try_get("room_name").map_err(|e| e.any())?,
                    user_id_booked: row.try_get("user_id_booked").map_err(|e| e.any())?,
                    created_at: row.try_get("created_at").map_err(|e| e.any())?,
                    time_range: row.try_get("time_range").map_err(|e| e.any())?,
                    image_url: row.try_get("image_url").map_err(|e| e.any())?,
                })
            })
            .collect()
    }

    async fn dashboard_counts(&self) -> Result<DashboardData> {
        let total_rooms: i64 = sqlx::query("SELECT COUNT(*) AS count FROM rooms")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.any())?
            .try_get("count")
            .map_err(|e| e.any())?;

        let total_slots: i64 = sqlx::query("SELECT COUNT(*) AS count FROM slots")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.any())?
            .try_get("count")
            .map_err(|e| e.any())?;

        let status_rows = sqlx::query("SELECT status, COUNT(*) AS count FROM slots GROUP BY status")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())?;

        let mut counts = DashboardData {
            total_rooms,
            total_slots,
            ..Default::default()
        };

        for row in status_rows.iter() {
            let status: String = row.try_get("status").map_err(|e| e.any())?;
            let count: i64 = row.try_get("count").map_err(|e| e.any())?;

            match parse_value::<SlotStatus>(&status)? {
                SlotStatus::Free => counts.free_slots = count,
                SlotStatus::Pending => counts.pending_slots = count,
                SlotStatus::Reserved => counts.reserved_slots = count,
                SlotStatus::Disabled => counts.disabled_slots = count,
            }
        }

        Ok(counts)
    }
}

fn is_unique_violation(err: &SqlxError) -> bool {
    matches!(err, SqlxError::Database(e) if e.is_unique_violation())
}

/// The booking INSERT can only violate the daily unique index
fn booking_conflict(err: SqlxError) -> BookingError {
    if is_unique_violation(&err) {
        BookingError::DuplicateBooking
    } else {
        BookingError::Db(err.any())
    }
}

fn user_conflict(new_user: &NewUser, err: SqlxError) -> DatabaseError {
    match &err {
        SqlxError::Database(e) if e.is_unique_violation() => {
            if e.constraint() == Some("users_pkey") {
                DatabaseError::Conflict {
                    resource: "user",
                    field: "id",
                    value: new_user.id.to_string(),
                }
            } else {
                DatabaseError::Conflict {
                    resource: "user",
                    field: "username",
                    value: new_user.username.clone(),
                }
            }
        }
        _ => err.any(),
    }
}

fn room_conflict(name: &str, err: SqlxError) -> DatabaseError {
    if is_unique_violation(&err) {
        DatabaseError::Conflict {
            resource: "room",
            field: "name",
            value: name.to_string(),
        }
    } else {
        err.any()
    }
}

fn parse_value<T>(value: &str) -> Result<T>
where
    T: FromStr<Err = ParseValueError>,
{
    value
        .parse()
        .map_err(|e: ParseValueError| DatabaseError::Internal(Box::new(e)))
}

fn user_from_row(row: &PgRow) -> Result<UserData> {
    let role: String = row.try_get("role").map_err(|e| e.any())?;

    Ok(UserData {
        id: row.try_get("user_id").map_err(|e| e.any())?,
        username: row.try_get("username").map_err(|e| e.any())?,
        name: row.try_get("name").map_err(|e| e.any())?,
        password: row.try_get("password").map_err(|e| e.any())?,
        role: parse_value(&role)?,
        access_token: row.try_get("access_token").map_err(|e| e.any())?,
    })
}

fn room_from_row(row: &PgRow, slots: Vec<SlotData>) -> Result<RoomData> {
    Ok(RoomData {
        id: row.try_get("room_id").map_err(|e| e.any())?,
        name: row.try_get("room_name").map_err(|e| e.any())?,
        capacity: row.try_get("room_capacity").map_err(|e| e.any())?,
        wifi: row.try_get("is_wifi_available").map_err(|e| e.any())?,
        image_url: row.try_get("image_url").map_err(|e| e.any())?,
        slots,
    })
}

fn slot_from_row(row: &PgRow) -> Result<SlotData> {
    let status: String = row.try_get("status").map_err(|e| e.any())?;

    Ok(SlotData {
        id: row.try_get("slot_id").map_err(|e| e.any())?,
        room_id: row.try_get("room_id").map_err(|e| e.any())?,
        time_range: row.try_get("time_range").map_err(|e| e.any())?,
        status: parse_value(&status)?,
        user_id: row.try_get("user_id").map_err(|e| e.any())?,
        created_at: row.try_get("created_at").map_err(|e| e.any())?,
    })
}

fn booking_from_row(row: &PgRow) -> Result<BookingData> {
    let status: String = row.try_get("decision_status").map_err(|e| e.any())?;

    Ok(BookingData {
        id: row.try_get("booking_id").map_err(|e| e.any())?,
        room_id: row.try_get("room_id").map_err(|e| e.any())?,
        slot_id: row.try_get("slot_id").map_err(|e| e.any())?,
        room_name: row.try_get("room_name").map_err(|e| e.any())?,
        user_id_booked: row.try_get("user_id_booked").map_err(|e| e.any())?,
        user_id_decision: row.try_get("user_id_decision").map_err(|e| e.any())?,
        decision_status: parse_value(&status)?,
        created_at: row.try_get("created_at").map_err(|e| e.any())?,
    })
}

impl IntoDatabaseError for SqlxError {
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }

    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError {
        match self {
            SqlxError::RowNotFound => DatabaseError::NotFound {
                resource,
                identifier,
            },
            e => Self::any(e),
        }
    }
}
