use std::sync::Arc;
use thiserror::Error;

use crate::{
    DashboardData, Database, DatabaseError, NewRoom, PrimaryKey, RoomData, SlotData, SlotStatus,
    UpdatedRoom,
};

/// Rooms and their four fixed daily slots
pub struct Catalog<Db> {
    db: Arc<Db>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    /// Only free and disabled slots can be toggled
    #[error("Only free or disabled slots can be toggled")]
    InvalidTransition,
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

impl<Db> Catalog<Db>
where
    Db: Database,
{
    pub fn new(db: &Arc<Db>) -> Self {
        Self { db: db.clone() }
    }

    /// Creates a room along with its four slots
    pub async fn create_room(&self, new_room: NewRoom) -> Result<RoomData, DatabaseError> {
        self.db.create_room(new_room).await
    }

    /// Applies only the provided fields to an existing room
    pub async fn edit_room(&self, updated_room: UpdatedRoom) -> Result<RoomData, DatabaseError> {
        self.db.update_room(updated_room).await
    }

    /// Flips a slot between free and disabled. Slots under an active
    /// booking workflow cannot be toggled.
    pub async fn toggle_slot(
        &self,
        room_id: PrimaryKey,
        slot_id: PrimaryKey,
    ) -> Result<SlotData, CatalogError> {
        let slot = self.db.slot(room_id, slot_id).await?;

        let target = match slot.status {
            SlotStatus::Free => SlotStatus::Disabled,
            SlotStatus::Disabled => SlotStatus::Free,
            _ => return Err(CatalogError::InvalidTransition),
        };

        let flipped = self
            .db
            .set_slot_status_checked(slot.id, slot.status, target)
            .await?;

        // The status moved under us, which means a booking got in first
        if !flipped {
            return Err(CatalogError::InvalidTransition);
        }

        Ok(self.db.slot(room_id, slot_id).await?)
    }

    pub async fn list_rooms(&self) -> Result<Vec<RoomData>, DatabaseError> {
        self.db.list_rooms().await
    }

    pub async fn room_by_id(&self, room_id: PrimaryKey) -> Result<RoomData, DatabaseError> {
        self.db.room_by_id(room_id).await
    }

    /// Aggregate room and slot counts for the dashboard
    pub async fn dashboard(&self) -> Result<DashboardData, DatabaseError> {
        self.db.dashboard_counts().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDatabase;
    use crate::{SlotPolicy, SLOT_TIME_RANGES};

    fn catalog() -> Catalog<MemoryDatabase> {
        let db = Arc::new(MemoryDatabase::new());
        Catalog::new(&db)
    }

    fn new_room(name: &str, policy: SlotPolicy) -> NewRoom {
        NewRoom {
            name: name.to_string(),
            capacity: 10,
            wifi: true,
            image_url: "https://example.com/lab.png".to_string(),
            policy,
        }
    }

    #[tokio::test]
    async fn create_room_makes_four_slots() {
        let catalog = catalog();

        let room = catalog
            .create_room(new_room("Lab A", SlotPolicy::Free))
            .await
            .unwrap();

        assert_eq!(room.slots.len(), 4);

        for (slot, time_range) in room.slots.iter().zip(SLOT_TIME_RANGES) {
            assert_eq!(slot.time_range, time_range);
            assert_eq!(slot.status, SlotStatus::Free);
            assert_eq!(slot.room_id, room.id);
        }
    }

    #[tokio::test]
    async fn create_room_honors_disabled_policy() {
        let catalog = catalog();

        let room = catalog
            .create_room(new_room("Storage", SlotPolicy::Disabled))
            .await
            .unwrap();

        assert!(room
            .slots
            .iter()
            .all(|s| s.status == SlotStatus::Disabled));
    }

    #[tokio::test]
    async fn create_room_rejects_duplicate_name() {
        let catalog = catalog();

        catalog
            .create_room(new_room("Lab A", SlotPolicy::Free))
            .await
            .unwrap();

        let duplicate = catalog.create_room(new_room("Lab A", SlotPolicy::Free)).await;
        assert!(matches!(duplicate, Err(DatabaseError::Conflict { .. })));
    }

    #[tokio::test]
    async fn toggle_flips_free_and_disabled() {
        let catalog = catalog();

        let room = catalog
            .create_room(new_room("Lab A", SlotPolicy::Free))
            .await
            .unwrap();
        let slot_id = room.slots[0].id;

        let slot = catalog.toggle_slot(room.id, slot_id).await.unwrap();
        assert_eq!(slot.status, SlotStatus::Disabled);

        let slot = catalog.toggle_slot(room.id, slot_id).await.unwrap();
        assert_eq!(slot.status, SlotStatus::Free);
    }

    #[tokio::test]
    async fn toggle_rejects_foreign_slot() {
        let catalog = catalog();

        let lab = catalog
            .create_room(new_room("Lab A", SlotPolicy::Free))
            .await
            .unwrap();
        let office = catalog
            .create_room(new_room("Office", SlotPolicy::Free))
            .await
            .unwrap();

        let result = catalog.toggle_slot(office.id, lab.slots[0].id).await;
        assert!(matches!(
            result,
            Err(CatalogError::Db(DatabaseError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn edit_room_applies_partial_fields() {
        let catalog = catalog();

        let room = catalog
            .create_room(new_room("Lab A", SlotPolicy::Free))
            .await
            .unwrap();

        let updated = catalog
            .edit_room(UpdatedRoom {
                id: room.id,
                capacity: Some(25),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(updated.capacity, 25);
        assert_eq!(updated.name, "Lab A");
        assert!(updated.wifi);
    }

    #[tokio::test]
    async fn room_stripped_of_slots_is_not_found() {
        let db = Arc::new(MemoryDatabase::new());
        let catalog = Catalog::new(&db);

        let room = catalog
            .create_room(new_room("Lab A", SlotPolicy::Free))
            .await
            .unwrap();

        db.strip_slots(room.id);

        let result = catalog.room_by_id(room.id).await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn edit_missing_room_is_not_found() {
        let catalog = catalog();

        let result = catalog
            .edit_room(UpdatedRoom {
                id: 999,
                name: Some("Ghost".to_string()),
                ..Default::default()
            })
            .await;

        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn dashboard_counts_slots_by_status() {
        let catalog = catalog();

        catalog
            .create_room(new_room("Lab A", SlotPolicy::Free))
            .await
            .unwrap();
        catalog
            .create_room(new_room("Storage", SlotPolicy::Disabled))
            .await
            .unwrap();

        let counts = catalog.dashboard().await.unwrap();

        assert_eq!(counts.total_rooms, 2);
        assert_eq!(counts.total_slots, 8);
        assert_eq!(counts.free_slots, 4);
        assert_eq!(counts.disabled_slots, 4);
        assert_eq!(counts.pending_slots, 0);
        assert_eq!(counts.reserved_slots, 0);
    }
}
