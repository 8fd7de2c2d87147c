use axum::{
    extract::{Path, State},
    routing::{get, patch, post},
    Json,
};
use slotbook_core::{NewRoom, UpdatedRoom, UserRole};

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    schemas::{EditRoomSchema, NewRoomSchema, ValidatedJson},
    serialized::{Dashboard, Room, Slot, ToSerialized},
    Router,
};

#[utoipa::path(
    get,
    path = "/rooms/",
    tag = "rooms",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Room>)
    )
)]
async fn list_rooms(
    _session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<Room>>> {
    let rooms = context.slotbook.catalog.list_rooms().await?;

    Ok(Json(rooms.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/rooms/{room_id}",
    tag = "rooms",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Room)
    )
)]
async fn room(
    _session: Session,
    State(context): State<ServerContext>,
    Path(room_id): Path<i32>,
) -> ServerResult<Json<Room>> {
    let room = context.slotbook.catalog.room_by_id(room_id).await?;

    Ok(Json(room.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/add",
    tag = "rooms",
    request_body = NewRoomSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Room)
    )
)]
async fn create_room(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewRoomSchema>,
) -> ServerResult<Json<Room>> {
    session.require(&[UserRole::Staff])?;

    let room = context
        .slotbook
        .catalog
        .create_room(NewRoom {
            name: body.name,
            capacity: body.capacity,
            wifi: body.wifi,
            image_url: body.image_url,
            policy: body.policy,
        })
        .await?;

    Ok(Json(room.to_serialized()))
}

#[utoipa::path(
    patch,
    path = "/rooms/{room_id}/edit",
    tag = "rooms",
    request_body = EditRoomSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Room)
    )
)]
async fn edit_room(
    session: Session,
    State(context): State<ServerContext>,
    Path(room_id): Path<i32>,
    ValidatedJson(body): ValidatedJson<EditRoomSchema>,
) -> ServerResult<Json<Room>> {
    session.require(&[UserRole::Staff])?;

    let room = context
        .slotbook
        .catalog
        .edit_room(UpdatedRoom {
            id: room_id,
            name: body.name,
            capacity: body.capacity,
            wifi: body.wifi,
            image_url: body.image_url,
        })
        .await?;

    Ok(Json(room.to_serialized()))
}

#[utoipa::path(
    patch,
    path = "/rooms/{room_id}/{slot_id}/toggle-status",
    tag = "rooms",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Slot)
    )
)]
async fn toggle_slot(
    session: Session,
    State(context): State<ServerContext>,
    Path((room_id, slot_id)): Path<(i32, i32)>,
) -> ServerResult<Json<Slot>> {
    session.require(&[UserRole::Staff])?;

    let slot = context.slotbook.catalog.toggle_slot(room_id, slot_id).await?;

    Ok(Json(slot.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/dashboard",
    tag = "rooms",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Dashboard)
    )
)]
async fn dashboard(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Dashboard>> {
    session.require(&[UserRole::Staff, UserRole::Lecturer])?;

    let counts = context.slotbook.catalog.dashboard().await?;

    Ok(Json(counts.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_rooms))
        .route("/:room_id", get(room))
        .route("/:room_id/edit", patch(edit_room))
        .route("/:room_id/:slot_id/toggle-status", patch(toggle_slot))
}

/// Routes the original surface kept at the root instead of under /rooms
pub fn root_router() -> Router {
    Router::new()
        .route("/add", post(create_room))
        .route("/dashboard", get(dashboard))
}
