use axum::{
    extract::{Path, Query, State},
    routing::{get, patch, post},
    Json,
};
use chrono::NaiveDate;
use slotbook_core::{HistoryFilter, HistoryScope, UserRole};

use crate::{
    auth::Session,
    context::ServerContext,
    errors::{ServerError, ServerResult},
    schemas::{BookSlotSchema, DecisionSchema, HistoryQuery, ValidatedJson},
    serialized::{Booking, HistoryEntry, PendingRequest, ToSerialized},
    Router,
};

fn history_filter(query: HistoryQuery) -> Result<HistoryFilter, ServerError> {
    let date = query
        .date
        .map(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d"))
        .transpose()
        .map_err(|_| ServerError::BadRequest("Date filter must be YYYY-MM-DD"))?;

    Ok(HistoryFilter {
        date,
        today: query.today,
    })
}

#[utoipa::path(
    post,
    path = "/rooms/{room_id}/book",
    tag = "bookings",
    request_body = BookSlotSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Booking)
    )
)]
async fn book_slot(
    session: Session,
    State(context): State<ServerContext>,
    Path(room_id): Path<i32>,
    ValidatedJson(body): ValidatedJson<BookSlotSchema>,
) -> ServerResult<Json<Booking>> {
    let booking = context
        .slotbook
        .bookings
        .book_slot(session.id(), room_id, body.slot_id)
        .await?;

    Ok(Json(booking.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/bookings/currentbook",
    tag = "bookings",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Booking)
    )
)]
async fn current_booking(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Booking>> {
    let booking = context
        .slotbook
        .bookings
        .current_booking(session.id())
        .await?;

    Ok(Json(booking.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/bookings/History",
    tag = "bookings",
    params(
        ("date" = Option<String>, Query, description = "Single day filter, YYYY-MM-DD"),
        ("today" = Option<String>, Query, description = "Present means filter to the current day")
    ),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<HistoryEntry>)
    )
)]
async fn history(
    session: Session,
    State(context): State<ServerContext>,
    Query(query): Query<HistoryQuery>,
) -> ServerResult<Json<Vec<HistoryEntry>>> {
    let scope = match session.role() {
        UserRole::Student => HistoryScope::Booker(session.id()),
        UserRole::Lecturer => HistoryScope::Decider(session.id()),
        UserRole::Staff => return Err(ServerError::Forbidden),
    };

    let entries = context
        .slotbook
        .bookings
        .history(scope, history_filter(query)?)
        .await?;

    Ok(Json(entries.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/bookings/AllHistory",
    tag = "bookings",
    params(
        ("date" = Option<String>, Query, description = "Single day filter, YYYY-MM-DD"),
        ("today" = Option<String>, Query, description = "Present means filter to the current day")
    ),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<HistoryEntry>)
    )
)]
async fn all_history(
    _session: Session,
    State(context): State<ServerContext>,
    Query(query): Query<HistoryQuery>,
) -> ServerResult<Json<Vec<HistoryEntry>>> {
    let entries = context
        .slotbook
        .bookings
        .history(HistoryScope::All, history_filter(query)?)
        .await?;

    Ok(Json(entries.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/bookings/pendingrequests",
    tag = "bookings",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<PendingRequest>)
    )
)]
async fn pending_requests(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<PendingRequest>>> {
    session.require(&[UserRole::Lecturer])?;

    let requests = context.slotbook.bookings.pending_requests().await?;

    Ok(Json(requests.to_serialized()))
}

#[utoipa::path(
    patch,
    path = "/bookings/decision/{booking_id}",
    tag = "bookings",
    request_body = DecisionSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Booking)
    )
)]
async fn decide(
    session: Session,
    State(context): State<ServerContext>,
    Path(booking_id): Path<i32>,
    ValidatedJson(body): ValidatedJson<DecisionSchema>,
) -> ServerResult<Json<Booking>> {
    session.require(&[UserRole::Lecturer])?;

    let booking = context
        .slotbook
        .bookings
        .decide(session.id(), booking_id, body.decision)
        .await?;

    Ok(Json(booking.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/end-of-day-reset",
    tag = "bookings",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "All non-disabled slots were freed and pending bookings rejected")
    )
)]
async fn end_of_day_reset(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<()> {
    session.require(&[UserRole::Staff])?;

    context.slotbook.bookings.end_of_day_reset().await?;

    Ok(())
}

pub fn router() -> Router {
    Router::new()
        .route("/currentbook", get(current_booking))
        .route("/History", get(history))
        .route("/AllHistory", get(all_history))
        .route("/pendingrequests", get(pending_requests))
        .route("/decision/:booking_id", patch(decide))
}

/// The booking route that lives under /rooms in the public surface
pub fn room_router() -> Router {
    Router::new().route("/:room_id/book", post(book_slot))
}

/// The reset route at the root of the public surface
pub fn root_router() -> Router {
    Router::new().route("/end-of-day-reset", post(end_of_day_reset))
}
