use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use slotbook_core::{AuthError, BookingError, CatalogError, DatabaseError};

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Missing or malformed authorization")]
    Unauthenticated,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Session has been revoked. Please log in again")]
    SessionRevoked,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("You do not have permission to perform this action")]
    Forbidden,
    #[error("Already logged out")]
    AlreadyLoggedOut,
    #[error("{resource}:{identifier} not found")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        resource: &'static str,
        field: &'static str,
        value: String,
    },
    #[error("Only one booking is allowed per day")]
    DuplicateBooking,
    #[error("Slot is not available for booking")]
    SlotUnavailable,
    #[error("Booking is not in pending status")]
    NotPending,
    #[error("Only free or disabled slots can be toggled")]
    InvalidTransition,
    #[error("{0}")]
    BadRequest(&'static str),
    #[error("Internal server error")]
    Unknown(String),
}

impl ServerError {
    fn as_status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated | Self::InvalidToken | Self::SessionRevoked => {
                StatusCode::UNAUTHORIZED
            }
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::AlreadyLoggedOut
            | Self::DuplicateBooking
            | Self::SlotUnavailable
            | Self::NotPending
            | Self::InvalidTransition
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        // Internal detail goes to the log, never the response body
        if let Self::Unknown(detail) = &self {
            log::error!("{}", detail);
        }

        let body = json!({ "error": self.to_string() });

        (self.as_status_code(), Json(body)).into_response()
    }
}

impl From<AuthError> for ServerError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            AuthError::InvalidToken => Self::InvalidToken,
            AuthError::SessionRevoked => Self::SessionRevoked,
            AuthError::AlreadyLoggedOut => Self::AlreadyLoggedOut,
            AuthError::Db(e) => e.into(),
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<DatabaseError> for ServerError {
    fn from(value: DatabaseError) -> Self {
        match value {
            DatabaseError::NotFound {
                resource,
                identifier,
            } => Self::NotFound {
                resource,
                identifier,
            },
            DatabaseError::Conflict {
                resource,
                field,
                value,
            } => Self::Conflict {
                resource,
                field,
                value,
            },
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<BookingError> for ServerError {
    fn from(value: BookingError) -> Self {
        match value {
            BookingError::DuplicateBooking => Self::DuplicateBooking,
            BookingError::SlotUnavailable => Self::SlotUnavailable,
            BookingError::NotPending => Self::NotPending,
            BookingError::Db(e) => e.into(),
        }
    }
}

impl From<CatalogError> for ServerError {
    fn from(value: CatalogError) -> Self {
        match value {
            CatalogError::InvalidTransition => Self::InvalidTransition,
            CatalogError::Db(e) => e.into(),
        }
    }
}
