//! Errors returned by the identity store, ledger and sharing registry.

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::credential::MIN_PASSWORD_LENGTH;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    #[error("Vehicle not found: {0}")]
    VehicleNotFound(Uuid),

    #[error("You already logged {date} for this vehicle")]
    DuplicateEntry { date: NaiveDate },

    #[error("{date} is already taken by {user_name}")]
    DateOccupied { date: NaiveDate, user_name: String },

    #[error("Invalid share code: {0}")]
    InvalidCode(String),

    #[error("Only the owner or a shared user can share this vehicle")]
    AccessDenied,

    #[error("Email already registered: {0}")]
    EmailTaken(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error(
        "Password too weak: use at least {} characters mixing upper case, lower case, digits or symbols",
        MIN_PASSWORD_LENGTH
    )]
    WeakPassword,

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

pub type Result<T, E = LedgerError> = std::result::Result<T, E>;
