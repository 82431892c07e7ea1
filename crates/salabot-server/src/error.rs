//! Engine error types.

use salabot_core::{AttendanceDecision, BookingDate, Room, TimeParseError, TimeSlot};
use salabot_protocol::ErrorCode;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur in the reservation engine.
///
/// Everything except `Io`/`Serialization` is a locally recoverable,
/// user-facing condition; those two are logged at the store boundary and
/// never surface through an interaction outcome.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed date or time-range input.
    #[error(transparent)]
    InvalidInput(#[from] TimeParseError),

    /// The meeting title was empty after trimming.
    #[error("meeting title must not be empty")]
    EmptyTitle,

    /// Every room is taken for the requested date and slot.
    #[error("no room available for {date} at {slot}")]
    NoRoomAvailable { date: BookingDate, slot: TimeSlot },

    /// The picked room was not in the offered set (stale interaction).
    #[error("{0} was not among the offered rooms")]
    RoomNotOffered(Room),

    /// The slot was claimed by another booking between offer and commit.
    #[error("the slot is no longer available")]
    SlotTaken,

    /// An action arrived out of order for the live session.
    #[error("unexpected booking step for this session")]
    OutOfSequence,

    /// No live booking session for the acting user.
    #[error("no active booking session for this user")]
    NoActiveSession,

    /// No live calendar cursor for the acting user.
    #[error("no active calendar view for this user")]
    NoActiveCursor,

    /// The reservation does not exist or is already cancelled.
    #[error("reservation not found: {id}")]
    NotFound { id: String },

    /// Attendance was already recorded for this participant.
    #[error("attendance already recorded")]
    AlreadyRecorded { existing: AttendanceDecision },

    /// The user is not on the reservation's participant list.
    #[error("user is not a participant of this reservation")]
    NotAParticipant,

    /// Export requested without the capability.
    #[error("missing the export capability")]
    PermissionDenied,

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// IO error while flushing or loading the durable image.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error while flushing the durable image.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a not-found error.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Maps this error onto the transport error taxonomy.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidInput(_) | Self::EmptyTitle => ErrorCode::Validation,
            Self::NoRoomAvailable { .. } | Self::SlotTaken | Self::RoomNotOffered(_) => {
                ErrorCode::Conflict
            }
            Self::OutOfSequence | Self::NoActiveSession | Self::NoActiveCursor => {
                ErrorCode::SessionState
            }
            Self::NotFound { .. } | Self::NotAParticipant => ErrorCode::NotFound,
            Self::AlreadyRecorded { .. } => ErrorCode::DuplicateAction,
            Self::PermissionDenied => ErrorCode::Permission,
            Self::Config { .. } | Self::Io(_) | Self::Serialization(_) => ErrorCode::Internal,
        }
    }
}
