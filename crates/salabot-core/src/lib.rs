//! Core types: booking dates, time slots, rooms, reservations, conflicts

pub mod reservation;
pub mod room;
pub mod time;
pub mod tracing;

pub use reservation::{
    AttendanceDecision, Participant, Reservation, ReservationStatus, UserRef, available_rooms,
    has_conflict,
};
pub use room::Room;
pub use time::{BookingDate, TimeParseError, TimeSlot, meeting_start};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
