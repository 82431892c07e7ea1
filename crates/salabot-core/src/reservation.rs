//! Reservation records and conflict detection.
//!
//! A [`Reservation`] is the durable unit of the engine: one committed room
//! booking with its organizer, invited participants, attendance decisions,
//! and the two reminder latches. Records are never deleted; cancellation
//! is a soft status so history survives for export.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::room::Room;
use crate::time::{BookingDate, TimeSlot, meeting_start};

/// An identity plus the display name it was seen under.
///
/// A reservation stores two of these: the organizer (server display name)
/// and the creator (account username). They usually share an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    /// Opaque user identifier from the chat platform.
    pub id: String,
    /// The name to render for this identity.
    pub name: String,
}

impl UserRef {
    /// Creates a new user reference.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// An invited participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Opaque user identifier.
    pub id: String,
    /// Display name inside the organization.
    pub display_name: String,
    /// Account username.
    pub username: String,
}

impl Participant {
    /// Creates a new participant.
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            username: username.into(),
        }
    }

    /// Renders the platform mention for this participant.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

/// Lifecycle status of a reservation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    /// The booking holds its slot and is swept for reminders.
    #[default]
    Scheduled,
    /// Soft-cancelled: out of conflict consideration, kept for history.
    Cancelled,
}

impl ReservationStatus {
    /// Returns the human-readable status label.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Scheduled => "Agendada",
            Self::Cancelled => "Cancelada",
        }
    }
}

/// A participant's one-time answer to a reservation invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceDecision {
    Confirmed,
    Declined,
}

/// A committed room booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Unique identifier, assigned at commit time, immutable.
    pub id: String,
    /// Calendar date of the meeting.
    pub date: BookingDate,
    /// Time range of the meeting, half-open.
    pub slot: TimeSlot,
    /// The reserved room.
    pub room: Room,
    /// Free-text meeting title, non-empty.
    pub title: String,
    /// Who booked the room, under their display name.
    pub organizer: UserRef,
    /// The same identity under its account username.
    pub creator: UserRef,
    /// Invited participants, in selection order. May be empty.
    #[serde(default)]
    pub participants: Vec<Participant>,
    /// Scheduled or Cancelled.
    #[serde(default)]
    pub status: ReservationStatus,
    /// Participant id -> decision; absence means undecided.
    #[serde(default)]
    pub attendance: BTreeMap<String, AttendanceDecision>,
    /// Latched once the 24-hour reminder tier has fired.
    #[serde(default)]
    pub reminder_24h_sent: bool,
    /// Latched once the 1-hour reminder tier has fired.
    #[serde(default)]
    pub reminder_1h_sent: bool,
}

impl Reservation {
    /// Creates a freshly committed reservation: Scheduled, no attendance
    /// decisions, no reminders fired.
    pub fn new(
        id: impl Into<String>,
        date: BookingDate,
        slot: TimeSlot,
        room: Room,
        title: impl Into<String>,
        organizer: UserRef,
        creator: UserRef,
        participants: Vec<Participant>,
    ) -> Self {
        Self {
            id: id.into(),
            date,
            slot,
            room,
            title: title.into(),
            organizer,
            creator,
            participants,
            status: ReservationStatus::Scheduled,
            attendance: BTreeMap::new(),
            reminder_24h_sent: false,
            reminder_1h_sent: false,
        }
    }

    /// Returns true while the reservation still holds its slot.
    pub fn is_active(&self) -> bool {
        self.status != ReservationStatus::Cancelled
    }

    /// Soft-cancels the reservation. Idempotent; returns whether the
    /// status actually changed.
    pub fn cancel(&mut self) -> bool {
        if self.status == ReservationStatus::Cancelled {
            return false;
        }
        self.status = ReservationStatus::Cancelled;
        true
    }

    /// The meeting's start instant (date joined with slot start).
    pub fn meeting_start(&self) -> NaiveDateTime {
        meeting_start(self.date, self.slot)
    }

    /// Returns true if `user_id` is the organizer, the creator, or an
    /// invited participant.
    pub fn involves(&self, user_id: &str) -> bool {
        self.organizer.id == user_id
            || self.creator.id == user_id
            || self.is_participant(user_id)
    }

    /// Returns true if `user_id` is on the participant list.
    pub fn is_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p.id == user_id)
    }

    /// Returns the recorded attendance decision for `user_id`, if any.
    pub fn attendance_for(&self, user_id: &str) -> Option<AttendanceDecision> {
        self.attendance.get(user_id).copied()
    }

    /// Participants who answered with the given decision, in invitation
    /// order.
    pub fn participants_with_decision(&self, decision: AttendanceDecision) -> Vec<&Participant> {
        self.participants
            .iter()
            .filter(|p| self.attendance.get(&p.id) == Some(&decision))
            .collect()
    }
}

/// Returns true iff booking `room` on `date` for `slot` would overlap an
/// existing non-cancelled reservation.
///
/// Half-open semantics: a booking starting exactly when another ends is
/// not a conflict.
pub fn has_conflict(
    room: Room,
    date: BookingDate,
    slot: TimeSlot,
    reservations: &[Reservation],
) -> bool {
    reservations.iter().any(|r| {
        r.room == room && r.date == date && r.is_active() && r.slot.overlaps(&slot)
    })
}

/// Rooms still free for `date` and `slot`, in offer order.
pub fn available_rooms(
    date: BookingDate,
    slot: TimeSlot,
    reservations: &[Reservation],
) -> Vec<Room> {
    Room::ALL
        .iter()
        .copied()
        .filter(|room| !has_conflict(*room, date, slot, reservations))
        .collect()
}
