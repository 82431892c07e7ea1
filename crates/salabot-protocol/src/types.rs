//! Action and outcome types for the salabot transport contract.

use serde::{Deserialize, Serialize};

use salabot_core::{AttendanceDecision, BookingDate, Participant, Reservation, Room, TimeSlot};

/// The identity behind an interaction, as resolved by the transport.
///
/// The transport owns membership and permission lookup; the engine only
/// reads the fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Opaque user identifier.
    pub id: String,
    /// Display name inside the organization (nickname if set).
    pub display_name: String,
    /// Account username.
    pub username: String,
    /// Whether this user carries the export capability.
    #[serde(default)]
    pub can_export: bool,
}

impl Actor {
    /// Creates an actor without the export capability.
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            username: username.into(),
            can_export: false,
        }
    }

    /// Builder: grant the export capability.
    pub fn with_export_capability(mut self) -> Self {
        self.can_export = true;
        self
    }
}

/// Cursor movement for the calendar view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageDirection {
    Previous,
    Next,
}

/// A month/year grouping key for calendar browsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthYear {
    /// Year (e.g. 2025).
    pub year: i32,
    /// Month, 1-12.
    pub month: u32,
}

impl MonthYear {
    /// Creates a month/year key.
    pub fn new(month: u32, year: i32) -> Self {
        Self { year, month }
    }
}

impl std::fmt::Display for MonthYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}/{}", self.month, self.year)
    }
}

/// One row of the tabular export artifact.
///
/// Column order is part of the collaborator contract and matches the
/// spreadsheet the organization already consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRow {
    pub date: String,
    pub time_range: String,
    pub room: String,
    pub title: String,
    pub organizer_name: String,
    pub organizer_id: String,
    pub creator_name: String,
    pub creator_id: String,
    /// Participant mentions joined by `", "`.
    pub participants: String,
    pub status: String,
}

impl ExportRow {
    /// Column headers, in artifact order.
    pub const HEADERS: [&'static str; 10] = [
        "Data",
        "Horário",
        "Sala",
        "Título",
        "Responsável (nome)",
        "Responsável (id)",
        "Usuário (nome)",
        "Usuário (id)",
        "Participantes (tags)",
        "Status",
    ];

    /// The row's fields, in artifact order.
    pub fn fields(&self) -> [&str; 10] {
        [
            &self.date,
            &self.time_range,
            &self.room,
            &self.title,
            &self.organizer_name,
            &self.organizer_id,
            &self.creator_name,
            &self.creator_id,
            &self.participants,
            &self.status,
        ]
    }
}

/// Discrete user interactions delivered by the transport.
///
/// Every action is applied on behalf of an [`Actor`]; the engine decides
/// what it means given that user's current session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Booking step 1: raw date and time-range input.
    SubmitDateTime { date: String, time_range: String },

    /// Booking step 2: pick one of the offered rooms.
    PickRoom { room: Room },

    /// Booking step 3: free-text meeting title.
    SubmitTitle { title: String },

    /// Booking step 4: participant selection on one page of candidates.
    SelectParticipants { page: usize, user_ids: Vec<String> },

    /// Booking step 5: commit, with or without the accumulated
    /// participant selections.
    FinishBooking { with_participants: bool },

    /// Months in which the actor has cancellable reservations.
    ListCancellableMonths,

    /// The actor's cancellable reservations in one month.
    ListCancellable { month: u32, year: i32 },

    /// Soft-cancel one reservation the actor is involved in.
    CancelReservation { reservation_id: String },

    /// Record the actor's attendance decision for a reservation.
    RecordAttendance {
        reservation_id: String,
        decision: AttendanceDecision,
    },

    /// Read the attendance status of a reservation.
    AttendanceStatus { reservation_id: String },

    /// Month/year options for calendar browsing.
    ListMonths,

    /// Open the calendar for a month, optionally restricted to the
    /// actor's own reservations.
    ViewCalendar {
        month: u32,
        year: i32,
        only_mine: bool,
    },

    /// Move the actor's calendar cursor.
    Paginate { direction: PageDirection },

    /// Export the full reservation history (permission-gated).
    ExportAll,
}

/// What the engine hands back for the transport to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outcome {
    /// Date/time accepted; these rooms are free.
    RoomsOffered {
        date: BookingDate,
        slot: TimeSlot,
        rooms: Vec<Room>,
    },

    /// Room accepted; a title is expected next.
    TitleRequested { room: Room },

    /// Title accepted; participant selection may begin over this
    /// candidate pool.
    ParticipantsRequested { candidates: Vec<Participant> },

    /// One page's selection was noted.
    SelectionNoted { page: usize, selected: usize },

    /// The booking was committed.
    Committed { reservation: Reservation },

    /// The reservation was soft-cancelled.
    Cancelled { reservation_id: String },

    /// Month/year options (for the calendar or the cancel flow).
    Months { months: Vec<MonthYear> },

    /// Reservations the actor may cancel in the requested month.
    CancellableReservations { reservations: Vec<Reservation> },

    /// The actor's attendance decision was recorded.
    AttendanceRecorded { decision: AttendanceDecision },

    /// Attendance status read.
    AttendanceStatus {
        confirmed: Vec<Participant>,
        declined: Vec<Participant>,
    },

    /// One page of the calendar view.
    CalendarPage {
        entries: Vec<Reservation>,
        page: usize,
        total_pages: usize,
    },

    /// The export artifact rows.
    Export { rows: Vec<ExportRow> },

    /// A locally recoverable failure.
    Error { code: ErrorCode, message: String },
}

impl Outcome {
    /// Creates an error outcome.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }

    /// Returns true unless this is an error outcome.
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Error { .. })
    }

    /// Returns the error code if this is an error outcome.
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Error { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Error taxonomy of the engine, as seen by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed date/time/title; the user should retry the input.
    Validation,

    /// Room unavailable, at offer time or at the commit re-check.
    Conflict,

    /// No live session or cursor for the acting user.
    SessionState,

    /// The referenced reservation does not exist or is already cancelled.
    NotFound,

    /// Attendance was already recorded; the original decision stands.
    DuplicateAction,

    /// Export requested without the capability.
    Permission,

    /// Unexpected internal failure.
    Internal,
}

impl ErrorCode {
    /// Returns a human-readable description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Validation => "The input could not be understood",
            Self::Conflict => "The room is not available for that slot",
            Self::SessionState => "There is no active flow for this user",
            Self::NotFound => "The reservation was not found",
            Self::DuplicateAction => "This action was already taken",
            Self::Permission => "Missing permission for this action",
            Self::Internal => "An internal error occurred",
        }
    }
}
