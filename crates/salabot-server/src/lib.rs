//! Reservation engine: store, booking sessions, attendance, reminders,
//! export.
//!
//! This crate is the core of salabot:
//! - Durable, write-through reservation storage
//! - The multi-step booking flow with its commit-time conflict re-check
//! - Exactly-once attendance recording
//! - The periodic reminder sweep with two latched tiers
//! - Calendar views, paging, and the tabular export
//!
//! The chat transport, membership lookup, and mail delivery sit behind
//! the `salabot-protocol` contract and the collaborator traits exported
//! here.

mod attendance;
mod calendar;
mod config;
mod directory;
mod error;
mod export;
mod handler;
mod scheduler;
mod session;
mod store;

pub use attendance::AttendanceStatus;
pub use calendar::{PaginationCursors, Paginator, filter_by_month_year, month_year_groups};
pub use config::EngineConfig;
pub use directory::{MembershipDirectory, StaticDirectory};
pub use error::{EngineError, EngineResult};
pub use export::{ExportSchedule, ExportSink, export_rows, render_csv};
pub use handler::{Engine, SharedEngine, new_shared_engine};
pub use scheduler::{
    ReminderEvent, ReminderScheduler, ReminderTier, SchedulerHandle, SweepCommand, SweepConfig,
    collect_due,
};
pub use session::{BookingSession, BookingSessions};
pub use store::{ReservationStore, SharedStore, new_shared_store};
