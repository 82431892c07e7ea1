//! Action dispatch.
//!
//! [`Engine`] routes transport [`Action`]s to the booking, attendance,
//! calendar, and export components and turns every result into an
//! [`Outcome`]. One engine instance behind one lock is the single-writer
//! discipline the whole design assumes: the commit-time conflict
//! re-check and the store append happen under the same write lock, so
//! the offer-vs-commit race cannot interleave.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Local;
use tokio::sync::RwLock;
use tracing::debug;

use salabot_protocol::{Action, Actor, MonthYear, Outcome};

use crate::attendance;
use crate::calendar::{self, PaginationCursors, Paginator};
use crate::config::EngineConfig;
use crate::directory::MembershipDirectory;
use crate::error::{EngineError, EngineResult};
use crate::export;
use crate::session::BookingSessions;
use crate::store::SharedStore;

/// The reservation engine.
pub struct Engine {
    store: SharedStore,
    sessions: BookingSessions,
    cursors: PaginationCursors,
    directory: Arc<dyn MembershipDirectory>,
    config: EngineConfig,
}

/// Shared handle to the engine; all interaction handling goes through
/// this one lock.
pub type SharedEngine = Arc<RwLock<Engine>>;

/// Wraps an engine for sharing.
pub fn new_shared_engine(engine: Engine) -> SharedEngine {
    Arc::new(RwLock::new(engine))
}

impl Engine {
    /// Creates an engine over a shared store.
    pub fn new(
        store: SharedStore,
        directory: Arc<dyn MembershipDirectory>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            sessions: BookingSessions::new(),
            cursors: PaginationCursors::new(),
            directory,
            config,
        }
    }

    /// A clone of the shared store, for the reminder scheduler.
    pub fn store(&self) -> SharedStore {
        self.store.clone()
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Applies one user action and produces the outcome the transport
    /// renders. Never panics on user input; every failure maps onto the
    /// error taxonomy.
    pub async fn handle(&mut self, actor: &Actor, action: Action) -> Outcome {
        debug!(user = %actor.id, ?action, "Handling action");
        match self.dispatch(actor, action).await {
            Ok(outcome) => outcome,
            Err(e) => Outcome::error(e.code(), e.to_string()),
        }
    }

    async fn dispatch(&mut self, actor: &Actor, action: Action) -> EngineResult<Outcome> {
        match action {
            Action::SubmitDateTime { date, time_range } => {
                let store = self.store.read().await;
                let today = Local::now().date_naive();
                let (date, slot, rooms) = self.sessions.submit_date_time(
                    &actor.id,
                    &date,
                    &time_range,
                    today,
                    store.all(),
                )?;
                Ok(Outcome::RoomsOffered { date, slot, rooms })
            }

            Action::PickRoom { room } => {
                self.sessions.pick_room(&actor.id, room)?;
                Ok(Outcome::TitleRequested { room })
            }

            Action::SubmitTitle { title } => {
                self.sessions.submit_title(&actor.id, &title)?;
                Ok(Outcome::ParticipantsRequested {
                    candidates: self.directory.eligible_members(),
                })
            }

            Action::SelectParticipants { page, user_ids } => {
                let selected = self.sessions.select_participants(&actor.id, page, user_ids)?;
                Ok(Outcome::SelectionNoted { page, selected })
            }

            Action::FinishBooking { with_participants } => {
                let candidates = self.directory.eligible_members();
                let mut store = self.store.write().await;
                let reservation =
                    self.sessions
                        .finish(actor, with_participants, &candidates, &mut store)?;
                Ok(Outcome::Committed { reservation })
            }

            Action::ListCancellableMonths => {
                let store = self.store.read().await;
                let months: BTreeSet<MonthYear> = store
                    .filter(|r| r.is_active() && r.involves(&actor.id))
                    .iter()
                    .map(|r| MonthYear::new(r.date.month(), r.date.year()))
                    .collect();
                Ok(Outcome::Months {
                    months: months.into_iter().collect(),
                })
            }

            Action::ListCancellable { month, year } => {
                let store = self.store.read().await;
                let reservations =
                    calendar::filter_by_month_year(store.all(), month, year, Some(&actor.id));
                Ok(Outcome::CancellableReservations { reservations })
            }

            Action::CancelReservation { reservation_id } => {
                let mut store = self.store.write().await;
                let cancellable = store
                    .find(&reservation_id)
                    .is_some_and(|r| r.is_active() && r.involves(&actor.id));
                if !cancellable {
                    return Err(EngineError::not_found(&reservation_id));
                }
                store.mutate(&reservation_id, |r| r.cancel());
                Ok(Outcome::Cancelled { reservation_id })
            }

            Action::RecordAttendance {
                reservation_id,
                decision,
            } => {
                let mut store = self.store.write().await;
                let decision =
                    attendance::record(&mut store, &reservation_id, &actor.id, decision)?;
                Ok(Outcome::AttendanceRecorded { decision })
            }

            Action::AttendanceStatus { reservation_id } => {
                let store = self.store.read().await;
                let status = attendance::status(&store, &reservation_id)?;
                Ok(Outcome::AttendanceStatus {
                    confirmed: status.confirmed,
                    declined: status.declined,
                })
            }

            Action::ListMonths => {
                let store = self.store.read().await;
                let today = Local::now().date_naive();
                Ok(Outcome::Months {
                    months: calendar::month_year_groups(store.all(), today),
                })
            }

            Action::ViewCalendar {
                month,
                year,
                only_mine,
            } => {
                let store = self.store.read().await;
                let restrict = only_mine.then_some(actor.id.as_str());
                let entries = calendar::filter_by_month_year(store.all(), month, year, restrict);
                drop(store);

                if entries.is_empty() {
                    return Ok(Outcome::CalendarPage {
                        entries: Vec::new(),
                        page: 0,
                        total_pages: 0,
                    });
                }
                let pager = self.cursors.open(&actor.id, entries, self.config.page_size);
                Ok(page_outcome(pager))
            }

            Action::Paginate { direction } => {
                let pager = self.cursors.step(&actor.id, direction)?;
                Ok(page_outcome(pager))
            }

            Action::ExportAll => {
                if !actor.can_export {
                    return Err(EngineError::PermissionDenied);
                }
                let store = self.store.read().await;
                Ok(Outcome::Export {
                    rows: export::export_rows(store.all()),
                })
            }
        }
    }
}

fn page_outcome(pager: &Paginator) -> Outcome {
    Outcome::CalendarPage {
        entries: pager.current().to_vec(),
        page: pager.page(),
        total_pages: pager.total_pages(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::StaticDirectory;
    use crate::store::{ReservationStore, new_shared_store};
    use salabot_core::{AttendanceDecision, Participant, Room};
    use salabot_protocol::{ErrorCode, PageDirection};

    // Far-future dates keep these tests independent of the wall clock;
    // the parser accepts years through 2099.
    const DATE: &str = "25/12/2098";

    fn engine() -> (tempfile::TempDir, Engine) {
        let dir = tempfile::tempdir().unwrap();
        let store = new_shared_store(ReservationStore::open(dir.path().join("reservations.json")));
        let directory = Arc::new(StaticDirectory::new(vec![
            Participant::new("u2", "Bruno", "bruno.reis"),
            Participant::new("u3", "Carla", "carla.m"),
        ]));
        let engine = Engine::new(store, directory, EngineConfig::default().with_page_size(2));
        (dir, engine)
    }

    fn actor(id: &str) -> Actor {
        Actor::new(id, format!("User {id}"), format!("{id}.name"))
    }

    async fn book(engine: &mut Engine, user: &str, slot: &str) -> Outcome {
        let a = actor(user);
        engine
            .handle(
                &a,
                Action::SubmitDateTime {
                    date: DATE.to_string(),
                    time_range: slot.to_string(),
                },
            )
            .await;
        engine.handle(&a, Action::PickRoom { room: Room::Grande }).await;
        engine
            .handle(
                &a,
                Action::SubmitTitle {
                    title: "Planning".to_string(),
                },
            )
            .await;
        engine
            .handle(
                &a,
                Action::SelectParticipants {
                    page: 0,
                    user_ids: vec!["u2".to_string(), "u3".to_string()],
                },
            )
            .await;
        engine
            .handle(
                &a,
                Action::FinishBooking {
                    with_participants: true,
                },
            )
            .await
    }

    #[tokio::test]
    async fn booking_flow_end_to_end() {
        let (_dir, mut engine) = engine();

        let outcome = book(&mut engine, "u1", "09:00-11:00").await;
        let Outcome::Committed { reservation } = outcome else {
            panic!("expected Committed, got {outcome:?}");
        };
        assert_eq!(reservation.room, Room::Grande);
        assert_eq!(reservation.participants.len(), 2);

        // The same slot now offers two rooms only.
        let a = actor("u9");
        let outcome = engine
            .handle(
                &a,
                Action::SubmitDateTime {
                    date: DATE.to_string(),
                    time_range: "10:00-12:00".to_string(),
                },
            )
            .await;
        let Outcome::RoomsOffered { rooms, .. } = outcome else {
            panic!("expected RoomsOffered, got {outcome:?}");
        };
        assert_eq!(rooms, vec![Room::Menor, Room::MenorComMesa]);
    }

    #[tokio::test]
    async fn validation_errors_surface_with_their_code() {
        let (_dir, mut engine) = engine();
        let a = actor("u1");

        let outcome = engine
            .handle(
                &a,
                Action::SubmitDateTime {
                    date: "31/02/2098".to_string(),
                    time_range: "09:00-11:00".to_string(),
                },
            )
            .await;
        assert_eq!(outcome.error_code(), Some(ErrorCode::Validation));

        let outcome = engine
            .handle(
                &a,
                Action::SubmitDateTime {
                    date: DATE.to_string(),
                    time_range: "17:00-08:00".to_string(),
                },
            )
            .await;
        assert_eq!(outcome.error_code(), Some(ErrorCode::Validation));
    }

    #[tokio::test]
    async fn actions_without_a_session_are_session_state_errors() {
        let (_dir, mut engine) = engine();
        let outcome = engine
            .handle(&actor("u1"), Action::PickRoom { room: Room::Menor })
            .await;
        assert_eq!(outcome.error_code(), Some(ErrorCode::SessionState));

        let outcome = engine
            .handle(
                &actor("u1"),
                Action::Paginate {
                    direction: PageDirection::Next,
                },
            )
            .await;
        assert_eq!(outcome.error_code(), Some(ErrorCode::SessionState));
    }

    #[tokio::test]
    async fn attendance_round_trip() {
        let (_dir, mut engine) = engine();
        let Outcome::Committed { reservation } = book(&mut engine, "u1", "09:00-11:00").await
        else {
            panic!("booking failed");
        };

        let outcome = engine
            .handle(
                &actor("u2"),
                Action::RecordAttendance {
                    reservation_id: reservation.id.clone(),
                    decision: AttendanceDecision::Confirmed,
                },
            )
            .await;
        assert!(matches!(
            outcome,
            Outcome::AttendanceRecorded {
                decision: AttendanceDecision::Confirmed
            }
        ));

        // Second decision by the same participant is rejected.
        let outcome = engine
            .handle(
                &actor("u2"),
                Action::RecordAttendance {
                    reservation_id: reservation.id.clone(),
                    decision: AttendanceDecision::Declined,
                },
            )
            .await;
        assert_eq!(outcome.error_code(), Some(ErrorCode::DuplicateAction));

        let outcome = engine
            .handle(
                &actor("u1"),
                Action::AttendanceStatus {
                    reservation_id: reservation.id.clone(),
                },
            )
            .await;
        let Outcome::AttendanceStatus { confirmed, declined } = outcome else {
            panic!("expected AttendanceStatus");
        };
        assert_eq!(confirmed.len(), 1);
        assert!(declined.is_empty());
    }

    #[tokio::test]
    async fn cancellation_is_restricted_to_involved_users() {
        let (_dir, mut engine) = engine();
        let Outcome::Committed { reservation } = book(&mut engine, "u1", "09:00-11:00").await
        else {
            panic!("booking failed");
        };

        // A stranger cannot cancel it.
        let outcome = engine
            .handle(
                &actor("u9"),
                Action::CancelReservation {
                    reservation_id: reservation.id.clone(),
                },
            )
            .await;
        assert_eq!(outcome.error_code(), Some(ErrorCode::NotFound));

        // A participant can.
        let outcome = engine
            .handle(
                &actor("u3"),
                Action::CancelReservation {
                    reservation_id: reservation.id.clone(),
                },
            )
            .await;
        assert!(matches!(outcome, Outcome::Cancelled { .. }));

        // Cancelling again reports not found (already cancelled).
        let outcome = engine
            .handle(
                &actor("u1"),
                Action::CancelReservation {
                    reservation_id: reservation.id.clone(),
                },
            )
            .await;
        assert_eq!(outcome.error_code(), Some(ErrorCode::NotFound));
    }

    #[tokio::test]
    async fn cancelled_slot_becomes_bookable_again() {
        let (_dir, mut engine) = engine();
        let Outcome::Committed { reservation } = book(&mut engine, "u1", "09:00-11:00").await
        else {
            panic!("booking failed");
        };
        engine
            .handle(
                &actor("u1"),
                Action::CancelReservation {
                    reservation_id: reservation.id,
                },
            )
            .await;

        let outcome = book(&mut engine, "u2", "09:00-11:00").await;
        assert!(matches!(outcome, Outcome::Committed { .. }));
    }

    #[tokio::test]
    async fn calendar_view_pages_and_paginates() {
        let (_dir, mut engine) = engine();
        for slot in ["08:00-09:00", "09:00-10:00", "10:00-11:00"] {
            let outcome = book(&mut engine, "u1", slot).await;
            assert!(matches!(outcome, Outcome::Committed { .. }), "{slot}");
        }

        let a = actor("u5");
        let outcome = engine
            .handle(
                &a,
                Action::ViewCalendar {
                    month: 12,
                    year: 2098,
                    only_mine: false,
                },
            )
            .await;
        // Page size 2: three bookings make two pages, opening on the last.
        let Outcome::CalendarPage {
            entries,
            page,
            total_pages,
        } = outcome
        else {
            panic!("expected CalendarPage");
        };
        assert_eq!((page, total_pages), (1, 2));
        assert_eq!(entries.len(), 1);

        let outcome = engine
            .handle(
                &a,
                Action::Paginate {
                    direction: PageDirection::Previous,
                },
            )
            .await;
        let Outcome::CalendarPage { entries, page, .. } = outcome else {
            panic!("expected CalendarPage");
        };
        assert_eq!(page, 0);
        assert_eq!(entries.len(), 2);

        // Restricted view for an uninvolved user is empty, no cursor.
        let outcome = engine
            .handle(
                &a,
                Action::ViewCalendar {
                    month: 12,
                    year: 2098,
                    only_mine: true,
                },
            )
            .await;
        assert!(matches!(
            outcome,
            Outcome::CalendarPage {
                total_pages: 0,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn export_is_permission_gated() {
        let (_dir, mut engine) = engine();
        book(&mut engine, "u1", "09:00-11:00").await;

        let outcome = engine.handle(&actor("u1"), Action::ExportAll).await;
        assert_eq!(outcome.error_code(), Some(ErrorCode::Permission));

        let boss = actor("u8").with_export_capability();
        let outcome = engine.handle(&boss, Action::ExportAll).await;
        let Outcome::Export { rows } = outcome else {
            panic!("expected Export");
        };
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn commit_race_is_lost_by_the_second_session() {
        let (_dir, mut engine) = engine();
        let (a1, a2) = (actor("u1"), actor("u2"));

        for a in [&a1, &a2] {
            engine
                .handle(
                    a,
                    Action::SubmitDateTime {
                        date: DATE.to_string(),
                        time_range: "09:00-11:00".to_string(),
                    },
                )
                .await;
            engine.handle(a, Action::PickRoom { room: Room::Grande }).await;
            engine
                .handle(
                    a,
                    Action::SubmitTitle {
                        title: "Same slot".to_string(),
                    },
                )
                .await;
        }

        let outcome = engine
            .handle(&a1, Action::FinishBooking { with_participants: false })
            .await;
        assert!(matches!(outcome, Outcome::Committed { .. }));

        let outcome = engine
            .handle(&a2, Action::FinishBooking { with_participants: false })
            .await;
        assert_eq!(outcome.error_code(), Some(ErrorCode::Conflict));
    }

    #[tokio::test]
    async fn cancellable_listing_covers_only_the_actors_reservations() {
        let (_dir, mut engine) = engine();
        book(&mut engine, "u1", "09:00-11:00").await;

        let outcome = engine.handle(&actor("u1"), Action::ListCancellableMonths).await;
        let Outcome::Months { months } = outcome else {
            panic!("expected Months");
        };
        assert_eq!(months, vec![MonthYear::new(12, 2098)]);

        let outcome = engine.handle(&actor("u9"), Action::ListCancellableMonths).await;
        assert!(matches!(outcome, Outcome::Months { months } if months.is_empty()));

        let outcome = engine
            .handle(
                &actor("u2"),
                Action::ListCancellable {
                    month: 12,
                    year: 2098,
                },
            )
            .await;
        let Outcome::CancellableReservations { reservations } = outcome else {
            panic!("expected CancellableReservations");
        };
        assert_eq!(reservations.len(), 1);
    }
}
