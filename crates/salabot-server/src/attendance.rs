//! Attendance recording.
//!
//! Each invited participant answers a reservation invitation at most
//! once. A second attempt is rejected and the original decision stands
//! (idempotent-reject, not overwrite).

use tracing::debug;

use salabot_core::{AttendanceDecision, Participant};

use crate::error::{EngineError, EngineResult};
use crate::store::ReservationStore;

/// The attendance picture of one reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceStatus {
    /// Participants who confirmed, in invitation order.
    pub confirmed: Vec<Participant>,
    /// Participants who declined, in invitation order.
    pub declined: Vec<Participant>,
}

/// Records `user_id`'s decision for a reservation.
///
/// Fails with `NotFound` for an unknown or cancelled reservation,
/// `NotAParticipant` when the user was not invited (attendance keys stay
/// a subset of the participant list), and `AlreadyRecorded` on a second
/// attempt.
pub fn record(
    store: &mut ReservationStore,
    reservation_id: &str,
    user_id: &str,
    decision: AttendanceDecision,
) -> EngineResult<AttendanceDecision> {
    let reservation = store
        .find(reservation_id)
        .filter(|r| r.is_active())
        .ok_or_else(|| EngineError::not_found(reservation_id))?;

    if !reservation.is_participant(user_id) {
        return Err(EngineError::NotAParticipant);
    }
    if let Some(existing) = reservation.attendance_for(user_id) {
        return Err(EngineError::AlreadyRecorded { existing });
    }

    store.mutate(reservation_id, |r| {
        r.attendance.insert(user_id.to_string(), decision);
    });
    debug!(reservation = %reservation_id, user = %user_id, ?decision, "Attendance recorded");
    Ok(decision)
}

/// Reads the attendance status of a reservation. Pure read; cancelled
/// reservations can still be inspected.
pub fn status(store: &ReservationStore, reservation_id: &str) -> EngineResult<AttendanceStatus> {
    let reservation = store
        .find(reservation_id)
        .ok_or_else(|| EngineError::not_found(reservation_id))?;

    Ok(AttendanceStatus {
        confirmed: reservation
            .participants_with_decision(AttendanceDecision::Confirmed)
            .into_iter()
            .cloned()
            .collect(),
        declined: reservation
            .participants_with_decision(AttendanceDecision::Declined)
            .into_iter()
            .cloned()
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use salabot_core::{BookingDate, Reservation, Room, TimeSlot, UserRef};

    fn seeded_store() -> (tempfile::TempDir, ReservationStore) {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ReservationStore::open(dir.path().join("reservations.json"));
        store.append(Reservation::new(
            "r1",
            BookingDate::from_naive(NaiveDate::from_ymd_opt(2025, 12, 25).unwrap()),
            TimeSlot::parse("09:00-11:00").unwrap(),
            Room::Grande,
            "Planning",
            UserRef::new("u1", "Ana"),
            UserRef::new("u1", "ana.lima"),
            vec![
                Participant::new("u2", "Bruno", "bruno.reis"),
                Participant::new("u3", "Carla", "carla.m"),
            ],
        ));
        (dir, store)
    }

    #[test]
    fn first_decision_is_recorded() {
        let (_dir, mut store) = seeded_store();

        let decision = record(&mut store, "r1", "u2", AttendanceDecision::Confirmed).unwrap();
        assert_eq!(decision, AttendanceDecision::Confirmed);

        let st = status(&store, "r1").unwrap();
        assert_eq!(st.confirmed.len(), 1);
        assert_eq!(st.confirmed[0].id, "u2");
        assert!(st.declined.is_empty());
    }

    #[test]
    fn second_decision_is_rejected_and_original_kept() {
        let (_dir, mut store) = seeded_store();
        record(&mut store, "r1", "u2", AttendanceDecision::Declined).unwrap();

        let err = record(&mut store, "r1", "u2", AttendanceDecision::Confirmed).unwrap_err();
        assert!(matches!(
            err,
            EngineError::AlreadyRecorded {
                existing: AttendanceDecision::Declined
            }
        ));

        let st = status(&store, "r1").unwrap();
        assert!(st.confirmed.is_empty());
        assert_eq!(st.declined[0].id, "u2");
    }

    #[test]
    fn non_participants_cannot_record() {
        let (_dir, mut store) = seeded_store();
        // u1 organizes but was not invited as a participant.
        assert!(matches!(
            record(&mut store, "r1", "u1", AttendanceDecision::Confirmed),
            Err(EngineError::NotAParticipant)
        ));
        assert!(store.find("r1").unwrap().attendance.is_empty());
    }

    #[test]
    fn unknown_or_cancelled_reservation_is_not_found() {
        let (_dir, mut store) = seeded_store();
        assert!(matches!(
            record(&mut store, "ghost", "u2", AttendanceDecision::Confirmed),
            Err(EngineError::NotFound { .. })
        ));

        store.mutate("r1", |r| r.cancel());
        assert!(matches!(
            record(&mut store, "r1", "u2", AttendanceDecision::Confirmed),
            Err(EngineError::NotFound { .. })
        ));
        // The status read still works on a cancelled reservation.
        assert!(status(&store, "r1").is_ok());
    }

    #[test]
    fn decisions_survive_a_reload() {
        let (dir, mut store) = seeded_store();
        record(&mut store, "r1", "u3", AttendanceDecision::Confirmed).unwrap();

        let reloaded = ReservationStore::open(dir.path().join("reservations.json"));
        let st = status(&reloaded, "r1").unwrap();
        assert_eq!(st.confirmed[0].id, "u3");
    }
}
