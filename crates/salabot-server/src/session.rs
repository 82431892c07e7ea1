//! Per-user booking sessions.
//!
//! A booking is collected over several interactions before anything is
//! committed: date and time first, then a room from the free ones, then a
//! title, then zero or more pages of participant selections. The session
//! holds the partial state in memory, keyed by the acting user; absence
//! of an entry IS the "no active session" condition.
//!
//! Sessions carry no expiry: an abandoned one stays resident until the
//! same user starts over or the process restarts. Eviction would slot in
//! here without touching any caller.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use tracing::{debug, info};
use uuid::Uuid;

use salabot_core::{
    BookingDate, Participant, Reservation, Room, TimeSlot, UserRef, available_rooms, has_conflict,
};
use salabot_protocol::Actor;

use crate::error::{EngineError, EngineResult};
use crate::store::ReservationStore;

/// Which input the session is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Room,
    Title,
    Participants,
}

/// One user's partially-built booking.
#[derive(Debug, Clone)]
pub struct BookingSession {
    date: BookingDate,
    slot: TimeSlot,
    offered_rooms: Vec<Room>,
    room: Option<Room>,
    title: Option<String>,
    /// Page index -> selected user ids. Re-submitting a page overwrites
    /// that page's previous selection.
    page_selections: BTreeMap<usize, Vec<String>>,
    step: Step,
}

impl BookingSession {
    fn new(date: BookingDate, slot: TimeSlot, offered_rooms: Vec<Room>) -> Self {
        Self {
            date,
            slot,
            offered_rooms,
            room: None,
            title: None,
            page_selections: BTreeMap::new(),
            step: Step::Room,
        }
    }

    /// The date this session is booking.
    pub fn date(&self) -> BookingDate {
        self.date
    }

    /// The slot this session is booking.
    pub fn slot(&self) -> TimeSlot {
        self.slot
    }

    /// The rooms offered when the session was opened.
    pub fn offered_rooms(&self) -> &[Room] {
        &self.offered_rooms
    }

    /// Union of all page selections in first-seen order, deduplicated.
    fn selected_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for page_ids in self.page_selections.values() {
            for id in page_ids {
                if !ids.iter().any(|seen| seen == id) {
                    ids.push(id.clone());
                }
            }
        }
        ids
    }
}

/// The keyed store of live booking sessions.
#[derive(Debug, Default)]
pub struct BookingSessions {
    sessions: HashMap<String, BookingSession>,
}

impl BookingSessions {
    /// Creates an empty session store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true if no session is live.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Returns true if the user has a live session.
    pub fn has_session(&self, user_id: &str) -> bool {
        self.sessions.contains_key(user_id)
    }

    /// Drops the user's session, if any. Returns whether one existed.
    pub fn abandon(&mut self, user_id: &str) -> bool {
        self.sessions.remove(user_id).is_some()
    }

    /// Step 1: normalize the raw date and time-range and open a session.
    ///
    /// On success the offered rooms are recorded and returned; a fresh
    /// session replaces any previous one for this user. On any failure
    /// nothing is touched, so an earlier session (if any) survives a
    /// bad retry.
    pub fn submit_date_time(
        &mut self,
        actor_id: &str,
        raw_date: &str,
        raw_slot: &str,
        today: NaiveDate,
        reservations: &[Reservation],
    ) -> EngineResult<(BookingDate, TimeSlot, Vec<Room>)> {
        let date = BookingDate::parse(raw_date, today)?;
        let slot = TimeSlot::parse(raw_slot)?;

        let rooms = available_rooms(date, slot, reservations);
        if rooms.is_empty() {
            return Err(EngineError::NoRoomAvailable { date, slot });
        }

        debug!(user = %actor_id, %date, %slot, rooms = rooms.len(), "Opening booking session");
        self.sessions.insert(
            actor_id.to_string(),
            BookingSession::new(date, slot, rooms.clone()),
        );
        Ok((date, slot, rooms))
    }

    /// Step 2: pick one of the offered rooms.
    pub fn pick_room(&mut self, actor_id: &str, room: Room) -> EngineResult<()> {
        let session = self.live_session(actor_id, Step::Room)?;
        if !session.offered_rooms.contains(&room) {
            return Err(EngineError::RoomNotOffered(room));
        }
        session.room = Some(room);
        session.step = Step::Title;
        Ok(())
    }

    /// Step 3: the meeting title, non-empty after trimming.
    pub fn submit_title(&mut self, actor_id: &str, title: &str) -> EngineResult<()> {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return Err(EngineError::EmptyTitle);
        }
        let session = self.live_session(actor_id, Step::Title)?;
        session.title = Some(trimmed.to_string());
        session.step = Step::Participants;
        Ok(())
    }

    /// Step 4: record one page's participant selection.
    ///
    /// Returns how many ids that page now carries. Selecting the same
    /// user on several pages is harmless; the union deduplicates.
    pub fn select_participants(
        &mut self,
        actor_id: &str,
        page: usize,
        user_ids: Vec<String>,
    ) -> EngineResult<usize> {
        let session = self.live_session(actor_id, Step::Participants)?;
        let count = user_ids.len();
        session.page_selections.insert(page, user_ids);
        Ok(count)
    }

    /// Step 5: commit the booking.
    ///
    /// The conflict check is re-run against the store immediately before
    /// the write: another session may have claimed the room since it was
    /// offered. On that late conflict the session is discarded and the
    /// user must start over. Selected ids are resolved against the
    /// candidate pool; ids no longer in the pool are dropped.
    pub fn finish(
        &mut self,
        actor: &Actor,
        with_participants: bool,
        candidates: &[Participant],
        store: &mut ReservationStore,
    ) -> EngineResult<Reservation> {
        let session = self.live_session(&actor.id, Step::Participants)?;
        let room = session.room.expect("room set before participants step");
        let title = session
            .title
            .clone()
            .expect("title set before participants step");
        let (date, slot) = (session.date, session.slot);

        let participants: Vec<Participant> = if with_participants {
            session
                .selected_ids()
                .iter()
                .filter_map(|id| candidates.iter().find(|c| &c.id == id).cloned())
                .collect()
        } else {
            Vec::new()
        };

        if has_conflict(room, date, slot, store.all()) {
            self.sessions.remove(&actor.id);
            info!(user = %actor.id, %room, %date, %slot, "Slot taken at commit, discarding session");
            return Err(EngineError::SlotTaken);
        }

        let reservation = Reservation::new(
            Uuid::new_v4().to_string(),
            date,
            slot,
            room,
            title,
            UserRef::new(actor.id.as_str(), actor.display_name.as_str()),
            UserRef::new(actor.id.as_str(), actor.username.as_str()),
            participants,
        );
        info!(
            id = %reservation.id,
            user = %actor.id,
            %room,
            %date,
            %slot,
            participants = reservation.participants.len(),
            "Reservation committed"
        );
        store.append(reservation.clone());
        self.sessions.remove(&actor.id);
        Ok(reservation)
    }

    fn live_session(
        &mut self,
        actor_id: &str,
        expected: Step,
    ) -> EngineResult<&mut BookingSession> {
        let session = self
            .sessions
            .get_mut(actor_id)
            .ok_or(EngineError::NoActiveSession)?;
        if session.step != expected {
            return Err(EngineError::OutOfSequence);
        }
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn actor(id: &str) -> Actor {
        Actor::new(id, format!("User {id}"), format!("{id}.name"))
    }

    fn candidates() -> Vec<Participant> {
        vec![
            Participant::new("u2", "Bruno", "bruno.reis"),
            Participant::new("u3", "Carla", "carla.m"),
            Participant::new("u4", "Diego", "diego.s"),
        ]
    }

    fn store() -> (tempfile::TempDir, ReservationStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ReservationStore::open(dir.path().join("reservations.json"));
        (dir, store)
    }

    fn book(
        sessions: &mut BookingSessions,
        store: &mut ReservationStore,
        user: &str,
        date: &str,
        slot: &str,
        room: Room,
    ) -> Reservation {
        sessions
            .submit_date_time(user, date, slot, today(), store.all())
            .unwrap();
        sessions.pick_room(user, room).unwrap();
        sessions.submit_title(user, "Planning").unwrap();
        sessions
            .finish(&actor(user), false, &[], store)
            .unwrap()
    }

    #[test]
    fn full_flow_commits_a_reservation() {
        let (_dir, mut store) = store();
        let mut sessions = BookingSessions::new();

        let (_, _, rooms) = sessions
            .submit_date_time("u1", "25/12/2025", "09:00-11:00", today(), store.all())
            .unwrap();
        assert_eq!(rooms, Room::ALL.to_vec());

        sessions.pick_room("u1", Room::Grande).unwrap();
        sessions.submit_title("u1", "  Sprint review  ").unwrap();
        sessions
            .select_participants("u1", 0, vec!["u2".to_string(), "u3".to_string()])
            .unwrap();

        let reservation = sessions
            .finish(&actor("u1"), true, &candidates(), &mut store)
            .unwrap();

        assert_eq!(reservation.title, "Sprint review");
        assert_eq!(reservation.room, Room::Grande);
        assert_eq!(reservation.participants.len(), 2);
        assert!(reservation.attendance.is_empty());
        assert!(!reservation.reminder_24h_sent);
        assert_eq!(store.len(), 1);
        assert!(!sessions.has_session("u1"));
    }

    #[test]
    fn steps_require_a_live_session() {
        let (_dir, mut store) = store();
        let mut sessions = BookingSessions::new();

        assert!(matches!(
            sessions.pick_room("u1", Room::Grande),
            Err(EngineError::NoActiveSession)
        ));
        assert!(matches!(
            sessions.submit_title("u1", "x"),
            Err(EngineError::NoActiveSession)
        ));
        assert!(matches!(
            sessions.finish(&actor("u1"), false, &[], &mut store),
            Err(EngineError::NoActiveSession)
        ));
    }

    #[test]
    fn steps_are_strictly_ordered() {
        let (_dir, mut store) = store();
        let mut sessions = BookingSessions::new();
        sessions
            .submit_date_time("u1", "25/12/2025", "09:00-11:00", today(), store.all())
            .unwrap();

        // Title before room and commit before title are both stale.
        assert!(matches!(
            sessions.submit_title("u1", "Early"),
            Err(EngineError::OutOfSequence)
        ));
        assert!(matches!(
            sessions.finish(&actor("u1"), false, &[], &mut store),
            Err(EngineError::OutOfSequence)
        ));

        sessions.pick_room("u1", Room::Menor).unwrap();
        assert!(matches!(
            sessions.pick_room("u1", Room::Menor),
            Err(EngineError::OutOfSequence)
        ));
    }

    #[test]
    fn invalid_input_leaves_existing_session_alone() {
        let (_dir, mut store) = store();
        let mut sessions = BookingSessions::new();
        sessions
            .submit_date_time("u1", "25/12/2025", "09:00-11:00", today(), store.all())
            .unwrap();

        assert!(sessions
            .submit_date_time("u1", "31/02/2026", "09:00-11:00", today(), store.all())
            .is_err());
        assert!(sessions.has_session("u1"));
        sessions.pick_room("u1", Room::Grande).unwrap();
    }

    #[test]
    fn booked_room_is_not_offered_again() {
        let (_dir, mut store) = store();
        let mut sessions = BookingSessions::new();
        book(
            &mut sessions,
            &mut store,
            "u1",
            "25/12/2025",
            "09:00-11:00",
            Room::Grande,
        );

        let (_, _, rooms) = sessions
            .submit_date_time("u2", "25/12/2025", "10:00-12:00", today(), store.all())
            .unwrap();
        assert!(!rooms.contains(&Room::Grande));

        // Touching interval: Sala Grande is offerable again.
        let (_, _, rooms) = sessions
            .submit_date_time("u2", "25/12/2025", "11:00-12:00", today(), store.all())
            .unwrap();
        assert!(rooms.contains(&Room::Grande));
    }

    #[test]
    fn fully_booked_slot_aborts_without_a_session() {
        let (_dir, mut store) = store();
        let mut sessions = BookingSessions::new();
        for room in Room::ALL {
            book(
                &mut sessions,
                &mut store,
                "u1",
                "25/12/2025",
                "09:00-11:00",
                room,
            );
        }

        assert!(matches!(
            sessions.submit_date_time("u2", "25/12/2025", "09:30-10:30", today(), store.all()),
            Err(EngineError::NoRoomAvailable { .. })
        ));
        assert!(!sessions.has_session("u2"));
    }

    #[test]
    fn picking_a_room_that_was_not_offered_fails() {
        let (_dir, mut store) = store();
        let mut sessions = BookingSessions::new();
        book(
            &mut sessions,
            &mut store,
            "u1",
            "25/12/2025",
            "09:00-11:00",
            Room::Grande,
        );

        sessions
            .submit_date_time("u2", "25/12/2025", "09:00-11:00", today(), store.all())
            .unwrap();
        assert!(matches!(
            sessions.pick_room("u2", Room::Grande),
            Err(EngineError::RoomNotOffered(Room::Grande))
        ));
    }

    #[test]
    fn commit_recheck_discards_the_losing_session() {
        let (_dir, mut store) = store();
        let mut sessions = BookingSessions::new();

        // Both users are offered Sala Grande for the same slot.
        sessions
            .submit_date_time("u1", "25/12/2025", "09:00-11:00", today(), store.all())
            .unwrap();
        sessions
            .submit_date_time("u2", "25/12/2025", "09:00-11:00", today(), store.all())
            .unwrap();
        sessions.pick_room("u1", Room::Grande).unwrap();
        sessions.pick_room("u2", Room::Grande).unwrap();
        sessions.submit_title("u1", "First").unwrap();
        sessions.submit_title("u2", "Second").unwrap();

        sessions
            .finish(&actor("u1"), false, &[], &mut store)
            .unwrap();

        // u2 committed after u1 claimed the room: refused, session gone.
        assert!(matches!(
            sessions.finish(&actor("u2"), false, &[], &mut store),
            Err(EngineError::SlotTaken)
        ));
        assert!(!sessions.has_session("u2"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn participant_union_deduplicates_across_pages() {
        let (_dir, mut store) = store();
        let mut sessions = BookingSessions::new();
        sessions
            .submit_date_time("u1", "25/12/2025", "09:00-11:00", today(), store.all())
            .unwrap();
        sessions.pick_room("u1", Room::Grande).unwrap();
        sessions.submit_title("u1", "Planning").unwrap();

        sessions
            .select_participants("u1", 0, vec!["u2".to_string(), "u3".to_string()])
            .unwrap();
        sessions
            .select_participants("u1", 1, vec!["u3".to_string(), "u4".to_string()])
            .unwrap();
        // Page 0 re-submitted: overwrites its earlier selection.
        sessions
            .select_participants("u1", 0, vec!["u2".to_string()])
            .unwrap();

        let reservation = sessions
            .finish(&actor("u1"), true, &candidates(), &mut store)
            .unwrap();
        let ids: Vec<&str> = reservation
            .participants
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(ids, ["u2", "u3", "u4"]);
    }

    #[test]
    fn unknown_selected_ids_are_dropped() {
        let (_dir, mut store) = store();
        let mut sessions = BookingSessions::new();
        sessions
            .submit_date_time("u1", "25/12/2025", "09:00-11:00", today(), store.all())
            .unwrap();
        sessions.pick_room("u1", Room::Grande).unwrap();
        sessions.submit_title("u1", "Planning").unwrap();
        sessions
            .select_participants("u1", 0, vec!["u2".to_string(), "left-org".to_string()])
            .unwrap();

        let reservation = sessions
            .finish(&actor("u1"), true, &candidates(), &mut store)
            .unwrap();
        assert_eq!(reservation.participants.len(), 1);
        assert_eq!(reservation.participants[0].id, "u2");
    }

    #[test]
    fn finishing_without_participants_ignores_selections() {
        let (_dir, mut store) = store();
        let mut sessions = BookingSessions::new();
        sessions
            .submit_date_time("u1", "25/12/2025", "09:00-11:00", today(), store.all())
            .unwrap();
        sessions.pick_room("u1", Room::Grande).unwrap();
        sessions.submit_title("u1", "Planning").unwrap();
        sessions
            .select_participants("u1", 0, vec!["u2".to_string()])
            .unwrap();

        let reservation = sessions
            .finish(&actor("u1"), false, &candidates(), &mut store)
            .unwrap();
        assert!(reservation.participants.is_empty());
    }

    #[test]
    fn cancelled_reservation_frees_the_slot() {
        let (_dir, mut store) = store();
        let mut sessions = BookingSessions::new();
        let first = book(
            &mut sessions,
            &mut store,
            "u1",
            "25/12/2025",
            "09:00-11:00",
            Room::Grande,
        );

        assert!(matches!(
            sessions.submit_date_time("u2", "25/12/2025", "09:00-11:00", today(), store.all()),
            Ok((_, _, rooms)) if !rooms.contains(&Room::Grande)
        ));

        store.mutate(&first.id, |r| r.cancel());
        let (_, _, rooms) = sessions
            .submit_date_time("u2", "25/12/2025", "09:00-11:00", today(), store.all())
            .unwrap();
        assert!(rooms.contains(&Room::Grande));
    }
}
