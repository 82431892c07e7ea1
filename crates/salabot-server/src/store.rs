//! The durable reservation store.
//!
//! Reservations are held in memory and written through to a single JSON
//! file on every mutation. The whole collection is (re)written each time;
//! at the expected scale (tens to low thousands of records) that is
//! cheaper than being clever. A failed flush is logged and the in-memory
//! state stays authoritative until the next successful flush.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use salabot_core::Reservation;

use crate::error::EngineResult;

/// The reservation collection, backed by a JSON file.
#[derive(Debug)]
pub struct ReservationStore {
    path: PathBuf,
    reservations: Vec<Reservation>,
}

impl ReservationStore {
    /// Opens the store at `path`, loading the durable image wholesale.
    ///
    /// A missing file starts an empty store; an unreadable or malformed
    /// image is logged and the store starts empty rather than failing
    /// startup.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let reservations = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Vec<Reservation>>(&raw) {
                Ok(records) => {
                    debug!(count = records.len(), path = %path.display(), "Loaded reservations");
                    records
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Malformed reservation image, starting empty");
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable reservation image, starting empty");
                Vec::new()
            }
        };
        Self { path, reservations }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All reservations, active and cancelled, in append order.
    pub fn all(&self) -> &[Reservation] {
        &self.reservations
    }

    /// Returns the number of reservations ever committed.
    pub fn len(&self) -> usize {
        self.reservations.len()
    }

    /// Returns true if nothing was ever committed.
    pub fn is_empty(&self) -> bool {
        self.reservations.is_empty()
    }

    /// Finds a reservation by id.
    pub fn find(&self, id: &str) -> Option<&Reservation> {
        self.reservations.iter().find(|r| r.id == id)
    }

    /// Reservations matching a predicate, in append order.
    pub fn filter(&self, pred: impl Fn(&Reservation) -> bool) -> Vec<&Reservation> {
        self.reservations.iter().filter(|r| pred(r)).collect()
    }

    /// Appends a new reservation and flushes.
    pub fn append(&mut self, reservation: Reservation) {
        debug!(id = %reservation.id, room = %reservation.room, "Appending reservation");
        self.reservations.push(reservation);
        self.flush_logged();
    }

    /// Mutates the reservation with the given id and flushes.
    ///
    /// Returns the closure's result, or `None` when the id is unknown
    /// (in which case nothing is flushed).
    pub fn mutate<T>(&mut self, id: &str, f: impl FnOnce(&mut Reservation) -> T) -> Option<T> {
        let reservation = self.reservations.iter_mut().find(|r| r.id == id)?;
        let result = f(reservation);
        self.flush_logged();
        Some(result)
    }

    /// Serializes the whole collection to the backing file.
    pub fn flush(&self) -> EngineResult<()> {
        let raw = serde_json::to_string_pretty(&self.reservations)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }

    fn flush_logged(&self) {
        if let Err(e) = self.flush() {
            error!(path = %self.path.display(), error = %e, "Failed to flush reservations");
        }
    }
}

/// Shared handle to the store: interaction handling and the reminder
/// sweep serialize their mutations through this one lock.
pub type SharedStore = Arc<RwLock<ReservationStore>>;

/// Wraps a store for sharing.
pub fn new_shared_store(store: ReservationStore) -> SharedStore {
    Arc::new(RwLock::new(store))
}
