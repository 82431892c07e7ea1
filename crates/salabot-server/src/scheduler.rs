//! The reminder scheduler.
//!
//! A periodic sweep walks every Scheduled reservation with at least one
//! participant and fires two reminder tiers, 24 hours and 1 hour before
//! the meeting, each exactly once. The per-record flags are latched and
//! flushed BEFORE the notification collaborator runs, so a delivery
//! failure can never produce a duplicate on the next sweep: at-most-once,
//! not guaranteed-delivery.
//!
//! The sweep iterates the whole collection every time. Records are never
//! deleted, so cost grows with total history; that is the scalability
//! ceiling of this design, accepted for the expected scale.

use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use salabot_core::{BookingDate, Participant, Room, TimeSlot};

use crate::store::{ReservationStore, SharedStore};

/// The two fixed reminder lead times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderTier {
    /// Fires within 24 hours of the meeting start.
    DayBefore,
    /// Fires within 1 hour of the meeting start.
    HourBefore,
}

impl ReminderTier {
    /// The tier's lead time in seconds.
    pub fn lead_seconds(&self) -> i64 {
        match self {
            Self::DayBefore => 24 * 3600,
            Self::HourBefore => 3600,
        }
    }

    /// Short label for logs and messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::DayBefore => "24h",
            Self::HourBefore => "1h",
        }
    }
}

/// One reminder to deliver: a reservation crossed a tier threshold.
///
/// The collaborator notifies every listed participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderEvent {
    pub reservation_id: String,
    pub tier: ReminderTier,
    pub room: Room,
    pub date: BookingDate,
    pub slot: TimeSlot,
    pub title: String,
    pub participants: Vec<Participant>,
}

/// Latches and collects the reminders due at `now`.
///
/// Both tiers are evaluated independently: a meeting booked less than an
/// hour ahead gets both reminders on the same sweep, each latched once.
/// Every latch is flushed before this function returns.
pub fn collect_due(store: &mut ReservationStore, now: NaiveDateTime) -> Vec<ReminderEvent> {
    let mut due: Vec<(String, bool, bool)> = Vec::new();

    for r in store.all() {
        if !r.is_active() || r.participants.is_empty() {
            continue;
        }
        let seconds_until = (r.meeting_start() - now).num_seconds();
        if seconds_until <= 0 {
            continue;
        }
        let day = !r.reminder_24h_sent
            && seconds_until <= ReminderTier::DayBefore.lead_seconds();
        let hour = !r.reminder_1h_sent
            && seconds_until <= ReminderTier::HourBefore.lead_seconds();
        if day || hour {
            due.push((r.id.clone(), day, hour));
        }
    }

    let mut events = Vec::new();
    for (id, day, hour) in due {
        // Latch first; the flush inside mutate happens before any
        // notification is handed out.
        let snapshot = store.mutate(&id, |r| {
            if day {
                r.reminder_24h_sent = true;
            }
            if hour {
                r.reminder_1h_sent = true;
            }
            (r.room, r.date, r.slot, r.title.clone(), r.participants.clone())
        });
        let Some((room, date, slot, title, participants)) = snapshot else {
            continue;
        };
        for tier in [ReminderTier::DayBefore, ReminderTier::HourBefore] {
            let fired = match tier {
                ReminderTier::DayBefore => day,
                ReminderTier::HourBefore => hour,
            };
            if fired {
                events.push(ReminderEvent {
                    reservation_id: id.clone(),
                    tier,
                    room,
                    date,
                    slot,
                    title: title.clone(),
                    participants: participants.clone(),
                });
            }
        }
    }
    events
}

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Wall-clock period between sweeps. A tunable, not a contract.
    pub interval: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
        }
    }
}

impl SweepConfig {
    /// Creates a config with the given sweep interval.
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

/// Commands that can be sent to a running scheduler.
#[derive(Debug, Clone, Copy)]
pub enum SweepCommand {
    /// Sweep immediately instead of waiting for the next tick.
    SweepNow,
    /// Stop the scheduler loop.
    Stop,
}

/// Handle for sending commands to a running scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    command_tx: mpsc::Sender<SweepCommand>,
}

impl SchedulerHandle {
    /// Triggers an immediate sweep.
    pub async fn sweep_now(&self) -> Result<(), mpsc::error::SendError<SweepCommand>> {
        self.command_tx.send(SweepCommand::SweepNow).await
    }

    /// Stops the scheduler.
    pub async fn stop(&self) -> Result<(), mpsc::error::SendError<SweepCommand>> {
        self.command_tx.send(SweepCommand::Stop).await
    }
}

/// The reminder scheduler loop.
pub struct ReminderScheduler {
    config: SweepConfig,
    command_tx: mpsc::Sender<SweepCommand>,
    command_rx: Option<mpsc::Receiver<SweepCommand>>,
}

impl ReminderScheduler {
    /// Creates a new scheduler with the given configuration.
    pub fn new(config: SweepConfig) -> Self {
        let (command_tx, command_rx) = mpsc::channel(16);
        Self {
            config,
            command_tx,
            command_rx: Some(command_rx),
        }
    }

    /// Returns a handle for sending commands to the scheduler.
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            command_tx: self.command_tx.clone(),
        }
    }

    /// Runs the sweep loop until stopped.
    ///
    /// `notify_fn` is called once per due reminder event; a failure is
    /// logged and never retried for that tier (the flag is already
    /// latched).
    pub async fn run<F, Fut>(mut self, store: SharedStore, notify_fn: F)
    where
        F: Fn(ReminderEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), String>> + Send,
    {
        let mut command_rx = self.command_rx.take().expect("run called twice");

        info!(
            interval_secs = self.config.interval.as_secs(),
            "Reminder scheduler started"
        );

        // Catch up immediately: meetings may have crossed a threshold
        // while the process was down.
        Self::sweep(&store, &notify_fn).await;

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.config.interval) => {
                    Self::sweep(&store, &notify_fn).await;
                }
                cmd = command_rx.recv() => {
                    match cmd {
                        Some(SweepCommand::SweepNow) => {
                            debug!("Received SweepNow command");
                            Self::sweep(&store, &notify_fn).await;
                        }
                        Some(SweepCommand::Stop) | None => {
                            info!("Reminder scheduler stopping");
                            break;
                        }
                    }
                }
            }
        }
    }

    async fn sweep<F, Fut>(store: &SharedStore, notify_fn: &F)
    where
        F: Fn(ReminderEvent) -> Fut,
        Fut: Future<Output = Result<(), String>>,
    {
        let events = {
            let mut store = store.write().await;
            collect_due(&mut store, Local::now().naive_local())
        };
        if events.is_empty() {
            return;
        }
        debug!(count = events.len(), "Reminders due");
        for event in events {
            let (id, tier) = (event.reservation_id.clone(), event.tier);
            if let Err(e) = notify_fn(event).await {
                warn!(reservation = %id, tier = tier.label(), error = %e,
                    "Reminder delivery failed; tier stays latched");
            }
        }
    }
}
