//! Tabular export of the full reservation history.
//!
//! The engine produces rows and a CSV artifact; turning that into a
//! spreadsheet and mailing it belongs to the [`ExportSink`] collaborator.
//! Exports always cover the whole history, cancelled reservations
//! included.

use chrono::{Duration, NaiveDateTime, NaiveTime};

use salabot_core::Reservation;
use salabot_protocol::ExportRow;

/// Builds one export row per reservation, in append order.
pub fn export_rows(reservations: &[Reservation]) -> Vec<ExportRow> {
    reservations
        .iter()
        .map(|r| ExportRow {
            date: r.date.to_string(),
            time_range: r.slot.to_string(),
            room: r.room.display_name().to_string(),
            title: r.title.clone(),
            organizer_name: r.organizer.name.clone(),
            organizer_id: r.organizer.id.clone(),
            creator_name: r.creator.name.clone(),
            creator_id: r.creator.id.clone(),
            participants: r
                .participants
                .iter()
                .map(|p| p.mention())
                .collect::<Vec<_>>()
                .join(", "),
            status: r.status.display_name().to_string(),
        })
        .collect()
}

/// Renders rows as CSV with a header line.
pub fn render_csv(rows: &[ExportRow]) -> String {
    let mut out = String::new();
    out.push_str(&csv_line(&ExportRow::HEADERS));
    for row in rows {
        out.push_str(&csv_line(&row.fields()));
    }
    out
}

fn csv_line(fields: &[&str]) -> String {
    let mut line = fields
        .iter()
        .map(|f| csv_field(f))
        .collect::<Vec<_>>()
        .join(",");
    line.push('\n');
    line
}

fn csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// The fixed daily export times.
#[derive(Debug, Clone)]
pub struct ExportSchedule {
    times: Vec<NaiveTime>,
}

impl ExportSchedule {
    /// Creates a schedule from times of day. Duplicates are harmless.
    pub fn new(mut times: Vec<NaiveTime>) -> Self {
        times.sort();
        times.dedup();
        Self { times }
    }

    /// The next occurrence strictly after `now`, or `None` for an empty
    /// schedule.
    pub fn next_run(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        let today = now.date();
        self.times
            .iter()
            .map(|t| today.and_time(*t))
            .find(|dt| *dt > now)
            .or_else(|| {
                self.times
                    .first()
                    .map(|t| (today + Duration::days(1)).and_time(*t))
            })
    }
}

/// Where scheduled and on-demand export artifacts are handed off.
///
/// The reference deployment mails a spreadsheet; the engine does not
/// care, it only delivers the tabular artifact.
pub trait ExportSink {
    /// Delivers one export artifact.
    fn deliver(&self, filename: &str, csv: &str) -> std::io::Result<()>;
}
