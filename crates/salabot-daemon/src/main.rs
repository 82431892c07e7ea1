//! salabot daemon entry point.
//!
//! Runs the parts of the system that need a clock rather than a user:
//! the reminder sweep and the scheduled export. Reminders are logged
//! through tracing here; a real deployment routes them through the chat
//! transport instead.

mod cli;
mod sink;

use std::process::ExitCode;

use chrono::Local;
use clap::Parser;
use tracing::{error, info};

use salabot_core::{TracingConfig, init_tracing};
use salabot_server::{
    EngineConfig, EngineResult, ExportSchedule, ExportSink, ReminderEvent, ReminderScheduler,
    ReservationStore, SharedStore, SweepConfig, export_rows, new_shared_store, render_csv,
};

use cli::{Cli, Command};
use sink::CsvFileSink;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing_config = if cli.debug {
        TracingConfig::debug()
    } else {
        TracingConfig::default()
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("error: {e}");
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> EngineResult<()> {
    let mut config = match cli.config {
        Some(ref path) => EngineConfig::load_from(path)?,
        None => EngineConfig::default(),
    };
    if let Some(data_file) = cli.data_file {
        config = config.with_data_file(data_file);
    }
    if let Some(secs) = cli.sweep_interval_secs {
        config.sweep_interval_secs = secs;
    }

    let store = new_shared_store(ReservationStore::open(&config.data_file));

    if let Some(Command::Export { output }) = cli.command {
        return export_once(&store, output).await;
    }

    let scheduler = ReminderScheduler::new(SweepConfig::new(config.sweep_interval()));
    let handle = scheduler.handle();
    let reminder_task = tokio::spawn(scheduler.run(store.clone(), log_reminder));

    let schedule = ExportSchedule::new(config.export_times());
    let sink_dir = config
        .data_file
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_default();
    let export_task = tokio::spawn(export_loop(store.clone(), schedule, CsvFileSink::new(sink_dir)));

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");

    let _ = handle.stop().await;
    let _ = reminder_task.await;
    export_task.abort();
    Ok(())
}

/// Deliver a reminder by logging it; the transport collaborator takes
/// over in a wired deployment.
async fn log_reminder(event: ReminderEvent) -> Result<(), String> {
    for participant in &event.participants {
        info!(
            tier = event.tier.label(),
            participant = %participant.id,
            room = %event.room,
            date = %event.date,
            slot = %event.slot,
            title = %event.title,
            "Meeting reminder"
        );
    }
    Ok(())
}

async fn export_once(store: &SharedStore, output: Option<std::path::PathBuf>) -> EngineResult<()> {
    let csv = {
        let store = store.read().await;
        render_csv(&export_rows(store.all()))
    };
    match output {
        Some(path) => std::fs::write(path, csv)?,
        None => print!("{csv}"),
    }
    Ok(())
}

async fn export_loop(store: SharedStore, schedule: ExportSchedule, sink: CsvFileSink) {
    loop {
        let now = Local::now().naive_local();
        let Some(next) = schedule.next_run(now) else {
            info!("No export times configured, scheduled export disabled");
            return;
        };
        let wait = (next - now).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;

        let csv = {
            let store = store.read().await;
            render_csv(&export_rows(store.all()))
        };
        match sink.deliver("salas.csv", &csv) {
            Ok(()) => info!(at = %next, "Scheduled export written"),
            Err(e) => error!(error = %e, "Scheduled export failed"),
        }
    }
}
