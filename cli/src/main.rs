//! `fleet` - terminal shell for the fleet dashboard core.

#![deny(unsafe_code)]

mod args;
mod config;
mod logging;
mod shell;

use std::process::ExitCode;

use anyhow::bail;
use chrono::{DateTime, Utc};
use clap::Parser;

use fleet_shared::{Event, NotificationKind, VehicleFormValues, VehicleId, ViewModel};

use crate::args::{Cli, Command};
use crate::config::Settings;
use crate::logging::init_logging;
use crate::shell::Shell;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbosity());

    let settings = Settings::load(cli.config.as_deref())?;
    let api = settings.api_config(cli.api_base_url.as_deref());
    api.validate()?;
    tracing::debug!(base_url = %api.base_url, "configuration loaded");

    let mut shell = Shell::new(api, settings.request_timeout()).await?;
    shell.dispatch(Event::AppStarted).await;

    match cli.command {
        Command::List => {}
        Command::Create { name, code } => {
            if loaded(&shell) {
                shell.dispatch(Event::CreateFormOpened).await;
                shell
                    .dispatch(Event::FormSubmitted(VehicleFormValues::new(name, code)))
                    .await;
            }
        }
        Command::Update { id, name } => {
            if loaded(&shell) {
                update(&mut shell, VehicleId::new(id), name).await?;
            }
        }
        Command::Telemetry { id, from, to } => {
            if loaded(&shell) {
                telemetry(&mut shell, VehicleId::new(id), from.zip(to)).await?;
                return Ok(report(&shell.view()));
            }
        }
    }

    let view = shell.view();
    print_vehicles(&view);
    Ok(report(&view))
}

fn loaded(shell: &Shell) -> bool {
    shell.view().list_error.is_none()
}

async fn update(shell: &mut Shell, id: VehicleId, name: String) -> anyhow::Result<()> {
    shell
        .dispatch(Event::EditFormOpened {
            vehicle_id: id.clone(),
        })
        .await;
    let Some(form) = shell.view().form else {
        bail!("no vehicle with id {id}");
    };
    shell
        .dispatch(Event::FormSubmitted(VehicleFormValues::new(name, form.values.code)))
        .await;
    Ok(())
}

async fn telemetry(
    shell: &mut Shell,
    id: VehicleId,
    window: Option<(DateTime<Utc>, DateTime<Utc>)>,
) -> anyhow::Result<()> {
    if let Some((start, end)) = window {
        if start > end {
            bail!("--from must not be after --to");
        }
        shell
            .dispatch(Event::TelemetryRangeChanged { start, end })
            .await;
    }
    shell
        .dispatch(Event::VehicleSelected {
            vehicle_id: id.clone(),
        })
        .await;

    let view = shell.view();
    let Some(drawer) = view.drawer else {
        bail!("no vehicle with id {id}");
    };

    println!("{}  ({})", drawer.title, drawer.subtitle);
    if let Some(range) = &drawer.range {
        println!("{}", range.label);
    }
    println!();
    println!("{:<22} {:>8}  {}", "TIMESTAMP", "SPEED", "LOCATION");
    for row in &drawer.rows {
        println!("{:<22} {:>8}  {}", row.timestamp, row.speed, row.location);
    }
    if drawer.rows.is_empty() {
        println!("No telemetry in this window");
    }
    Ok(())
}

fn print_vehicles(view: &ViewModel) {
    if view.vehicles.is_empty() {
        println!("{}", view.empty_text);
        return;
    }
    println!(
        "{:<24} {:<12} {:>8}  {:<20} {}",
        "VEHICLE", "CODE", "SPEED", "LOCATION", "LAST UPDATED"
    );
    for row in &view.vehicles {
        println!(
            "{:<24} {:<12} {:>8}  {:<20} {}",
            row.name, row.subtitle, row.speed, row.location, row.last_updated
        );
    }
}

/// Prints the pending notification and maps it to the process exit code.
fn report(view: &ViewModel) -> ExitCode {
    match &view.notification {
        Some(notification) if notification.kind == NotificationKind::Error => {
            eprintln!("error: {}", notification.message);
            ExitCode::FAILURE
        }
        Some(notification) => {
            eprintln!("{}", notification.message);
            ExitCode::SUCCESS
        }
        None => ExitCode::SUCCESS,
    }
}
