//! Command handlers: read views over the coordinator plus thin command
//! pass-throughs. Every mutation triggers an out-of-band refresh afterwards
//! so the next read reflects the change.

use std::time::Duration;

use owo_colors::OwoColorize;
use tracing::warn;

use stovelink_core::{Command as StoveCommand, Coordinator, OperationalPhase};

use crate::cli::{Command, OnOff};
use crate::error::CliError;

pub async fn dispatch(cmd: Command, coordinator: &Coordinator) -> Result<(), CliError> {
    match cmd {
        Command::Status => status(coordinator).await,
        Command::Watch { .. } => watch(coordinator).await,
        Command::Alarms => alarms(coordinator).await,

        Command::Power { state } => send(coordinator, StoveCommand::SetPower(state.into())).await,
        Command::Temp { value } => {
            send(coordinator, StoveCommand::SetTargetTemperature(value)).await
        }
        Command::Fan { index, level } => {
            send(coordinator, StoveCommand::SetFanSpeed { index, value: level }).await
        }
        Command::Airkare { state } => {
            send(coordinator, StoveCommand::SetAirkare(state.into())).await
        }
        Command::Relax { state } => send(coordinator, StoveCommand::SetRelax(state.into())).await,
        Command::Chrono { state } => {
            send(coordinator, StoveCommand::SetChronoMode(state.into())).await
        }
        Command::Standby { state } => {
            send(coordinator, StoveCommand::SetStandby(state.into())).await
        }
        Command::Auto => send(coordinator, StoveCommand::SetAutoMode(true)).await,
        Command::Manual { level } => {
            send(coordinator, StoveCommand::SetAutoMode(false)).await?;
            send(coordinator, StoveCommand::SetManualPower(level)).await
        }
        Command::Check => send(coordinator, StoveCommand::CheckConfiguration).await,
    }
}

// ── Reads ────────────────────────────────────────────────────────────

async fn status(coordinator: &Coordinator) -> Result<(), CliError> {
    coordinator.refresh().await?;

    println!("{} {}", "Stove".bold(), coordinator.mac_address());
    println!(
        "  {:<16}{}",
        "Phase",
        coordinator
            .operational_phase()
            .map_or_else(|| "unreported".dimmed().to_string(), phase_label)
    );
    println!("  {:<16}{}", "Power", fmt_switch(coordinator.power()));
    println!(
        "  {:<16}{} (target {})",
        "Temperature",
        fmt_celsius(coordinator.temperature()),
        fmt_celsius(coordinator.target_temperature()),
    );
    println!("  {:<16}{}", "Regulation", fmt_regulation(coordinator));
    println!(
        "  {:<16}{}",
        "Actual power",
        fmt_opt(coordinator.actual_power())
    );
    println!("  {:<16}{}", "Fans", fmt_fans(coordinator));
    println!("  {:<16}{}", "Autonomy", fmt_autonomy(coordinator));
    println!(
        "  {:<16}{}",
        "Pellet reserve",
        match coordinator.pellet_in_reserve() {
            Some(true) => "low".yellow().to_string(),
            Some(false) => "ok".green().to_string(),
            None => "unreported".dimmed().to_string(),
        }
    );
    println!(
        "  {:<16}{}",
        "Airkare",
        fmt_switch(coordinator.airkare_active())
    );
    println!("  {:<16}{}", "Relax", fmt_switch(coordinator.relax_active()));
    println!(
        "  {:<16}{}",
        "Chrono",
        fmt_switch(coordinator.chrono_mode_active())
    );
    println!(
        "  {:<16}{}",
        "Standby",
        if coordinator.standby_mode() { "on" } else { "off" }
    );
    println!(
        "  {:<16}{}",
        "Alarms",
        fmt_opt(coordinator.nb_alarms())
    );

    Ok(())
}

async fn watch(coordinator: &Coordinator) -> Result<(), CliError> {
    // First cycle failing is worth reporting, but keep watching -- the
    // background task retries on the fixed interval.
    if let Err(e) = coordinator.refresh().await {
        warn!(error = %e, "initial refresh failed");
    }

    let task = coordinator.spawn_refresh_task();
    let mut snapshots = coordinator.subscribe();
    let mut health = coordinator.subscribe_health();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                println!(
                    "{}  phase={}  temp={}  target={}",
                    chrono::Local::now().format("%H:%M:%S"),
                    coordinator
                        .operational_phase()
                        .map_or_else(|| "?".into(), |p| p.to_string()),
                    fmt_celsius(coordinator.temperature()),
                    fmt_celsius(coordinator.target_temperature()),
                );
            }
            changed = health.changed() => {
                if changed.is_err() {
                    break;
                }
                let message = match &*health.borrow_and_update() {
                    stovelink_core::RefreshHealth::Failed { message, .. } => {
                        Some(message.clone())
                    }
                    _ => None,
                };
                if let Some(message) = message {
                    eprintln!(
                        "{}  {} {}",
                        chrono::Local::now().format("%H:%M:%S"),
                        "refresh failed:".red(),
                        message,
                    );
                }
            }
        }
    }

    coordinator.shutdown();
    let _ = task.await;
    Ok(())
}

async fn alarms(coordinator: &Coordinator) -> Result<(), CliError> {
    coordinator.refresh().await?;

    let alarms = coordinator.alarms();
    if alarms.is_empty() {
        println!("No live alarms.");
        return Ok(());
    }

    for alarm in alarms {
        let when = alarm
            .timestamp
            .map_or_else(|| "unknown time".into(), |t| t.to_rfc3339());
        println!(
            "{}  code {}",
            when,
            alarm.code.map_or_else(|| "?".into(), |c| c.to_string()),
        );
    }
    Ok(())
}

// ── Writes ───────────────────────────────────────────────────────────

async fn send(coordinator: &Coordinator, command: StoveCommand) -> Result<(), CliError> {
    coordinator.execute(command).await?;
    println!("{}", "Command acknowledged.".green());

    // Commands never touch the cache themselves; pull the new state now.
    if let Err(e) = coordinator.refresh().await {
        warn!(error = %e, "post-command refresh failed; state may be stale");
    }
    Ok(())
}

// ── Formatting helpers ───────────────────────────────────────────────

fn phase_label(phase: OperationalPhase) -> String {
    match phase {
        OperationalPhase::On => phase.to_string().green().to_string(),
        OperationalPhase::Alarm => phase.to_string().red().to_string(),
        _ => phase.to_string(),
    }
}

fn fmt_switch(value: Option<bool>) -> String {
    match value {
        Some(true) => "on".into(),
        Some(false) => "off".into(),
        None => "unreported".dimmed().to_string(),
    }
}

fn fmt_celsius(value: Option<f64>) -> String {
    value.map_or_else(
        || "--".dimmed().to_string(),
        |v| format!("{v:.1} °C"),
    )
}

fn fmt_opt(value: Option<i64>) -> String {
    value.map_or_else(|| "unreported".dimmed().to_string(), |v| v.to_string())
}

fn fmt_regulation(coordinator: &Coordinator) -> String {
    if coordinator.is_auto() {
        "automatic".into()
    } else {
        match coordinator.manual_power() {
            Some(level) => format!("manual P{level}"),
            None => "manual".into(),
        }
    }
}

fn fmt_fans(coordinator: &Coordinator) -> String {
    let Some(count) = coordinator.nb_fans() else {
        return "unreported".dimmed().to_string();
    };
    let levels: Vec<String> = (1..=usize::try_from(count).unwrap_or(0))
        .map(|i| {
            format!(
                "fan {} level {}",
                i,
                coordinator
                    .fan_speed(i)
                    .map_or_else(|| "?".into(), |v| v.to_string()),
            )
        })
        .collect();
    if levels.is_empty() {
        format!("{count} installed")
    } else {
        format!("{count} installed; {}", levels.join(", "))
    }
}

fn fmt_autonomy(coordinator: &Coordinator) -> String {
    match coordinator.autonomy_seconds() {
        Some(secs) if secs >= 0 => {
            let duration = Duration::from_secs(u64::try_from(secs).unwrap_or(0));
            humantime::format_duration(duration).to_string()
        }
        _ => "unreported".dimmed().to_string(),
    }
}
