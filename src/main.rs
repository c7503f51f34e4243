/*
 * This file is part of gpufan.
 *
 * Copyright (C) 2025 gpufan contributors
 *
 * gpufan is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * gpufan is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with gpufan. If not, see <https://www.gnu.org/licenses/>.
 */

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};

use gf_core::constants::limits;
use gf_core::{
    load_config, resolve_config_path, ActuatorId, HwmonActuators, ShutdownSequencer,
    SystemTelemetry,
};
use gpufan::cli::{Cli, RunMode};
use gpufan::control_loop::{Driver, Mode};
use gpufan::logger::{init_logging, level_from_env, LogSettings};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // PHASE 0: Log panics to stderr; the driver's exit guard releases the fans
    // while the panic unwinds.
    std::panic::set_hook(Box::new(|panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());

        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("PANIC at {}: {}", location, message);
    }));

    // PHASE 1: Arguments and configuration
    let cli = Cli::parse();

    let config_path = resolve_config_path(cli.config.as_deref())?;
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;

    // PHASE 2: Logging
    let sinks = init_logging(&LogSettings {
        level: level_from_env(&config.control.log_level),
        log_dir: config.control.log_dir.clone(),
        journald: cli.journald,
    })?;

    info!("STARTUP: gpufan {} starting", VERSION);
    info!("STARTUP: Kernel {}", gf_core::system::kernel_version());
    info!("STARTUP: Config: {}", config_path.display());
    info!(
        "STARTUP: Logging to {}{}",
        if sinks.journald { "systemd journal" } else { "stdout" },
        sinks
            .file
            .as_ref()
            .map(|p| format!(" and {}", p.display()))
            .unwrap_or_default()
    );

    // PHASE 3: Privileges
    if cli.mode == RunMode::Control && !gf_core::system::is_root() {
        error!("Control mode requires root privileges");
        eprintln!(
            "Control mode requires root privileges. Run with: sudo {} --mode control",
            std::env::args().next().unwrap_or_else(|| "gpufan".to_string())
        );
        std::process::exit(1);
    }

    // PHASE 4: Hardware overview
    for id in ActuatorId::ALL {
        info!("STARTUP: {} fan -> {}", id, config.fans.path(id).display());
    }
    let gpu_count = gf_gpu::count_gpus();
    if gpu_count < limits::EXPECTED_GPUS {
        warn!(
            "Found {} GPU(s), expected {}; missing GPUs read as {}°C / {}W",
            gpu_count,
            limits::EXPECTED_GPUS,
            gf_core::constants::fallback::GPU_TEMP,
            gf_core::constants::fallback::GPU_POWER
        );
    }

    // PHASE 5: Termination signal only requests shutdown; the driver
    // performs it.
    let sequencer = Arc::new(ShutdownSequencer::new(config.control.settle_delay()));
    let signal_sequencer = Arc::clone(&sequencer);
    if let Err(e) = ctrlc::set_handler(move || {
        if signal_sequencer.request() {
            info!("SIGNAL: Received SIGINT/SIGTERM - initiating shutdown");
        } else {
            info!("SIGNAL: Shutdown already in progress");
        }
    }) {
        warn!("Failed to set signal handler: {}. SIGINT/SIGTERM will not release the fans.", e);
    }

    // PHASE 6: Run
    let mode = Mode::from(cli.mode);
    let telemetry = SystemTelemetry::new(config.fans.clone());
    let actuators = HwmonActuators::new(config.fans.clone(), config.control.pwm_max);
    let mut driver = Driver::new(mode, &config, telemetry, actuators, sequencer);

    if let Some(report) = driver.run().await {
        let unreleased = report.unreleased();
        if !unreleased.is_empty() {
            error!("SHUTDOWN: fans left under software control: {:?}", unreleased);
        }
    }

    info!("SHUTDOWN: gpufan stopped");
    Ok(())
}
