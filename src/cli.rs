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

//! Command Line Interface

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::control_loop::Mode;

#[derive(Parser, Debug)]
#[command(name = "gpufan")]
#[command(version)]
#[command(about = "gpufan - CPU/GPU/VRM fan control for dual-GPU Linux workstations")]
#[command(long_about = "gpufan - CPU/GPU/VRM fan control for dual-GPU Linux workstations

Reads CPU temperature from hwmon and per-GPU temperature and power from
nvidia-smi, then drives four PWM fans from threshold rules.

EXAMPLES:
    gpufan                              Monitor only: print recommended speeds
    sudo gpufan --mode control          Apply fan speeds
    gpufan --config ./my-config.json    Use an explicit configuration file

ENVIRONMENT VARIABLES:
    GPUFAN_LOG=debug       Override the configured log level

FILES:
    ./config.json                       Checked first
    ~/.config/gpufan/config.json        User configuration
    /etc/gpufan/config.json             System configuration")]
pub struct Cli {
    /// Run mode
    #[arg(short, long, value_enum, default_value_t = RunMode::Monitor)]
    pub mode: RunMode,

    /// Configuration file (JSON)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log to the systemd journal instead of stdout when available
    #[arg(long)]
    pub journald: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Compute and apply fan speeds (requires root)
    Control,
    /// Compute and print fan speeds without touching hardware
    Monitor,
}

impl From<RunMode> for Mode {
    fn from(mode: RunMode) -> Self {
        match mode {
            RunMode::Control => Mode::Enforce,
            RunMode::Monitor => Mode::Observe,
        }
    }
}
