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

//! gpufan - fan control daemon for dual-GPU Linux workstations
//!
//! The binary wires the `gf-core` engine to real hardware; this library
//! holds the pieces of it that are worth testing on their own.

pub mod cli;
pub mod control_loop;
pub mod logger;
