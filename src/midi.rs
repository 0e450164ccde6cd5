// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! MIDI event buffering and device input.
use std::error::Error;

pub mod buffer;
pub mod midir;

pub use buffer::{MidiBuffer, TimedEvent};

/// Lists MIDI input devices known to midir.
pub fn list_devices() -> Result<Vec<midir::Device>, Box<dyn Error>> {
    midir::list()
}

/// Gets a MIDI input device whose name contains the given name.
pub fn get_device(name: &str) -> Result<midir::Device, Box<dyn Error>> {
    midir::get(name)
}
