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

//! Audio buffers, sample decoding and the cpal output device.
use std::error::Error;

pub mod buffer;
pub mod cpal;
pub mod error;
pub mod wav;

pub use buffer::AudioBuffer;
pub use error::DecodeError;
pub use wav::DecodedAudio;

/// Lists output devices known to cpal.
pub fn list_devices() -> Result<Vec<cpal::Device>, Box<dyn Error>> {
    cpal::Device::list()
}

/// Gets an output device by name, or the host's default output device if no name is given.
pub fn get_device(name: Option<&str>) -> Result<cpal::Device, Box<dyn Error>> {
    match name {
        Some(name) => cpal::Device::get(name),
        None => cpal::Device::default_output(),
    }
}
