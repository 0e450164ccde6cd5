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

//! MIDI-triggered sample playback.
//!
//! This module provides:
//! - Decoding instruments into immutable, shareable sounds
//! - A polyphonic sampler with voice stealing, sustain and an ADSR envelope
//! - The handoff that moves sound sets to the audio thread

mod engine;
mod envelope;
mod handoff;
mod loader;
mod sound;
mod voice;

pub use engine::Sampler;
pub use envelope::{Adsr, AdsrParameters};
pub use handoff::{sound_set_channel, Retired, SoundSet, SoundSetPublisher, SoundSetReceiver};
pub use loader::{SampleLoader, SoundTemplate};
pub use sound::{NoteRange, SamplerSound};
pub use voice::SamplerVoice;
