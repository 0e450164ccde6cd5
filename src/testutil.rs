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

use std::borrow::Cow;
use std::io::Cursor;
use std::sync::Arc;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::audio::DecodedAudio;
use crate::instrument::{Instrument, SampleLibrary};
use crate::samples::{NoteRange, SamplerSound};

/// Encodes planar float channels as an in-memory 32-bit float WAV file.
pub fn wav_bytes(channels: &[Vec<f32>], sample_rate: u32) -> Vec<u8> {
    let spec = WavSpec {
        channels: channels.len() as u16,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
        let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
        for frame in 0..frames {
            for channel in channels {
                writer.write_sample(channel[frame]).unwrap();
            }
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Encodes planar 16-bit channels as an in-memory integer WAV file.
pub fn wav_bytes_i16(channels: &[Vec<i16>], sample_rate: u32) -> Vec<u8> {
    let spec = WavSpec {
        channels: channels.len() as u16,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
        let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
        for frame in 0..frames {
            for channel in channels {
                writer.write_sample(channel[frame]).unwrap();
            }
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// A mono sound holding a single value, playable on every note with root note 60.
pub fn constant_sound(
    name: &str,
    value: f32,
    frames: usize,
    sample_rate: u32,
    release_secs: f32,
) -> Arc<SamplerSound> {
    Arc::new(SamplerSound::new(
        name,
        DecodedAudio::new(vec![vec![value; frames]], sample_rate),
        NoteRange::ALL,
        60,
        0.0,
        release_secs,
        1000.0,
    ))
}

pub fn note_on(channel: u8, note: u8, velocity: u8) -> [u8; 3] {
    [0x90 | (channel & 0x0F), note, velocity]
}

pub fn note_off(channel: u8, note: u8) -> [u8; 3] {
    [0x80 | (channel & 0x0F), note, 0]
}

pub fn control_change(channel: u8, controller: u8, value: u8) -> [u8; 3] {
    [0xB0 | (channel & 0x0F), controller, value]
}

pub fn program_change(channel: u8, program: u8) -> [u8; 2] {
    [0xC0 | (channel & 0x0F), program]
}

/// A library with no samples at all.
pub struct EmptyLibrary;

impl SampleLibrary for EmptyLibrary {
    fn sample_data(&self, _instrument: Instrument) -> Option<Cow<'static, [u8]>> {
        None
    }
}

/// A library whose samples aren't WAV files.
pub struct BrokenLibrary;

impl SampleLibrary for BrokenLibrary {
    fn sample_data(&self, _instrument: Instrument) -> Option<Cow<'static, [u8]>> {
        Some(Cow::Borrowed(b"RIFF but not really a wave file"))
    }
}
