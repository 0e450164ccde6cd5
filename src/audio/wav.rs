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
use std::io::Cursor;
use std::time::Duration;

use hound::WavReader;

use super::error::DecodeError;

/// Fully decoded PCM audio in planar format, scaled to [-1.0, 1.0].
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedAudio {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl DecodedAudio {
    /// Creates decoded audio from planar channel data. Channels are truncated to the
    /// shortest one so every channel has the same frame count.
    pub fn new(mut channels: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
        for channel in channels.iter_mut() {
            channel.truncate(frames);
        }
        Self {
            channels,
            sample_rate,
        }
    }

    /// Returns the number of channels.
    pub fn channel_count(&self) -> u16 {
        self.channels.len() as u16
    }

    /// Returns the number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    /// Returns the sample rate the audio was recorded at.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns the duration of the audio.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Truncates every channel to at most `frames` frames.
    pub fn truncate(&mut self, frames: usize) {
        for channel in self.channels.iter_mut() {
            channel.truncate(frames);
        }
    }

    /// Consumes the audio, returning the planar channel data.
    pub fn into_channels(self) -> Vec<Vec<f32>> {
        self.channels
    }
}

/// Decodes an in-memory WAV file into planar f32 samples.
pub fn decode(bytes: &[u8]) -> Result<DecodedAudio, DecodeError> {
    let mut reader = WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(DecodeError::NoChannels);
    }

    let channel_count = spec.channels as usize;
    let frames = reader.duration() as usize;
    let mut channels = vec![Vec::with_capacity(frames); channel_count];

    // Read samples in the correct format based on the WAV file's actual format
    match spec.sample_format {
        hound::SampleFormat::Float => {
            for (i, sample) in reader.samples::<f32>().enumerate() {
                channels[i % channel_count].push(sample?);
            }
        }
        hound::SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(DecodeError::UnsupportedBitDepth(spec.bits_per_sample));
            }
            // Use i64 to avoid overflow for 32-bit samples
            let scale_factor = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
            for (i, sample) in reader.samples::<i32>().enumerate() {
                channels[i % channel_count].push(sample? as f32 * scale_factor);
            }
        }
    }

    Ok(DecodedAudio::new(channels, spec.sample_rate))
}
