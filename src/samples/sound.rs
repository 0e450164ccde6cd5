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

use std::fmt;

use super::envelope::AdsrParameters;
use crate::audio::DecodedAudio;

/// A set of MIDI note numbers, one bit per note.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoteRange(u128);

impl NoteRange {
    /// Every MIDI note, 0 through 127.
    pub const ALL: NoteRange = NoteRange(u128::MAX);

    /// No notes.
    pub const NONE: NoteRange = NoteRange(0);

    /// Creates a range covering `low..=high`.
    pub fn span(low: u8, high: u8) -> NoteRange {
        (low.min(127)..=high.min(127)).fold(NoteRange::NONE, |range, note| range.with(note))
    }

    /// Returns this range with the note added.
    pub fn with(self, note: u8) -> NoteRange {
        if note > 127 {
            return self;
        }
        NoteRange(self.0 | (1u128 << note))
    }

    /// Whether the note is in the range.
    pub fn contains(&self, note: u8) -> bool {
        note <= 127 && self.0 & (1u128 << note) != 0
    }
}

/// A playable sound: decoded audio plus the note range, root note and envelope it is played with.
///
/// Sounds are immutable once built and shared between the engine's sound set and any voices
/// still playing them.
pub struct SamplerSound {
    name: String,
    /// At most two channels of audio, each `length` frames long.
    data: Vec<Vec<f32>>,
    source_sample_rate: f64,
    length: usize,
    notes: NoteRange,
    root_note: u8,
    envelope: AdsrParameters,
}

impl SamplerSound {
    /// Creates a sound from decoded audio. Only the first two channels are kept and the audio
    /// is truncated to `max_length_secs`. Audio with a zero sample rate yields an empty sound.
    pub fn new(
        name: &str,
        audio: DecodedAudio,
        notes: NoteRange,
        root_note: u8,
        attack_secs: f32,
        release_secs: f32,
        max_length_secs: f64,
    ) -> SamplerSound {
        let source_sample_rate = audio.sample_rate() as f64;
        let (data, length) = if source_sample_rate > 0.0 && audio.frames() > 0 {
            let max_frames = (max_length_secs.max(0.0) * source_sample_rate) as usize;
            let length = audio.frames().min(max_frames);
            let mut channels = audio.into_channels();
            channels.truncate(2);
            for channel in channels.iter_mut() {
                channel.truncate(length);
            }
            (channels, length)
        } else {
            (Vec::new(), 0)
        };

        SamplerSound {
            name: name.to_string(),
            data,
            source_sample_rate,
            length,
            notes,
            root_note,
            envelope: AdsrParameters {
                attack: attack_secs,
                release: release_secs,
                ..AdsrParameters::default()
            },
        }
    }

    /// The sound's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the note should trigger this sound.
    pub fn applies_to_note(&self, note: u8) -> bool {
        self.notes.contains(note)
    }

    /// Whether a note on the MIDI channel should trigger this sound. Sounds respond on every channel.
    pub fn applies_to_channel(&self, _channel: u8) -> bool {
        true
    }

    /// The note the sample plays back at its original pitch.
    pub fn root_note(&self) -> u8 {
        self.root_note
    }

    pub fn envelope(&self) -> AdsrParameters {
        self.envelope
    }

    pub fn source_sample_rate(&self) -> f64 {
        self.source_sample_rate
    }

    /// Length in frames.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Number of stored channels, 0 to 2.
    pub fn num_channels(&self) -> usize {
        self.data.len()
    }

    /// The samples of a stored channel.
    pub fn channel(&self, channel: usize) -> Option<&[f32]> {
        self.data.get(channel).map(Vec::as_slice)
    }

    /// Returns the memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.iter().map(Vec::len).sum::<usize>() * std::mem::size_of::<f32>()
    }
}

impl fmt::Debug for SamplerSound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SamplerSound")
            .field("name", &self.name)
            .field("channels", &self.data.len())
            .field("length", &self.length)
            .field("source_sample_rate", &self.source_sample_rate)
            .field("root_note", &self.root_note)
            .finish()
    }
}
