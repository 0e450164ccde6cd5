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

//! A single playback voice.
//!
//! A voice plays one sound at a time, resampling it to the note's pitch and shaping it with
//! the sound's envelope.

use std::sync::Arc;

use super::envelope::Adsr;
use super::sound::SamplerSound;
use crate::audio::AudioBuffer;

/// One polyphonic playback slot.
pub struct SamplerVoice {
    /// The sound being played. None when the voice is free.
    sound: Option<Arc<SamplerSound>>,
    /// The note that triggered the voice.
    note: u8,
    /// The MIDI channel (0-15) that triggered the voice.
    channel: u8,
    /// Whether the triggering key is still held.
    key_down: bool,
    /// Whether the channel's sustain pedal was down while the voice was held.
    sustain_pedal_down: bool,
    /// Engine counter value when the note started. Lower is older.
    note_on_counter: u64,
    /// Source frames advanced per output sample.
    pitch_ratio: f64,
    /// Fractional read position into the sound.
    source_position: f64,
    gain: f32,
    envelope: Adsr,
    playback_rate: f64,
}

impl Default for SamplerVoice {
    fn default() -> Self {
        SamplerVoice::new()
    }
}

impl SamplerVoice {
    pub fn new() -> SamplerVoice {
        SamplerVoice {
            sound: None,
            note: 0,
            channel: 0,
            key_down: false,
            sustain_pedal_down: false,
            note_on_counter: 0,
            pitch_ratio: 1.0,
            source_position: 0.0,
            gain: 0.0,
            envelope: Adsr::new(),
            playback_rate: 44100.0,
        }
    }

    /// Sets the output sample rate the voice renders at.
    pub fn set_playback_sample_rate(&mut self, sample_rate: f64) {
        self.playback_rate = sample_rate;
    }

    /// Starts playing a sound. Returns the sound the voice was previously holding, if any,
    /// so the caller decides where it is dropped.
    pub fn start_note(
        &mut self,
        sound: Arc<SamplerSound>,
        note: u8,
        channel: u8,
        velocity: u8,
        note_on_counter: u64,
        sustain_pedal_down: bool,
    ) -> Option<Arc<SamplerSound>> {
        let semitones = note as f64 - sound.root_note() as f64;
        self.pitch_ratio =
            2.0f64.powf(semitones / 12.0) * sound.source_sample_rate() / self.playback_rate;
        self.source_position = 0.0;
        self.gain = velocity.min(127) as f32 / 127.0;

        self.envelope.set_sample_rate(sound.source_sample_rate());
        self.envelope.set_parameters(sound.envelope());
        self.envelope.note_on();

        self.note = note;
        self.channel = channel;
        self.key_down = true;
        self.sustain_pedal_down = sustain_pedal_down;
        self.note_on_counter = note_on_counter;
        self.sound.replace(sound)
    }

    /// Stops the note. With tail-off the envelope moves to its release stage and the voice
    /// keeps sounding, otherwise the voice is freed immediately and its sound returned.
    pub fn stop_note(&mut self, allow_tail_off: bool) -> Option<Arc<SamplerSound>> {
        if allow_tail_off && self.sound.is_some() {
            self.envelope.note_off();
            if self.envelope.is_active() {
                return None;
            }
        }
        self.clear_note()
    }

    fn clear_note(&mut self) -> Option<Arc<SamplerSound>> {
        self.envelope.reset();
        self.key_down = false;
        self.sustain_pedal_down = false;
        self.sound.take()
    }

    /// Whether the voice is playing anything.
    pub fn is_active(&self) -> bool {
        self.sound.is_some()
    }

    /// Whether the voice's envelope is releasing.
    pub fn is_releasing(&self) -> bool {
        self.sound.is_some() && self.envelope.is_releasing()
    }

    /// The note being played, if the voice is active.
    pub fn current_note(&self) -> Option<u8> {
        self.sound.as_ref().map(|_| self.note)
    }

    /// Whether the voice is playing a note from the given channel.
    pub fn is_playing_channel(&self, channel: u8) -> bool {
        self.sound.is_some() && self.channel == channel
    }

    /// Whether the voice is playing the given sound.
    pub fn is_playing_sound(&self, sound: &Arc<SamplerSound>) -> bool {
        self.sound
            .as_ref()
            .map(|playing| Arc::ptr_eq(playing, sound))
            .unwrap_or(false)
    }

    pub fn sound(&self) -> Option<&Arc<SamplerSound>> {
        self.sound.as_ref()
    }

    pub fn is_key_down(&self) -> bool {
        self.key_down
    }

    pub fn set_key_down(&mut self, key_down: bool) {
        self.key_down = key_down;
    }

    pub fn is_sustain_pedal_down(&self) -> bool {
        self.sustain_pedal_down
    }

    pub fn set_sustain_pedal_down(&mut self, down: bool) {
        self.sustain_pedal_down = down;
    }

    pub fn note_on_counter(&self) -> u64 {
        self.note_on_counter
    }

    /// Adds this voice's output to `num_samples` samples of the buffer starting at
    /// `start_sample`. Returns the sound if the voice finished during the block.
    pub fn render_next_block(
        &mut self,
        buffer: &mut AudioBuffer,
        start_sample: usize,
        num_samples: usize,
    ) -> Option<Arc<SamplerSound>> {
        let sound = self.sound.clone()?;
        if buffer.num_channels() == 0 {
            return None;
        }

        let end = (start_sample + num_samples).min(buffer.num_samples());
        let stereo_out = buffer.num_channels() > 1;
        let Some(left_in) = sound.channel(0) else {
            return self.clear_note();
        };
        let right_in = sound.channel(1);
        let length = sound.length() as f64;

        for index in start_sample..end {
            let position = self.source_position as usize;
            let alpha = (self.source_position - position as f64) as f32;
            let inverse_alpha = 1.0 - alpha;

            let interpolate = |data: &[f32]| {
                let current = data.get(position).copied().unwrap_or(0.0);
                let next = data.get(position + 1).copied().unwrap_or(0.0);
                current * inverse_alpha + next * alpha
            };
            let left = interpolate(left_in);
            let right = right_in.map(interpolate).unwrap_or(left);

            let level = self.gain * self.envelope.next_sample();
            let (left, right) = (left * level, right * level);

            if stereo_out {
                buffer.add_sample(0, index, left);
                buffer.add_sample(1, index, right);
            } else {
                buffer.add_sample(0, index, (left + right) * 0.5);
            }

            self.source_position += self.pitch_ratio;
            if self.source_position > length || !self.envelope.is_active() {
                return self.clear_note();
            }
        }

        None
    }
}

impl std::fmt::Debug for SamplerVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamplerVoice")
            .field("sound", &self.sound.as_ref().map(|sound| sound.name()))
            .field("note", &self.current_note())
            .field("channel", &self.channel)
            .field("key_down", &self.key_down)
            .field("releasing", &self.is_releasing())
            .finish()
    }
}
