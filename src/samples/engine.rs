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

//! The polyphonic sampler: a pool of voices, the current sound set and MIDI dispatch.

use std::mem;
use std::sync::Arc;

use midly::live::LiveEvent;
use midly::MidiMessage;

use super::handoff::{Retired, SoundSet, SoundSetReceiver};
use super::sound::SamplerSound;
use super::voice::SamplerVoice;
use crate::audio::AudioBuffer;
use crate::midi::MidiBuffer;

/// Sustain pedal controller.
const CC_SUSTAIN: u8 = 64;
/// All sound off controller. Stops voices without a release.
const CC_ALL_SOUND_OFF: u8 = 120;
/// All notes off controller. Releases voices.
const CC_ALL_NOTES_OFF: u8 = 123;

/// The default playback rate until the host says otherwise.
const DEFAULT_PLAYBACK_RATE: f64 = 44100.0;

/// Renders sounds through a fixed pool of voices in response to MIDI.
///
/// Nothing here blocks, logs or frees sample memory while rendering: sounds the sampler lets
/// go of are handed back through the [SoundSetReceiver] when one is attached.
pub struct Sampler {
    voices: Vec<SamplerVoice>,
    sounds: SoundSet,
    updates: Option<SoundSetReceiver>,
    playback_rate: f64,
    sustain_pedals: [bool; 16],
    note_counter: u64,
}

impl Default for Sampler {
    fn default() -> Self {
        Sampler::new()
    }
}

impl Sampler {
    /// Creates a sampler with no voices and no sounds.
    pub fn new() -> Sampler {
        Sampler {
            voices: Vec::new(),
            sounds: Vec::new(),
            updates: None,
            playback_rate: DEFAULT_PLAYBACK_RATE,
            sustain_pedals: [false; 16],
            note_counter: 0,
        }
    }

    /// Creates a sampler that takes its sound set from the given receiver.
    pub fn with_updates(updates: SoundSetReceiver) -> Sampler {
        Sampler {
            updates: Some(updates),
            ..Sampler::new()
        }
    }

    /// Adds a voice to the pool.
    pub fn add_voice(&mut self, mut voice: SamplerVoice) {
        voice.set_playback_sample_rate(self.playback_rate);
        self.voices.push(voice);
    }

    pub fn num_voices(&self) -> usize {
        self.voices.len()
    }

    /// Removes every voice, stopping whatever they were playing.
    pub fn clear_voices(&mut self) {
        self.all_notes_off(None, false);
        self.voices.clear();
    }

    /// Adds a sound to the current set.
    pub fn add_sound(&mut self, sound: Arc<SamplerSound>) {
        self.sounds.push(sound);
    }

    /// Removes the sound at the index. Voices already playing it carry on.
    pub fn remove_sound(&mut self, index: usize) -> Option<Arc<SamplerSound>> {
        if index < self.sounds.len() {
            Some(self.sounds.remove(index))
        } else {
            None
        }
    }

    /// Removes every sound. Voices already playing carry on.
    pub fn clear_sounds(&mut self) {
        self.sounds.clear();
    }

    pub fn num_sounds(&self) -> usize {
        self.sounds.len()
    }

    /// The names of the current sounds, in order.
    pub fn sound_names(&self) -> Vec<&str> {
        self.sounds.iter().map(|sound| sound.name()).collect()
    }

    /// The current sounds.
    pub fn sounds(&self) -> &[Arc<SamplerSound>] {
        &self.sounds
    }

    /// Sets the output sample rate. Changing it stops every voice.
    pub fn set_current_playback_sample_rate(&mut self, sample_rate: f64) {
        if self.playback_rate == sample_rate {
            return;
        }
        self.all_notes_off(None, false);
        self.playback_rate = sample_rate;
        for voice in self.voices.iter_mut() {
            voice.set_playback_sample_rate(sample_rate);
        }
    }

    pub fn playback_sample_rate(&self) -> f64 {
        self.playback_rate
    }

    /// Adopts the newest published sound set, if there is one. Returns whether the set changed.
    pub fn sync_sounds(&mut self) -> bool {
        let Some(updates) = self.updates.as_ref() else {
            return false;
        };
        match updates.latest() {
            Some(set) => {
                let replaced = mem::replace(&mut self.sounds, set);
                updates.retire(Retired::Set(replaced));
                true
            }
            None => false,
        }
    }

    /// Number of voices currently playing.
    pub fn active_voice_count(&self) -> usize {
        self.voices.iter().filter(|voice| voice.is_active()).count()
    }

    /// Adds the voices' output to `num_samples` samples of the buffer starting at
    /// `start_sample`, applying MIDI events at their offsets. Events outside the region are
    /// ignored. The current sound set is synced first.
    pub fn render_next_block(
        &mut self,
        buffer: &mut AudioBuffer,
        midi: &MidiBuffer,
        start_sample: usize,
        num_samples: usize,
    ) {
        self.sync_sounds();

        let end = start_sample
            .saturating_add(num_samples)
            .min(buffer.num_samples());
        let mut position = start_sample;
        for event in midi.iter() {
            if event.offset < start_sample || event.offset >= end {
                continue;
            }
            if event.offset > position {
                self.render_voices(buffer, position, event.offset - position);
                position = event.offset;
            }
            self.handle_midi_event(event.bytes());
        }
        if end > position {
            self.render_voices(buffer, position, end - position);
        }
    }

    fn render_voices(&mut self, buffer: &mut AudioBuffer, start_sample: usize, num_samples: usize) {
        for index in 0..self.voices.len() {
            let finished = self.voices[index].render_next_block(buffer, start_sample, num_samples);
            self.release(finished);
        }
    }

    /// Applies a single raw MIDI message.
    pub fn handle_midi_event(&mut self, bytes: &[u8]) {
        let Ok(LiveEvent::Midi { channel, message }) = LiveEvent::parse(bytes) else {
            return;
        };
        let channel = u8::from(channel);

        match message {
            MidiMessage::NoteOn { key, vel } if u8::from(vel) > 0 => {
                self.note_on(channel, u8::from(key), u8::from(vel));
            }
            // Note On with velocity 0 is equivalent to Note Off
            MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                self.note_off(channel, u8::from(key), true);
            }
            MidiMessage::Controller { controller, value } => match u8::from(controller) {
                CC_SUSTAIN => self.handle_sustain_pedal(channel, u8::from(value) >= 64),
                CC_ALL_SOUND_OFF => self.all_notes_off(Some(channel), false),
                CC_ALL_NOTES_OFF => self.all_notes_off(Some(channel), true),
                _ => {}
            },
            _ => {}
        }
    }

    /// Starts the note on every sound that responds to it.
    pub fn note_on(&mut self, channel: u8, note: u8, velocity: u8) {
        for sound_index in 0..self.sounds.len() {
            let sound = self.sounds[sound_index].clone();
            if !sound.applies_to_note(note) || !sound.applies_to_channel(channel) {
                continue;
            }

            // Retriggering a held note releases the earlier voice.
            for index in 0..self.voices.len() {
                let voice = &self.voices[index];
                if voice.current_note() == Some(note)
                    && voice.is_playing_channel(channel)
                    && voice.is_playing_sound(&sound)
                {
                    let stopped = self.voices[index].stop_note(true);
                    self.release(stopped);
                }
            }

            if let Some(index) = self.find_voice(channel, note) {
                self.start_voice(index, sound, channel, note, velocity);
            }
        }
    }

    /// Releases voices playing the note, unless the channel's sustain pedal holds them.
    pub fn note_off(&mut self, channel: u8, note: u8, allow_tail_off: bool) {
        for index in 0..self.voices.len() {
            let voice = &mut self.voices[index];
            let applies = voice
                .sound()
                .map(|sound| sound.applies_to_note(note) && sound.applies_to_channel(channel))
                .unwrap_or(false);
            if voice.current_note() != Some(note) || !voice.is_playing_channel(channel) || !applies
            {
                continue;
            }

            voice.set_key_down(false);
            if !voice.is_sustain_pedal_down() {
                let stopped = voice.stop_note(allow_tail_off);
                self.release(stopped);
            }
        }
    }

    /// Stops every voice on the channel, or on all channels if None. Sustain pedals are reset.
    pub fn all_notes_off(&mut self, channel: Option<u8>, allow_tail_off: bool) {
        for index in 0..self.voices.len() {
            let voice = &mut self.voices[index];
            let matches = channel
                .map(|channel| voice.is_playing_channel(channel))
                .unwrap_or(true);
            if matches {
                let stopped = voice.stop_note(allow_tail_off);
                self.release(stopped);
            }
        }
        self.sustain_pedals = [false; 16];
    }

    /// Presses or lifts the sustain pedal. Lifting it releases notes whose keys are up.
    pub fn handle_sustain_pedal(&mut self, channel: u8, down: bool) {
        let Some(pedal) = self.sustain_pedals.get_mut(channel as usize) else {
            return;
        };
        *pedal = down;

        for index in 0..self.voices.len() {
            let voice = &mut self.voices[index];
            if !voice.is_playing_channel(channel) {
                continue;
            }
            if down {
                if voice.is_key_down() {
                    voice.set_sustain_pedal_down(true);
                }
            } else {
                voice.set_sustain_pedal_down(false);
                if !voice.is_key_down() {
                    let stopped = voice.stop_note(true);
                    self.release(stopped);
                }
            }
        }
    }

    /// Picks a voice for a new note: a free one if possible, otherwise one to steal.
    /// Released voices are stolen before held ones, oldest first.
    fn find_voice(&self, _channel: u8, _note: u8) -> Option<usize> {
        if let Some(index) = self.voices.iter().position(|voice| !voice.is_active()) {
            return Some(index);
        }

        let oldest = |releasing: bool| {
            self.voices
                .iter()
                .enumerate()
                .filter(|(_, voice)| voice.is_releasing() == releasing)
                .min_by_key(|(_, voice)| voice.note_on_counter())
                .map(|(index, _)| index)
        };
        oldest(true).or_else(|| oldest(false))
    }

    fn start_voice(
        &mut self,
        index: usize,
        sound: Arc<SamplerSound>,
        channel: u8,
        note: u8,
        velocity: u8,
    ) {
        let pedal = self
            .sustain_pedals
            .get(channel as usize)
            .copied()
            .unwrap_or(false);
        self.note_counter += 1;

        let voice = &mut self.voices[index];
        let stolen = voice.stop_note(false);
        let previous = voice.start_note(sound, note, channel, velocity, self.note_counter, pedal);
        self.release(stolen);
        self.release(previous);
    }

    /// Hands a sound the sampler no longer holds back to the control side.
    fn release(&self, sound: Option<Arc<SamplerSound>>) {
        if let (Some(sound), Some(updates)) = (sound, self.updates.as_ref()) {
            updates.retire(Retired::Sound(sound));
        }
    }
}

impl std::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler")
            .field("voices", &self.voices.len())
            .field("active_voices", &self.active_voice_count())
            .field("sounds", &self.sound_names())
            .field("playback_rate", &self.playback_rate)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samples::handoff::sound_set_channel;
    use crate::testutil::{constant_sound, control_change, note_off, note_on};

    fn sampler(voices: usize) -> Sampler {
        let mut sampler = Sampler::new();
        sampler.set_current_playback_sample_rate(100.0);
        for _ in 0..voices {
            sampler.add_voice(SamplerVoice::new());
        }
        sampler
    }

    fn render(sampler: &mut Sampler, midi: &MidiBuffer, samples: usize) -> AudioBuffer {
        let mut buffer = AudioBuffer::new(2, samples);
        sampler.render_next_block(&mut buffer, midi, 0, samples);
        buffer
    }

    #[test]
    fn test_sound_management() {
        let mut sampler = sampler(1);
        sampler.add_sound(constant_sound("a", 0.5, 10, 100, 0.1));
        sampler.add_sound(constant_sound("b", 0.5, 10, 100, 0.1));
        assert_eq!(vec!["a", "b"], sampler.sound_names());

        let removed = sampler.remove_sound(0).expect("sound should be removed");
        assert_eq!("a", removed.name());
        assert!(sampler.remove_sound(5).is_none());
        assert_eq!(1, sampler.num_sounds());

        sampler.clear_sounds();
        assert_eq!(0, sampler.num_sounds());
        assert_eq!(1, sampler.num_voices());
    }

    #[test]
    fn test_note_starts_at_event_offset() {
        let mut sampler = sampler(4);
        sampler.add_sound(constant_sound("a", 0.5, 1000, 100, 0.1));

        let mut midi = MidiBuffer::new();
        midi.add_event(&note_on(0, 60, 127), 5);
        let buffer = render(&mut sampler, &midi, 10);

        assert_eq!(&[0.0; 5], &buffer.channel(0)[..5]);
        assert!(buffer.channel(0)[5..].iter().all(|s| (s - 0.5).abs() < 1e-6));
        assert!(buffer.channel(1)[5..].iter().all(|s| (s - 0.5).abs() < 1e-6));
        assert_eq!(1, sampler.active_voice_count());
    }

    #[test]
    fn test_events_outside_region_are_ignored() {
        let mut sampler = sampler(4);
        sampler.add_sound(constant_sound("a", 0.5, 1000, 100, 0.1));

        let mut midi = MidiBuffer::new();
        midi.add_event(&note_on(0, 60, 127), 2);
        midi.add_event(&note_on(0, 61, 127), 12);
        let mut buffer = AudioBuffer::new(2, 16);
        sampler.render_next_block(&mut buffer, &midi, 4, 4);

        assert_eq!(0, sampler.active_voice_count());
        assert!(buffer.channel(0).iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_velocity_zero_releases() {
        let mut sampler = sampler(4);
        sampler.add_sound(constant_sound("a", 0.5, 1000, 100, 0.1));

        let mut midi = MidiBuffer::new();
        midi.add_event(&note_on(0, 60, 127), 0);
        midi.add_event(&note_on(0, 60, 0), 4);
        let buffer = render(&mut sampler, &midi, 64);

        // Still sounding right after the release starts, silent once it has finished.
        assert!(buffer.channel(0)[5] > 0.0);
        assert!(buffer.channel(0)[5] < 0.5);
        assert_eq!(0.0, buffer.channel(0)[40]);
        assert_eq!(0, sampler.active_voice_count());
    }

    #[test]
    fn test_sustain_pedal_defers_release() {
        let mut sampler = sampler(4);
        sampler.add_sound(constant_sound("a", 0.5, 10000, 100, 0.1));

        let mut midi = MidiBuffer::new();
        midi.add_event(&control_change(0, 64, 127), 0);
        midi.add_event(&note_on(0, 60, 127), 0);
        midi.add_event(&note_off(0, 60), 2);
        let buffer = render(&mut sampler, &midi, 64);
        assert_eq!(1, sampler.active_voice_count());
        assert!((buffer.channel(0)[63] - 0.5).abs() < 1e-6);

        // Pedal on another channel does nothing.
        let mut midi = MidiBuffer::new();
        midi.add_event(&control_change(1, 64, 0), 0);
        render(&mut sampler, &midi, 8);
        assert_eq!(1, sampler.active_voice_count());

        let mut midi = MidiBuffer::new();
        midi.add_event(&control_change(0, 64, 0), 0);
        render(&mut sampler, &midi, 64);
        assert_eq!(0, sampler.active_voice_count());
    }

    #[test]
    fn test_pedal_keeps_held_keys() {
        let mut sampler = sampler(4);
        sampler.add_sound(constant_sound("a", 0.5, 10000, 100, 0.1));

        let mut midi = MidiBuffer::new();
        midi.add_event(&note_on(0, 60, 127), 0);
        midi.add_event(&control_change(0, 64, 127), 1);
        midi.add_event(&control_change(0, 64, 0), 2);
        render(&mut sampler, &midi, 64);

        // The key is still down, so lifting the pedal doesn't release it.
        assert_eq!(1, sampler.active_voice_count());
    }

    #[test]
    fn test_voice_stealing() {
        let mut sampler = sampler(2);
        sampler.add_sound(constant_sound("a", 0.5, 10000, 100, 10.0));

        let mut midi = MidiBuffer::new();
        midi.add_event(&note_on(0, 60, 127), 0);
        midi.add_event(&note_on(0, 62, 127), 1);
        midi.add_event(&note_on(0, 64, 127), 2);
        render(&mut sampler, &midi, 8);

        assert_eq!(2, sampler.active_voice_count());
        let mut notes: Vec<u8> = sampler
            .voices
            .iter()
            .filter_map(|voice| voice.current_note())
            .collect();
        notes.sort();
        assert_eq!(vec![62, 64], notes);
    }

    #[test]
    fn test_stealing_prefers_released_voices() {
        let mut sampler = sampler(2);
        sampler.add_sound(constant_sound("a", 0.5, 10000, 100, 10.0));

        let mut midi = MidiBuffer::new();
        midi.add_event(&note_on(0, 60, 127), 0);
        midi.add_event(&note_on(0, 62, 127), 1);
        midi.add_event(&note_off(0, 62), 2);
        midi.add_event(&note_on(0, 64, 127), 3);
        render(&mut sampler, &midi, 8);

        let mut notes: Vec<u8> = sampler
            .voices
            .iter()
            .filter_map(|voice| voice.current_note())
            .collect();
        notes.sort();
        assert_eq!(vec![60, 64], notes);
    }

    #[test]
    fn test_retrigger_releases_previous_voice() {
        let mut sampler = sampler(4);
        sampler.add_sound(constant_sound("a", 0.5, 10000, 100, 10.0));

        let mut midi = MidiBuffer::new();
        midi.add_event(&note_on(0, 60, 127), 0);
        midi.add_event(&note_on(0, 60, 127), 1);
        render(&mut sampler, &midi, 4);

        assert_eq!(2, sampler.active_voice_count());
        assert_eq!(
            1,
            sampler
                .voices
                .iter()
                .filter(|voice| voice.is_releasing())
                .count()
        );
    }

    #[test]
    fn test_all_sound_off_and_all_notes_off() {
        let mut sampler = sampler(4);
        sampler.add_sound(constant_sound("a", 0.5, 10000, 100, 10.0));

        let mut midi = MidiBuffer::new();
        midi.add_event(&note_on(0, 60, 127), 0);
        midi.add_event(&note_on(1, 60, 127), 0);
        render(&mut sampler, &midi, 4);
        assert_eq!(2, sampler.active_voice_count());

        // All notes off on channel 0 releases with a tail.
        let mut midi = MidiBuffer::new();
        midi.add_event(&control_change(0, 123, 0), 0);
        render(&mut sampler, &midi, 4);
        assert_eq!(2, sampler.active_voice_count());
        assert_eq!(
            1,
            sampler
                .voices
                .iter()
                .filter(|voice| voice.is_releasing())
                .count()
        );

        // All sound off on channel 1 stops at once.
        let mut midi = MidiBuffer::new();
        midi.add_event(&control_change(1, 120, 0), 0);
        render(&mut sampler, &midi, 4);
        assert_eq!(1, sampler.active_voice_count());
    }

    #[test]
    fn test_removed_sound_keeps_playing() {
        let mut sampler = sampler(4);
        sampler.add_sound(constant_sound("a", 0.5, 10000, 100, 10.0));

        let mut midi = MidiBuffer::new();
        midi.add_event(&note_on(0, 60, 127), 0);
        render(&mut sampler, &midi, 4);

        sampler.clear_sounds();
        let buffer = render(&mut sampler, &MidiBuffer::new(), 4);
        assert!(buffer.channel(0).iter().all(|s| (s - 0.5).abs() < 1e-6));

        // With no sounds, new notes do nothing.
        let mut midi = MidiBuffer::new();
        midi.add_event(&note_on(0, 62, 127), 0);
        render(&mut sampler, &midi, 4);
        assert_eq!(1, sampler.active_voice_count());
    }

    #[test]
    fn test_sample_rate_change_stops_voices() {
        let mut sampler = sampler(2);
        sampler.add_sound(constant_sound("a", 0.5, 10000, 100, 10.0));
        sampler.note_on(0, 60, 100);
        assert_eq!(1, sampler.active_voice_count());

        sampler.set_current_playback_sample_rate(100.0);
        assert_eq!(1, sampler.active_voice_count());

        sampler.set_current_playback_sample_rate(48000.0);
        assert_eq!(0, sampler.active_voice_count());
        assert_eq!(48000.0, sampler.playback_sample_rate());
    }

    #[test]
    fn test_published_sets_are_adopted_and_returned() {
        let (publisher, receiver) = sound_set_channel();
        let mut sampler = Sampler::with_updates(receiver);
        sampler.set_current_playback_sample_rate(100.0);
        sampler.add_voice(SamplerVoice::new());

        let first = constant_sound("first", 0.5, 8, 100, 0.1);
        publisher.publish(vec![first.clone()]);
        assert_eq!(0, sampler.num_sounds());
        assert!(sampler.sync_sounds());
        assert_eq!(vec!["first"], sampler.sound_names());
        assert!(!sampler.sync_sounds());

        // Play the short sound to completion so the voice hands it back.
        let mut midi = MidiBuffer::new();
        midi.add_event(&note_on(0, 60, 127), 0);
        render(&mut sampler, &midi, 16);
        assert_eq!(0, sampler.active_voice_count());

        // The replaced set comes back when the next one is adopted at the block start.
        publisher.publish(vec![]);
        render(&mut sampler, &MidiBuffer::new(), 4);
        assert_eq!(0, sampler.num_sounds());

        // The empty initial set, the finished voice's sound and the replaced set.
        assert_eq!(3, publisher.collect_garbage());
        assert_eq!(1, Arc::strong_count(&first));
    }
}
