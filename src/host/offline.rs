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

//! Rendering to memory and WAV files without an audio device.

use std::error::Error;
use std::path::Path;

use midly::{MetaMessage, Smf, Timing, TrackEventKind};
use tracing::{debug, info};

use crate::audio::AudioBuffer;
use crate::midi::{MidiBuffer, TimedEvent};
use crate::processor::{BusLayout, ChannelSet, Controls, DrumProcessor};

/// Tempo of a MIDI file that never sets one: 120 BPM.
const DEFAULT_TEMPO_MICROS: u32 = 500_000;

/// The note an audition plays.
pub const AUDITION_NOTE: u8 = 60;
/// The velocity an audition plays at.
pub const AUDITION_VELOCITY: u8 = 100;

/// Drives a processor block by block and collects its stereo output.
pub struct OfflineRenderer {
    processor: DrumProcessor,
    sample_rate: u32,
    block_size: usize,
}

impl OfflineRenderer {
    /// Prepares the processor to run as a stereo instrument at the given rate.
    pub fn new(
        mut processor: DrumProcessor,
        sample_rate: u32,
        block_size: usize,
    ) -> Result<OfflineRenderer, Box<dyn Error>> {
        if block_size == 0 {
            return Err("block size must be greater than zero".into());
        }
        processor.set_bus_layout(BusLayout::instrument(ChannelSet::Stereo))?;
        processor.prepare_to_play(sample_rate as f64, block_size);
        Ok(OfflineRenderer {
            processor,
            sample_rate,
            block_size,
        })
    }

    /// The processor's control handle.
    pub fn controls(&self) -> std::sync::Arc<Controls> {
        self.processor.controls()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Renders `length` frames. Each event's offset is its absolute frame; events must be
    /// sorted by offset and those at or past `length` are dropped.
    pub fn render(&mut self, events: &[TimedEvent], length: usize) -> AudioBuffer {
        let mut output = AudioBuffer::new(2, length);
        let mut block = AudioBuffer::new(2, self.block_size);
        let mut midi = MidiBuffer::with_capacity(events.len().min(1024));
        let mut next_event = 0;

        let mut block_start = 0;
        while block_start < length {
            let frames = self.block_size.min(length - block_start);
            let block_end = block_start + frames;

            midi.clear();
            while next_event < events.len() && events[next_event].offset < block_end {
                let mut event = events[next_event];
                if event.offset >= block_start {
                    event.offset -= block_start;
                    midi.push(event);
                }
                next_event += 1;
            }

            block.set_size(2, frames);
            block.clear();
            self.processor.process_block(&mut block, &midi);
            for channel in 0..2 {
                output.channel_mut(channel)[block_start..block_end]
                    .copy_from_slice(block.channel(channel));
            }

            block_start = block_end;
        }

        output
    }

    /// Renders until every voice has finished, or `max_length` frames have been rendered.
    pub fn render_until_silent(&mut self, events: &[TimedEvent], max_length: usize) -> AudioBuffer {
        let last_event = events.last().map(|event| event.offset + 1).unwrap_or(0);
        let mut length = last_event.min(max_length);
        let rendered = self.render(events, length);
        let mut channels: Vec<Vec<f32>> = (0..2)
            .map(|channel| rendered.channel(channel).to_vec())
            .collect();

        while self.processor.sampler().active_voice_count() > 0 && length < max_length {
            let frames = self.block_size.min(max_length - length);
            let block = self.render(&[], frames);
            for (channel, samples) in channels.iter_mut().enumerate() {
                samples.extend_from_slice(block.channel(channel));
            }
            length += frames;
        }

        AudioBuffer::from_channels(channels)
    }
}

/// Renders a single note of the instrument the sound choice selects.
pub fn audition(
    processor: DrumProcessor,
    sound_choice: f32,
    sample_rate: u32,
    block_size: usize,
) -> Result<AudioBuffer, Box<dyn Error>> {
    let mut renderer = OfflineRenderer::new(processor, sample_rate, block_size)?;
    let controls = renderer.controls();
    controls.set_parameter(sound_choice);
    info!(
        sound_choice,
        instrument = controls.current_instrument().map(|instrument| instrument.name()),
        "Auditioning"
    );

    let note_on = [0x90, AUDITION_NOTE, AUDITION_VELOCITY];
    let events = TimedEvent::new(&note_on, 0).into_iter().collect::<Vec<_>>();
    let max_length = sample_rate as usize * crate::selector::MAX_SAMPLE_SECONDS as usize;
    Ok(renderer.render_until_silent(&events, max_length))
}

/// Reads every channel message in a Standard MIDI File and places it at its frame at the
/// given sample rate. Tracks are merged and the file's tempo changes are applied.
pub fn midi_file_events(bytes: &[u8], sample_rate: u32) -> Result<Vec<TimedEvent>, Box<dyn Error>> {
    let smf = Smf::parse(bytes)?;

    // Absolute tick, then the event's order in the file, so ties keep file order.
    let mut ticked = Vec::new();
    let mut track_offset = 0u64;
    for track in smf.tracks.iter() {
        let mut tick = track_offset;
        for event in track.iter() {
            tick += u32::from(event.delta) as u64;
            ticked.push((tick, ticked.len(), event.kind));
        }
        if smf.header.format == midly::Format::Sequential {
            track_offset = tick;
        }
    }
    ticked.sort_by_key(|(tick, order, _)| (*tick, *order));

    let seconds_per_tick = |tempo_micros: u32| -> f64 {
        match smf.header.timing {
            Timing::Metrical(ticks_per_beat) => {
                tempo_micros as f64 / 1_000_000.0 / ticks_per_beat.as_int().max(1) as f64
            }
            Timing::Timecode(fps, subframes) => 1.0 / (fps.as_f32() as f64 * subframes.max(1) as f64),
        }
    };

    let mut events = Vec::new();
    let mut tempo = DEFAULT_TEMPO_MICROS;
    let mut last_tick = 0u64;
    let mut seconds = 0.0f64;
    for (tick, _, kind) in ticked {
        seconds += (tick - last_tick) as f64 * seconds_per_tick(tempo);
        last_tick = tick;

        match kind {
            TrackEventKind::Meta(MetaMessage::Tempo(micros)) => tempo = micros.as_int(),
            TrackEventKind::Midi { .. } => {
                let Some(live) = kind.as_live_event() else {
                    continue;
                };
                let mut bytes = Vec::with_capacity(3);
                live.write_std(&mut bytes)?;
                let frame = (seconds * sample_rate as f64).round() as usize;
                if let Some(event) = TimedEvent::new(&bytes, frame) {
                    events.push(event);
                }
            }
            _ => {}
        }
    }

    debug!(events = events.len(), seconds, "Parsed MIDI file");
    Ok(events)
}

/// Writes a buffer to a 32-bit float WAV file.
pub fn write_wav(path: &Path, buffer: &AudioBuffer, sample_rate: u32) -> Result<(), Box<dyn Error>> {
    let spec = hound::WavSpec {
        channels: buffer.num_channels() as u16,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for frame in 0..buffer.num_samples() {
        for channel in 0..buffer.num_channels() {
            writer.write_sample(buffer.channel(channel)[frame])?;
        }
    }
    writer.finalize()?;

    info!(
        path = ?path,
        frames = buffer.num_samples(),
        channels = buffer.num_channels(),
        sample_rate,
        "Wrote WAV file"
    );
    Ok(())
}
