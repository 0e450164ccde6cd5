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

//! Live playback: cpal output, midir input and sound choices typed on stdin.

use std::error::Error;
use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::Sender;
use midly::live::LiveEvent;
use midly::MidiMessage;
use tracing::{info, span, warn, Level};

use crate::config::HostConfig;
use crate::midi::{MidiBuffer, TimedEvent};
use crate::processor::{BusLayout, ChannelSet, Controls, DrumProcessor};
use crate::{audio, midi};

/// MIDI messages that can wait for the audio thread between two callbacks.
const MIDI_QUEUE_CAPACITY: usize = 256;

/// How often sounds handed back by the audio thread are freed.
const GARBAGE_INTERVAL: Duration = Duration::from_millis(250);

/// Output channels of the live stream.
const OUTPUT_CHANNELS: u16 = 2;

/// What happened to an incoming MIDI message.
#[derive(Debug, PartialEq)]
pub enum Routed {
    /// The message changed the sound choice to the given value.
    SoundChoice(f32),
    /// The message was queued for the audio thread.
    Queued,
    /// The queue was full and the message was dropped.
    Dropped,
    /// The message isn't one the processor handles.
    Ignored,
}

/// Maps a controller value to a sound choice by splitting 0-127 into five equal zones.
pub fn controller_to_sound_choice(value: u8) -> f32 {
    ((value.min(127) as usize * 5) / 128) as f32
}

/// Routes a raw MIDI message. Program changes 0-4 and the sound choice controller set the
/// parameter, everything else the sampler might use is queued for the audio thread.
pub fn route_midi_event(
    raw: &[u8],
    controls: &Controls,
    sound_choice_cc: Option<u8>,
    events: &Sender<TimedEvent>,
) -> Routed {
    let Ok(LiveEvent::Midi { message, .. }) = LiveEvent::parse(raw) else {
        return Routed::Ignored;
    };

    let choice = match message {
        MidiMessage::ProgramChange { program } if u8::from(program) <= 4 => {
            Some(u8::from(program) as f32)
        }
        MidiMessage::Controller { controller, value }
            if Some(u8::from(controller)) == sound_choice_cc =>
        {
            Some(controller_to_sound_choice(u8::from(value)))
        }
        MidiMessage::ProgramChange { .. } => return Routed::Ignored,
        _ => None,
    };
    if let Some(choice) = choice {
        controls.set_parameter(choice);
        return Routed::SoundChoice(choice);
    }

    let Some(event) = TimedEvent::new(raw, 0) else {
        return Routed::Ignored;
    };
    match events.try_send(event) {
        Ok(()) => Routed::Queued,
        Err(_) => Routed::Dropped,
    }
}

/// Runs the live host until stdin is closed or an empty line is entered.
pub fn play(config: &HostConfig) -> Result<(), Box<dyn Error>> {
    let span = span!(Level::INFO, "live playback");
    let _enter = span.enter();

    let sample_rate = config.sample_rate();
    let buffer_size = config.buffer_size();

    let mut processor = DrumProcessor::new(config.processor_settings());
    processor.set_bus_layout(BusLayout::instrument(ChannelSet::Stereo))?;
    processor.prepare_to_play(sample_rate as f64, buffer_size);
    let controls = processor.controls();
    controls.set_parameter(config.sound_choice());

    let (event_tx, event_rx) = crossbeam_channel::bounded::<TimedEvent>(MIDI_QUEUE_CAPACITY);

    let device = audio::get_device(config.audio_device())?;
    let mut midi_buffer = MidiBuffer::with_capacity(MIDI_QUEUE_CAPACITY);
    let _stream = device.start(OUTPUT_CHANNELS, sample_rate, buffer_size, move |buffer| {
        midi_buffer.clear();
        // Live events all land at the start of the block.
        for event in event_rx.try_iter() {
            midi_buffer.push(event);
        }
        processor.process_block(buffer, &midi_buffer);
    })?;

    let _connection = match config.midi_device() {
        Some(name) => {
            let midi_device = midi::get_device(name)?;
            let controls = controls.clone();
            let sound_choice_cc = config.sound_choice_cc();
            Some(midi_device.watch_events(move |raw| {
                match route_midi_event(raw, &controls, sound_choice_cc, &event_tx) {
                    Routed::SoundChoice(choice) => info!(
                        choice,
                        instrument = controls.current_instrument().map(|i| i.name()),
                        "Sound choice changed from MIDI"
                    ),
                    Routed::Dropped => warn!("MIDI queue full, dropping event"),
                    Routed::Queued | Routed::Ignored => {}
                }
            })?)
        }
        None => {
            info!("No MIDI device configured, only stdin selects sounds");
            None
        }
    };

    let running = Arc::new(AtomicBool::new(true));
    let collector = {
        let controls = controls.clone();
        let running = running.clone();
        thread::spawn(move || {
            while running.load(Ordering::Relaxed) {
                controls.collect_garbage();
                thread::sleep(GARBAGE_INTERVAL);
            }
        })
    };

    info!(
        device = device.name(),
        sample_rate, buffer_size, "Playing. Enter a sound choice (0-4), or an empty line to quit."
    );
    for line in io::stdin().lock().lines() {
        let line = line?;
        let input = line.trim();
        if input.is_empty() {
            break;
        }
        match input.parse::<f32>() {
            Ok(choice) => {
                controls.set_parameter(choice);
                info!(
                    choice = controls.sound_choice(),
                    instrument = controls.current_instrument().map(|i| i.name()),
                    "Sound choice changed"
                );
            }
            Err(e) => warn!(input, err = e.to_string(), "Not a sound choice"),
        }
    }

    running.store(false, Ordering::Relaxed);
    if collector.join().is_err() {
        warn!("Garbage collection thread panicked");
    }
    info!("Stopped playing");
    Ok(())
}
