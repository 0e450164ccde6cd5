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

//! The drum sampler processor.
//!
//! [DrumProcessor] is what an audio callback drives: it owns the sampler and renders blocks.
//! [Controls] is its control-thread handle: it owns the sound choice parameter and the
//! sound selector, and can save and restore state. The two only share the sound set
//! handoff and the parameter's atomic value.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::audio::AudioBuffer;
use crate::instrument::{EmbeddedLibrary, Instrument, SampleLibrary, SelectionPolicy};
use crate::midi::MidiBuffer;
use crate::samples::{sound_set_channel, Sampler, SamplerVoice};
use crate::selector::SoundSelector;

pub mod layout;
pub mod parameter;
pub mod render;
pub mod state;

pub use layout::{BusLayout, ChannelSet, LayoutError};
pub use parameter::FloatParameter;
pub use state::{StateError, StateTree};

/// The processor's name.
pub const PROCESSOR_NAME: &str = "Drum Sampler";

/// Id and display name of the sound choice parameter.
pub const SOUND_CHOICE_ID: &str = "Sound Choice";

/// Number of voices when none is configured.
pub const DEFAULT_VOICES: usize = 8;

/// How a processor is put together.
#[derive(Clone)]
pub struct ProcessorSettings {
    /// Number of voices in the sampler.
    pub voices: usize,
    /// How the sound choice value selects an instrument.
    pub policy: SelectionPolicy,
    /// Where instrument samples come from.
    pub library: Arc<dyn SampleLibrary>,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        ProcessorSettings {
            voices: DEFAULT_VOICES,
            policy: SelectionPolicy::default(),
            library: Arc::new(EmbeddedLibrary),
        }
    }
}

impl std::fmt::Debug for ProcessorSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorSettings")
            .field("voices", &self.voices)
            .field("policy", &self.policy)
            .finish()
    }
}

/// The control-thread side of the processor.
pub struct Controls {
    parameter: FloatParameter,
    selector: Mutex<SoundSelector>,
}

impl Controls {
    /// The sound choice parameter.
    pub fn parameter(&self) -> &FloatParameter {
        &self.parameter
    }

    /// The current sound choice value.
    pub fn sound_choice(&self) -> f32 {
        self.parameter.value()
    }

    /// Sets the sound choice. If the stored value changes, the selector loads the new
    /// choice. Returns whether it changed.
    pub fn set_parameter(&self, value: f32) -> bool {
        // Holding the selector lock keeps the parameter and the loaded sound in step.
        let mut selector = self.selector.lock();
        match self.parameter.set_value(value) {
            Some(value) => {
                debug!(value, "Sound choice changed");
                selector.on_selection_changed(value);
                true
            }
            None => false,
        }
    }

    /// Saves the parameter values.
    pub fn state(&self) -> Result<Vec<u8>, StateError> {
        StateTree::new()
            .with_parameter(self.parameter.id(), self.parameter.value())
            .to_bytes()
    }

    /// Restores saved parameter values. States that can't be read, or were written by
    /// something else, are ignored and the current values kept.
    pub fn restore_state(&self, bytes: &[u8]) {
        let state = match StateTree::from_bytes(bytes) {
            Ok(state) => state,
            Err(e) => {
                warn!(err = e.to_string(), "Ignoring saved state");
                return;
            }
        };

        for (id, value) in state.parameters {
            if id == self.parameter.id() {
                self.set_parameter(value);
            } else {
                debug!(id = %id, "Ignoring unknown parameter in saved state");
            }
        }
    }

    /// The instrument the selector last loaded, if any.
    pub fn current_instrument(&self) -> Option<Instrument> {
        self.selector.lock().current()
    }

    /// Frees sounds the audio thread has finished with.
    pub fn collect_garbage(&self) -> usize {
        self.selector.lock().collect_garbage()
    }
}

impl std::fmt::Debug for Controls {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controls")
            .field("parameter", &self.parameter)
            .field("current", &self.current_instrument())
            .finish()
    }
}

/// The audio side of the processor.
pub struct DrumProcessor {
    sampler: Sampler,
    controls: Arc<Controls>,
    layout: BusLayout,
    sample_rate: f64,
    max_block_size: usize,
}

impl DrumProcessor {
    /// Builds the processor and loads the first instrument so it is playable immediately.
    pub fn new(settings: ProcessorSettings) -> DrumProcessor {
        let (publisher, receiver) = sound_set_channel();

        let mut sampler = Sampler::with_updates(receiver);
        for _ in 0..settings.voices {
            sampler.add_voice(SamplerVoice::new());
        }

        let mut selector = SoundSelector::new(settings.library, settings.policy, publisher);
        selector.initialize();
        sampler.sync_sounds();

        info!(
            voices = settings.voices,
            policy = format!("{:?}", settings.policy),
            sounds = format!("{:?}", sampler.sound_names()),
            "Drum processor created"
        );

        DrumProcessor {
            sampler,
            controls: Arc::new(Controls {
                parameter: FloatParameter::new(SOUND_CHOICE_ID, 0.0, 4.0, 0.0),
                selector: Mutex::new(selector),
            }),
            layout: BusLayout::default(),
            sample_rate: 44100.0,
            max_block_size: 0,
        }
    }

    /// The control-thread handle.
    pub fn controls(&self) -> Arc<Controls> {
        self.controls.clone()
    }

    pub fn name(&self) -> &'static str {
        PROCESSOR_NAME
    }

    pub fn accepts_midi(&self) -> bool {
        true
    }

    pub fn produces_midi(&self) -> bool {
        false
    }

    pub fn is_midi_effect(&self) -> bool {
        false
    }

    pub fn tail_length_seconds(&self) -> f64 {
        0.0
    }

    pub fn num_programs(&self) -> usize {
        1
    }

    pub fn current_program(&self) -> usize {
        0
    }

    /// There is only one program, so this does nothing.
    pub fn set_current_program(&mut self, _index: usize) {}

    pub fn program_name(&self, _index: usize) -> &str {
        ""
    }

    pub fn has_editor(&self) -> bool {
        false
    }

    /// Prepares for playback at the given rate. Changing the rate stops any playing voices.
    pub fn prepare_to_play(&mut self, sample_rate: f64, max_block_size: usize) {
        self.sample_rate = sample_rate;
        self.max_block_size = max_block_size;
        self.sampler.set_current_playback_sample_rate(sample_rate);
        info!(sample_rate, max_block_size, "Prepared to play");
    }

    /// Stops every voice once playback has stopped.
    pub fn release_resources(&mut self) {
        self.sampler.all_notes_off(None, false);
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }

    /// Whether the processor can run with the layout.
    pub fn is_bus_layout_supported(&self, layout: &BusLayout) -> bool {
        layout.validate().is_ok()
    }

    /// Switches to the layout if it is supported.
    pub fn set_bus_layout(&mut self, layout: BusLayout) -> Result<(), LayoutError> {
        layout.validate()?;
        self.layout = layout;
        Ok(())
    }

    pub fn bus_layout(&self) -> BusLayout {
        self.layout
    }

    /// Renders one block: the buffer holds the input on its first channels and receives the
    /// output on all of them.
    pub fn process_block(&mut self, buffer: &mut AudioBuffer, midi: &MidiBuffer) {
        render::render_block(
            &mut self.sampler,
            buffer,
            midi,
            self.layout.num_input_channels(),
        );
    }

    /// The sampler, for inspection.
    pub fn sampler(&self) -> &Sampler {
        &self.sampler
    }
}

impl std::fmt::Debug for DrumProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrumProcessor")
            .field("sampler", &self.sampler)
            .field("layout", &self.layout)
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}
