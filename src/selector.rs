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

//! The sound selector: turns the sound choice parameter into the engine's sound set.
//!
//! Every change clears the sound set and loads at most one instrument into it. The new set
//! is published to the audio thread, which adopts it at the start of its next block.

use std::sync::Arc;

use tracing::{info, warn};

use crate::instrument::{Instrument, SampleLibrary, SelectionPolicy};
use crate::samples::{NoteRange, SampleLoader, SoundSet, SoundSetPublisher, SoundTemplate};

/// The note every instrument plays at its recorded pitch.
pub const ROOT_NOTE: u8 = 60;

/// Attack time of every instrument.
pub const ATTACK_SECONDS: f32 = 0.0;

/// Release time of every instrument.
pub const RELEASE_SECONDS: f32 = 10.0;

/// Samples are cut off after this many seconds.
pub const MAX_SAMPLE_SECONDS: f64 = 10.0;

/// How every instrument is turned into a sound: all 128 notes, root 60, instant attack and a
/// ten second release.
pub const DRUM_TEMPLATE: SoundTemplate = SoundTemplate {
    notes: NoteRange::ALL,
    root_note: ROOT_NOTE,
    attack_secs: ATTACK_SECONDS,
    release_secs: RELEASE_SECONDS,
    max_length_secs: MAX_SAMPLE_SECONDS,
};

/// Loads the selected instrument and publishes it as the engine's only sound.
pub struct SoundSelector {
    loader: SampleLoader,
    policy: SelectionPolicy,
    publisher: SoundSetPublisher,
    current: Option<Instrument>,
}

impl SoundSelector {
    /// Creates a selector. Nothing is loaded until [SoundSelector::initialize] or a change.
    pub fn new(
        library: Arc<dyn SampleLibrary>,
        policy: SelectionPolicy,
        publisher: SoundSetPublisher,
    ) -> SoundSelector {
        SoundSelector {
            loader: SampleLoader::new(library, DRUM_TEMPLATE),
            policy,
            publisher,
            current: None,
        }
    }

    /// Loads the first instrument regardless of the parameter's value.
    pub fn initialize(&mut self) {
        self.load(Instrument::from_index(0));
    }

    /// Clears the sound set and loads the instrument the value selects. Values that select
    /// nothing leave the set empty.
    pub fn on_selection_changed(&mut self, value: f32) {
        let instrument = Instrument::from_selector(value, self.policy);
        if instrument.is_none() {
            info!(value, "Sound choice selects no instrument");
        }
        self.load(instrument);
    }

    fn load(&mut self, instrument: Option<Instrument>) {
        // Free whatever the audio thread has handed back since the last change.
        self.publisher.collect_garbage();

        let mut set = SoundSet::with_capacity(1);
        if let Some(instrument) = instrument {
            match self.loader.load(instrument) {
                Ok(sound) => set.push(sound),
                Err(e) => warn!(
                    instrument = instrument.name(),
                    err = e.to_string(),
                    "Unable to load instrument, no sound loaded"
                ),
            }
        }

        self.current = if set.is_empty() { None } else { instrument };
        self.publisher.publish(set);
        info!(
            instrument = self.current.map(|instrument| instrument.name()),
            "Sound set replaced"
        );
    }

    /// The instrument in the most recently published set, if any.
    pub fn current(&self) -> Option<Instrument> {
        self.current
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// Frees sounds and sets the audio thread has handed back.
    pub fn collect_garbage(&self) -> usize {
        self.publisher.collect_garbage()
    }
}

impl std::fmt::Debug for SoundSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundSelector")
            .field("policy", &self.policy)
            .field("current", &self.current)
            .finish()
    }
}
