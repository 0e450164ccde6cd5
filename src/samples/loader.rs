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

//! Decoding instrument samples into playable sounds.

use std::sync::Arc;

use tracing::{debug, info};

use super::sound::{NoteRange, SamplerSound};
use crate::audio::{wav, DecodeError};
use crate::instrument::{Instrument, SampleLibrary};

/// How decoded audio is turned into a sound.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SoundTemplate {
    /// The notes that trigger the sound.
    pub notes: NoteRange,
    /// The note that plays the sample at its recorded pitch.
    pub root_note: u8,
    /// Attack time in seconds.
    pub attack_secs: f32,
    /// Release time in seconds.
    pub release_secs: f32,
    /// Longest stretch of the sample that is kept, in seconds.
    pub max_length_secs: f64,
}

/// Loads instruments from a sample library. Every load decodes afresh.
pub struct SampleLoader {
    library: Arc<dyn SampleLibrary>,
    template: SoundTemplate,
}

impl SampleLoader {
    /// Creates a new sample loader.
    pub fn new(library: Arc<dyn SampleLibrary>, template: SoundTemplate) -> Self {
        Self { library, template }
    }

    /// Decodes the instrument's sample and builds a sound named after the instrument.
    pub fn load(&self, instrument: Instrument) -> Result<Arc<SamplerSound>, DecodeError> {
        debug!(instrument = instrument.name(), "Decoding sample");
        let data = self
            .library
            .sample_data(instrument)
            .ok_or_else(|| DecodeError::MissingAsset(instrument.asset_name().to_string()))?;
        let audio = wav::decode(&data)?;

        let channels = audio.channel_count();
        let sample_rate = audio.sample_rate();
        let duration = audio.duration();

        let sound = Arc::new(SamplerSound::new(
            instrument.name(),
            audio,
            self.template.notes,
            self.template.root_note,
            self.template.attack_secs,
            self.template.release_secs,
            self.template.max_length_secs,
        ));

        info!(
            instrument = instrument.name(),
            channels,
            sample_rate,
            duration_ms = duration.as_millis(),
            memory_kb = sound.memory_size() / 1024,
            "Sample loaded"
        );
        Ok(sound)
    }

    pub fn template(&self) -> &SoundTemplate {
        &self.template
    }
}

impl std::fmt::Debug for SampleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleLoader")
            .field("template", &self.template)
            .finish()
    }
}
