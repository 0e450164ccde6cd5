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

use std::path::Path;
use std::sync::Arc;

use config::{Config, File};
use serde::Deserialize;

use super::error::ConfigError;
use crate::instrument::{EmbeddedLibrary, SelectionPolicy};
use crate::processor::{ProcessorSettings, DEFAULT_VOICES};

const DEFAULT_SAMPLE_RATE: u32 = 44100;
const DEFAULT_BUFFER_SIZE: usize = 512;
/// The device name that means "use the host's default output".
const DEFAULT_AUDIO_DEVICE: &str = "default";

/// The configuration for the offline and live hosts. Every field is optional.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct HostConfig {
    /// Output sample rate in Hz (default: 44100).
    sample_rate: Option<u32>,

    /// Frames per processing block (default: 512).
    buffer_size: Option<usize>,

    /// Number of sampler voices (default: 8).
    voices: Option<usize>,

    /// How the sound choice selects an instrument: exact or nearest (default: exact).
    selection: Option<SelectionPolicy>,

    /// The sound choice to start with (default: 0.0).
    sound_choice: Option<f32>,

    /// The audio output device, or "default" for the host default.
    audio_device: Option<String>,

    /// The MIDI input device. Live playback without one only takes choices from stdin.
    midi_device: Option<String>,

    /// A MIDI controller number whose value picks the instrument.
    sound_choice_cc: Option<u8>,
}

impl HostConfig {
    /// Parses a host config from a file. The format follows the file extension.
    pub fn deserialize(path: &Path) -> Result<HostConfig, ConfigError> {
        let config = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<HostConfig>()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that parse but can't be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == Some(0) {
            return Err(ConfigError::Invalid {
                field: "sample_rate",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.buffer_size == Some(0) {
            return Err(ConfigError::Invalid {
                field: "buffer_size",
                reason: "must be greater than zero".to_string(),
            });
        }
        if let Some(cc) = self.sound_choice_cc {
            if cc > 127 {
                return Err(ConfigError::Invalid {
                    field: "sound_choice_cc",
                    reason: format!("{} is not a MIDI controller number", cc),
                });
            }
        }
        Ok(())
    }

    /// Returns the sample rate (default: 44100).
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE)
    }

    /// Returns the block size (default: 512).
    pub fn buffer_size(&self) -> usize {
        self.buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE)
    }

    /// Returns the number of voices (default: 8).
    pub fn voices(&self) -> usize {
        self.voices.unwrap_or(DEFAULT_VOICES)
    }

    /// Returns the selection policy (default: exact).
    pub fn selection(&self) -> SelectionPolicy {
        self.selection.unwrap_or_default()
    }

    /// Returns the initial sound choice (default: 0.0).
    pub fn sound_choice(&self) -> f32 {
        self.sound_choice.unwrap_or(0.0)
    }

    /// Returns the audio device name, or None for the host default.
    pub fn audio_device(&self) -> Option<&str> {
        self.audio_device
            .as_deref()
            .filter(|device| *device != DEFAULT_AUDIO_DEVICE)
    }

    /// Returns the MIDI input device name, if configured.
    pub fn midi_device(&self) -> Option<&str> {
        self.midi_device.as_deref()
    }

    /// Returns the controller mapped to the sound choice, if configured.
    pub fn sound_choice_cc(&self) -> Option<u8> {
        self.sound_choice_cc
    }

    /// Overrides the audio device.
    pub fn set_audio_device(&mut self, device: Option<String>) {
        if device.is_some() {
            self.audio_device = device;
        }
    }

    /// Overrides the MIDI device.
    pub fn set_midi_device(&mut self, device: Option<String>) {
        if device.is_some() {
            self.midi_device = device;
        }
    }

    /// Overrides the initial sound choice.
    pub fn set_sound_choice(&mut self, sound_choice: Option<f32>) {
        if sound_choice.is_some() {
            self.sound_choice = sound_choice;
        }
    }

    /// The processor settings this config describes, using the embedded samples.
    pub fn processor_settings(&self) -> ProcessorSettings {
        ProcessorSettings {
            voices: self.voices(),
            policy: self.selection(),
            library: Arc::new(EmbeddedLibrary),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use config::{Config, File, FileFormat};

    use super::*;

    fn parse(yaml: &str) -> HostConfig {
        Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse("{}");
        assert_eq!(config, HostConfig::default());
        assert_eq!(44100, config.sample_rate());
        assert_eq!(512, config.buffer_size());
        assert_eq!(8, config.voices());
        assert_eq!(SelectionPolicy::Exact, config.selection());
        assert_eq!(0.0, config.sound_choice());
        assert_eq!(None, config.audio_device());
        assert_eq!(None, config.midi_device());
        assert_eq!(None, config.sound_choice_cc());
    }

    #[test]
    fn test_overrides() {
        let config = parse(
            r#"
            sample_rate: 48000
            buffer_size: 128
            voices: 16
            selection: nearest
            sound_choice: 3.0
            audio_device: "UMC404HD"
            midi_device: "Pads"
            sound_choice_cc: 20
        "#,
        );

        assert_eq!(48000, config.sample_rate());
        assert_eq!(128, config.buffer_size());
        assert_eq!(16, config.voices());
        assert_eq!(SelectionPolicy::Nearest, config.selection());
        assert_eq!(3.0, config.sound_choice());
        assert_eq!(Some("UMC404HD"), config.audio_device());
        assert_eq!(Some("Pads"), config.midi_device());
        assert_eq!(Some(20), config.sound_choice_cc());

        let settings = config.processor_settings();
        assert_eq!(16, settings.voices);
        assert_eq!(SelectionPolicy::Nearest, settings.policy);
    }

    #[test]
    fn test_default_audio_device() {
        let config = parse("audio_device: default");
        assert_eq!(None, config.audio_device());
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = parse("midi_device: Pads");
        config.set_midi_device(None);
        assert_eq!(Some("Pads"), config.midi_device());
        config.set_midi_device(Some("Keys".to_string()));
        assert_eq!(Some("Keys"), config.midi_device());
        config.set_sound_choice(Some(2.0));
        assert_eq!(2.0, config.sound_choice());
    }

    #[test]
    fn test_deserialize_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .unwrap();
        writeln!(file, "voices: 4\nselection: exact").unwrap();

        let config = HostConfig::deserialize(file.path()).unwrap();
        assert_eq!(4, config.voices());
    }

    #[test]
    fn test_invalid_values() {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .unwrap();
        writeln!(file, "sample_rate: 0").unwrap();
        assert!(matches!(
            HostConfig::deserialize(file.path()),
            Err(ConfigError::Invalid {
                field: "sample_rate",
                ..
            })
        ));

        assert!(matches!(
            HostConfig::deserialize(Path::new("/nonexistent/config.yaml")),
            Err(ConfigError::Load(_))
        ));
    }
}
