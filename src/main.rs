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

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{crate_version, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use drum_sampler::audio::{wav, DecodeError};
use drum_sampler::config::HostConfig;
use drum_sampler::host::{self, OfflineRenderer};
use drum_sampler::instrument::{EmbeddedLibrary, Instrument, SampleLibrary};
use drum_sampler::processor::DrumProcessor;
use drum_sampler::selector::MAX_SAMPLE_SECONDS;
use drum_sampler::{audio, midi};

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A MIDI-triggered drum sample player."
)]
struct Cli {
    /// The path to a host config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the instruments and the sound choice that selects each one.
    Instruments {},
    /// Renders one hit of the instrument a sound choice selects to a WAV file.
    Audition {
        /// The sound choice, 0 to 4.
        sound_choice: f32,
        /// The WAV file to write.
        output: PathBuf,
    },
    /// Renders a Standard MIDI File through the sampler to a WAV file.
    Render {
        /// The MIDI file to render.
        midi_file: PathBuf,
        /// The WAV file to write.
        output: PathBuf,
        /// The sound choice to render with.
        #[arg(short, long)]
        sound_choice: Option<f32>,
        /// The longest time in seconds to keep rendering after the last event.
        #[arg(short, long, default_value_t = MAX_SAMPLE_SECONDS)]
        tail: f64,
    },
    /// Lists the available audio output devices.
    Devices {},
    /// Lists the available MIDI input devices.
    MidiDevices {},
    /// Plays live, triggered from a MIDI device.
    Play {
        /// The audio output device to play through.
        #[arg(short, long)]
        audio_device: Option<String>,
        /// The MIDI input device to listen to.
        #[arg(short, long)]
        midi_device: Option<String>,
        /// The sound choice to start with.
        #[arg(short, long)]
        sound_choice: Option<f32>,
    },
}

fn load_config(path: Option<&Path>) -> Result<HostConfig, Box<dyn Error>> {
    match path {
        Some(path) => Ok(HostConfig::deserialize(path)?),
        None => Ok(HostConfig::default()),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Instruments {} => {
            let library = EmbeddedLibrary;
            println!("Instruments:");
            for instrument in Instrument::ALL {
                let decoded = library
                    .sample_data(instrument)
                    .ok_or_else(|| DecodeError::MissingAsset(instrument.asset_name().into()))
                    .and_then(|bytes| wav::decode(&bytes));
                match decoded {
                    Ok(audio) => println!(
                        "- {}: {} (channels: {}, sample rate: {}, length: {:.3}s)",
                        instrument.index(),
                        instrument,
                        audio.channel_count(),
                        audio.sample_rate(),
                        audio.duration().as_secs_f64()
                    ),
                    Err(e) => println!("- {}: {} (unreadable: {})", instrument.index(), instrument, e),
                }
            }
        }
        Commands::Audition {
            sound_choice,
            output,
        } => {
            let processor = DrumProcessor::new(config.processor_settings());
            let buffer = host::audition(
                processor,
                sound_choice,
                config.sample_rate(),
                config.buffer_size(),
            )?;
            host::write_wav(&output, &buffer, config.sample_rate())?;
            info!(
                path = output.display().to_string(),
                frames = buffer.num_samples(),
                "Wrote audition"
            );
        }
        Commands::Render {
            midi_file,
            output,
            sound_choice,
            tail,
        } => {
            config.set_sound_choice(sound_choice);
            let sample_rate = config.sample_rate();
            let events = host::midi_file_events(&fs::read(&midi_file)?, sample_rate)?;

            let mut renderer = OfflineRenderer::new(
                DrumProcessor::new(config.processor_settings()),
                sample_rate,
                config.buffer_size(),
            )?;
            renderer.controls().set_parameter(config.sound_choice());

            let last_event = events.last().map(|event| event.offset + 1).unwrap_or(0);
            let max_length = last_event + (tail.max(0.0) * sample_rate as f64) as usize;
            let buffer = renderer.render_until_silent(&events, max_length);
            host::write_wav(&output, &buffer, sample_rate)?;
            info!(
                path = output.display().to_string(),
                events = events.len(),
                frames = buffer.num_samples(),
                "Wrote render"
            );
        }
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::MidiDevices {} => {
            let devices = midi::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Play {
            audio_device,
            midi_device,
            sound_choice,
        } => {
            config.set_audio_device(audio_device);
            config.set_midi_device(midi_device);
            config.set_sound_choice(sound_choice);
            host::play(&config)?;
        }
    }

    Ok(())
}
