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

use std::{error::Error, fmt};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info};

use super::AudioBuffer;

/// A cpal output device.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The maximum number of output channels the device supports.
    max_channels: u16,
    /// The host the device belongs to.
    host_id: cpal::HostId,
    /// The underlying cpal device.
    device: cpal::Device,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name,
            self.max_channels,
            self.host_id.name()
        )
    }
}

/// Builds an output stream for sample type T. The renderer fills a planar buffer that is
/// cleared before every callback, which is then converted into the device's interleaved format.
fn build_stream<T, R>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    max_block_size: usize,
    mut render: R,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
    R: FnMut(&mut AudioBuffer) + Send + 'static,
{
    let channels = config.channels as usize;
    // Pre-size the scratch buffer so typical callbacks never allocate.
    let mut scratch = AudioBuffer::new(channels, max_block_size);
    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let frames = data.len() / channels.max(1);
            scratch.set_size(channels, frames);
            scratch.clear();
            render(&mut scratch);
            scratch.write_interleaved(data, channels, |sample| T::from_sample(sample));
        },
        |err| error!(err = err.to_string(), "CPAL output stream error"),
        None,
    )
}

impl Device {
    /// Lists cpal output devices across all available hosts.
    pub fn list() -> Result<Vec<Device>, Box<dyn Error>> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices: Vec<Device> = Vec::new();
        for host_id in cpal::available_hosts() {
            let host_devices = match cpal::host_from_id(host_id)?.devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                let Ok(output_configs) = device.supported_output_configs() else {
                    continue;
                };
                let max_channels = output_configs
                    .map(|output_config| output_config.channels())
                    .max()
                    .unwrap_or(0);

                if max_channels > 0 {
                    devices.push(Device {
                        name: device.name()?,
                        max_channels,
                        host_id,
                        device,
                    });
                }
            }
        }

        devices.sort_by_key(|device| device.name.to_string());
        Ok(devices)
    }

    /// Gets the output device whose name matches the given name.
    pub fn get(name: &str) -> Result<Device, Box<dyn Error>> {
        match Device::list()?
            .into_iter()
            .find(|device| device.name.trim() == name)
        {
            Some(device) => Ok(device),
            None => Err(format!("no device found with name {}", name).into()),
        }
    }

    /// Gets the default output device of the default host.
    pub fn default_output() -> Result<Device, Box<dyn Error>> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or("no default output device available")?;
        let max_channels = device
            .supported_output_configs()?
            .map(|output_config| output_config.channels())
            .max()
            .unwrap_or(0);

        Ok(Device {
            name: device.name()?,
            max_channels,
            host_id: host.id(),
            device,
        })
    }

    /// Returns the device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the maximum number of output channels.
    pub fn max_channels(&self) -> u16 {
        self.max_channels
    }

    /// Starts an output stream on this device. The renderer is called from the audio callback
    /// with a zeroed planar buffer of the stream's channel count. The stream plays until the
    /// returned handle is dropped.
    pub fn start<R>(
        &self,
        channels: u16,
        sample_rate: u32,
        max_block_size: usize,
        render: R,
    ) -> Result<cpal::Stream, Box<dyn Error>>
    where
        R: FnMut(&mut AudioBuffer) + Send + 'static,
    {
        let sample_format = self.device.default_output_config()?.sample_format();
        let config = cpal::StreamConfig {
            channels,
            sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };

        let stream = match sample_format {
            cpal::SampleFormat::F32 => {
                build_stream::<f32, _>(&self.device, &config, max_block_size, render)?
            }
            cpal::SampleFormat::I16 => {
                build_stream::<i16, _>(&self.device, &config, max_block_size, render)?
            }
            cpal::SampleFormat::I32 => {
                build_stream::<i32, _>(&self.device, &config, max_block_size, render)?
            }
            other => {
                return Err(format!("unsupported device sample format {:?}", other).into());
            }
        };
        stream.play()?;

        info!(
            device = self.name,
            channels,
            sample_rate,
            format = format!("{:?}", sample_format),
            "CPAL output stream started"
        );
        Ok(stream)
    }
}
