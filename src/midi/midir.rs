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

use midir::{MidiInput, MidiInputConnection, MidiInputPort};
use midly::live::LiveEvent;
use tracing::{debug, info};

/// A midir input device.
pub struct Device {
    name: String,
    input_port: MidiInputPort,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Input)", self.name)
    }
}

impl Device {
    /// Returns the name of the device.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Connects to the device and calls the handler for every incoming message. Input stops
    /// when the returned connection is dropped.
    pub fn watch_events<F>(&self, mut handler: F) -> Result<MidiInputConnection<()>, Box<dyn Error>>
    where
        F: FnMut(&[u8]) + Send + 'static,
    {
        let input = MidiInput::new("drum-sampler input")?;
        let connection = input.connect(
            &self.input_port,
            "drum-sampler input watcher",
            move |_, raw_event, _| {
                if let Ok(event) = LiveEvent::parse(raw_event) {
                    debug!(event = format!("{:?}", event), "Received MIDI event.");
                }
                handler(raw_event);
            },
            (),
        )?;

        info!(device = self.name, "Watching MIDI events.");
        Ok(connection)
    }
}

/// Lists midir input devices.
pub fn list() -> Result<Vec<Device>, Box<dyn Error>> {
    let input = MidiInput::new("drum-sampler input listing")?;

    let mut devices = Vec::new();
    for port in input.ports() {
        devices.push(Device {
            name: input.port_name(&port)?,
            input_port: port,
        });
    }

    devices.sort_by_key(|device| device.name.clone());
    Ok(devices)
}

/// Gets the midir input device whose name contains the given name.
pub fn get(name: &str) -> Result<Device, Box<dyn Error>> {
    let mut matches = list()?
        .into_iter()
        .filter(|device| device.name.contains(name))
        .collect::<Vec<Device>>();

    if matches.is_empty() {
        return Err(format!("no device found with name {}", name).into());
    }
    if matches.len() > 1 {
        return Err(format!(
            "found too many devices that match ({}), use a less ambiguous device name",
            matches
                .iter()
                .map(|device| device.name.clone())
                .collect::<Vec<String>>()
                .join(", ")
        )
        .into());
    }

    // There's exactly one match at this point.
    Ok(matches.swap_remove(0))
}
