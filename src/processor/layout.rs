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

use std::fmt;

/// The channel arrangement of one bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelSet {
    /// The bus is switched off.
    Disabled,
    Mono,
    Stereo,
    /// Any other channel count.
    Discrete(u16),
}

impl ChannelSet {
    /// Builds the channel set for a channel count.
    pub fn from_channels(channels: u16) -> ChannelSet {
        match channels {
            0 => ChannelSet::Disabled,
            1 => ChannelSet::Mono,
            2 => ChannelSet::Stereo,
            n => ChannelSet::Discrete(n),
        }
    }

    pub fn num_channels(self) -> usize {
        match self {
            ChannelSet::Disabled => 0,
            ChannelSet::Mono => 1,
            ChannelSet::Stereo => 2,
            ChannelSet::Discrete(n) => n as usize,
        }
    }
}

impl fmt::Display for ChannelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelSet::Disabled => write!(f, "disabled"),
            ChannelSet::Mono => write!(f, "mono"),
            ChannelSet::Stereo => write!(f, "stereo"),
            ChannelSet::Discrete(n) => write!(f, "{} channels", n),
        }
    }
}

/// The main input and output buses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BusLayout {
    pub input: ChannelSet,
    pub output: ChannelSet,
}

impl BusLayout {
    pub fn new(input: ChannelSet, output: ChannelSet) -> BusLayout {
        BusLayout { input, output }
    }

    /// A layout with no input, as used when running as an instrument.
    pub fn instrument(output: ChannelSet) -> BusLayout {
        BusLayout::new(ChannelSet::Disabled, output)
    }

    /// Checks the layout is one the processor can run with: a mono or stereo output and an
    /// input that is either disabled or the same as the output.
    pub fn validate(&self) -> Result<(), LayoutError> {
        if !matches!(self.output, ChannelSet::Mono | ChannelSet::Stereo) {
            return Err(LayoutError::UnsupportedOutput(self.output));
        }
        if self.input != ChannelSet::Disabled && self.input != self.output {
            return Err(LayoutError::InputMismatch {
                input: self.input,
                output: self.output,
            });
        }
        Ok(())
    }

    pub fn num_input_channels(&self) -> usize {
        self.input.num_channels()
    }

    pub fn num_output_channels(&self) -> usize {
        self.output.num_channels()
    }
}

impl Default for BusLayout {
    fn default() -> Self {
        BusLayout::new(ChannelSet::Stereo, ChannelSet::Stereo)
    }
}

/// Error types for bus layouts
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("Unsupported output layout: {0}, only mono and stereo are supported")]
    UnsupportedOutput(ChannelSet),

    #[error("Input layout {input} doesn't match output layout {output}")]
    InputMismatch {
        input: ChannelSet,
        output: ChannelSet,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_layouts() {
        for output in [ChannelSet::Mono, ChannelSet::Stereo] {
            assert!(BusLayout::new(output, output).validate().is_ok());
            assert!(BusLayout::instrument(output).validate().is_ok());
        }
    }

    #[test]
    fn test_unsupported_layouts() {
        assert_eq!(
            Err(LayoutError::UnsupportedOutput(ChannelSet::Discrete(6))),
            BusLayout::new(ChannelSet::Discrete(6), ChannelSet::Discrete(6)).validate()
        );
        assert_eq!(
            Err(LayoutError::UnsupportedOutput(ChannelSet::Disabled)),
            BusLayout::instrument(ChannelSet::Disabled).validate()
        );
        assert_eq!(
            Err(LayoutError::InputMismatch {
                input: ChannelSet::Mono,
                output: ChannelSet::Stereo
            }),
            BusLayout::new(ChannelSet::Mono, ChannelSet::Stereo).validate()
        );
    }

    #[test]
    fn test_channel_counts() {
        assert_eq!(ChannelSet::Stereo, ChannelSet::from_channels(2));
        assert_eq!(ChannelSet::Discrete(8), ChannelSet::from_channels(8));
        let layout = BusLayout::instrument(ChannelSet::Stereo);
        assert_eq!(0, layout.num_input_channels());
        assert_eq!(2, layout.num_output_channels());
    }
}
