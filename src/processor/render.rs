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

use crate::audio::AudioBuffer;
use crate::midi::MidiBuffer;
use crate::samples::Sampler;

/// Renders one block over the whole buffer.
pub fn render_block(
    sampler: &mut Sampler,
    buffer: &mut AudioBuffer,
    midi: &MidiBuffer,
    num_input_channels: usize,
) {
    let num_samples = buffer.num_samples();
    render_region(sampler, buffer, midi, num_input_channels, 0, num_samples);
}

/// Renders `num_samples` samples starting at `start_sample`. Output channels past the input
/// channels hold no input, so that region of them is zeroed before the sampler adds its
/// voices.
pub fn render_region(
    sampler: &mut Sampler,
    buffer: &mut AudioBuffer,
    midi: &MidiBuffer,
    num_input_channels: usize,
    start_sample: usize,
    num_samples: usize,
) {
    for channel in num_input_channels..buffer.num_channels() {
        buffer.clear_region(channel, start_sample, num_samples);
    }

    sampler.render_next_block(buffer, midi, start_sample, num_samples);
}
