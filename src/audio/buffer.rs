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

/// A block of audio in planar format: one Vec per channel, all channels the same length.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
    num_samples: usize,
}

impl AudioBuffer {
    /// Creates a zeroed buffer.
    pub fn new(num_channels: usize, num_samples: usize) -> Self {
        Self {
            channels: vec![vec![0.0; num_samples]; num_channels],
            num_samples,
        }
    }

    /// Creates a buffer from planar channel data. Channels longer than the shortest
    /// channel are truncated.
    pub fn from_channels(mut channels: Vec<Vec<f32>>) -> Self {
        let num_samples = channels.iter().map(Vec::len).min().unwrap_or(0);
        for channel in channels.iter_mut() {
            channel.truncate(num_samples);
        }
        Self {
            channels,
            num_samples,
        }
    }

    /// Gets the number of channels.
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Gets the number of samples per channel.
    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// Resizes the buffer. Existing content within the new bounds is kept, anything new is
    /// zeroed. Shrinking never releases capacity, so a buffer sized once up front can be
    /// resized on the audio thread without allocating.
    pub fn set_size(&mut self, num_channels: usize, num_samples: usize) {
        self.channels.resize_with(num_channels, Vec::new);
        for channel in self.channels.iter_mut() {
            channel.resize(num_samples, 0.0);
        }
        self.num_samples = num_samples;
    }

    /// Gets the samples for a channel.
    pub fn channel(&self, channel: usize) -> &[f32] {
        &self.channels[channel]
    }

    /// Gets the samples for a channel mutably.
    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        &mut self.channels[channel]
    }

    /// Zeroes every channel.
    pub fn clear(&mut self) {
        for channel in self.channels.iter_mut() {
            channel.fill(0.0);
        }
    }

    /// Zeroes `len` samples of a channel starting at `start`. Out of range regions are clipped.
    pub fn clear_region(&mut self, channel: usize, start: usize, len: usize) {
        let Some(samples) = self.channels.get_mut(channel) else {
            return;
        };
        let start = start.min(samples.len());
        let end = start.saturating_add(len).min(samples.len());
        samples[start..end].fill(0.0);
    }

    /// Adds a value to a single sample.
    #[inline]
    pub fn add_sample(&mut self, channel: usize, index: usize, value: f32) {
        self.channels[channel][index] += value;
    }

    /// Writes the buffer into an interleaved output with `output_channels` channels. Output
    /// channels the buffer doesn't have are zeroed. Returns the number of frames written.
    pub fn write_interleaved<T, F>(&self, output: &mut [T], output_channels: usize, convert: F) -> usize
    where
        F: Fn(f32) -> T,
    {
        if output_channels == 0 {
            return 0;
        }
        let frames = (output.len() / output_channels).min(self.num_samples);
        for (frame, out) in output
            .chunks_exact_mut(output_channels)
            .take(frames)
            .enumerate()
        {
            for (channel, sample) in out.iter_mut().enumerate() {
                let value = self
                    .channels
                    .get(channel)
                    .map(|samples| samples[frame])
                    .unwrap_or(0.0);
                *sample = convert(value);
            }
        }
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_region_clips() {
        let mut buffer = AudioBuffer::from_channels(vec![vec![1.0; 4], vec![1.0; 4]]);

        buffer.clear_region(1, 2, 10);
        assert_eq!(buffer.channel(0), &[1.0, 1.0, 1.0, 1.0]);
        assert_eq!(buffer.channel(1), &[1.0, 1.0, 0.0, 0.0]);

        // Missing channels are ignored.
        buffer.clear_region(5, 0, 4);
        assert_eq!(buffer.num_channels(), 2);
    }

    #[test]
    fn test_set_size_keeps_content() {
        let mut buffer = AudioBuffer::from_channels(vec![vec![0.5, 0.25, 0.125]]);
        buffer.set_size(2, 2);
        assert_eq!(buffer.num_samples(), 2);
        assert_eq!(buffer.channel(0), &[0.5, 0.25]);
        assert_eq!(buffer.channel(1), &[0.0, 0.0]);

        buffer.set_size(2, 4);
        assert_eq!(buffer.channel(0), &[0.5, 0.25, 0.0, 0.0]);
    }

    #[test]
    fn test_from_channels_truncates_to_shortest() {
        let buffer = AudioBuffer::from_channels(vec![vec![1.0; 5], vec![2.0; 3]]);
        assert_eq!(buffer.num_samples(), 3);
        assert_eq!(buffer.channel(0).len(), 3);
    }

    #[test]
    fn test_write_interleaved() {
        let buffer = AudioBuffer::from_channels(vec![vec![0.1, 0.2], vec![0.3, 0.4]]);

        // More output channels than the buffer has: extras are zero.
        let mut output = vec![9.0f32; 6];
        let frames = buffer.write_interleaved(&mut output, 3, |s| s);
        assert_eq!(frames, 2);
        assert_eq!(output, vec![0.1, 0.3, 0.0, 0.2, 0.4, 0.0]);

        // Integer conversion.
        let mut output = vec![0i16; 4];
        buffer.write_interleaved(&mut output, 2, |s| (s * 10.0) as i16);
        assert_eq!(output, vec![1, 3, 2, 4]);
    }
}
