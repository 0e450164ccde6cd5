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

/// Largest message a timed event can hold. System exclusive messages are not buffered.
const MAX_EVENT_LEN: usize = 3;

/// A short MIDI message stamped with a sample offset inside a block.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TimedEvent {
    /// The sample offset relative to the start of the block.
    pub offset: usize,
    data: [u8; MAX_EVENT_LEN],
    len: u8,
}

impl TimedEvent {
    /// Creates a timed event. Returns None if the message is empty or too long to buffer.
    pub fn new(bytes: &[u8], offset: usize) -> Option<TimedEvent> {
        if bytes.is_empty() || bytes.len() > MAX_EVENT_LEN {
            return None;
        }
        let mut data = [0u8; MAX_EVENT_LEN];
        data[..bytes.len()].copy_from_slice(bytes);
        Some(TimedEvent {
            offset,
            data,
            len: bytes.len() as u8,
        })
    }

    /// The raw message bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }
}

impl fmt::Debug for TimedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimedEvent")
            .field("offset", &self.offset)
            .field("bytes", &self.bytes())
            .finish()
    }
}

/// MIDI events for one processing block, kept ordered by sample offset. Events with equal
/// offsets stay in the order they were added.
#[derive(Clone, Debug, Default)]
pub struct MidiBuffer {
    events: Vec<TimedEvent>,
}

impl MidiBuffer {
    /// Creates an empty buffer.
    pub fn new() -> MidiBuffer {
        MidiBuffer::default()
    }

    /// Creates an empty buffer that can hold `capacity` events without allocating.
    pub fn with_capacity(capacity: usize) -> MidiBuffer {
        MidiBuffer {
            events: Vec::with_capacity(capacity),
        }
    }

    /// Adds a raw message at the given offset. Returns false if the message can't be buffered.
    pub fn add_event(&mut self, bytes: &[u8], offset: usize) -> bool {
        match TimedEvent::new(bytes, offset) {
            Some(event) => {
                self.push(event);
                true
            }
            None => false,
        }
    }

    /// Adds a timed event.
    pub fn push(&mut self, event: TimedEvent) {
        let index = self.events.partition_point(|e| e.offset <= event.offset);
        self.events.insert(index, event);
    }

    /// Adds a midly live event at the given offset.
    pub fn add_live_event(&mut self, event: midly::live::LiveEvent, offset: usize) -> bool {
        let mut bytes = Vec::with_capacity(MAX_EVENT_LEN);
        if event.write_std(&mut bytes).is_err() {
            return false;
        }
        self.add_event(&bytes, offset)
    }

    /// Removes every event, keeping the allocation.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Number of buffered events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterates over events in offset order.
    pub fn iter(&self) -> impl Iterator<Item = &TimedEvent> {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use midly::{live::LiveEvent, MidiMessage};

    use super::*;

    #[test]
    fn test_events_are_ordered() {
        let mut buffer = MidiBuffer::new();
        assert!(buffer.add_event(&[0x90, 60, 100], 10));
        assert!(buffer.add_event(&[0x80, 60, 0], 2));
        assert!(buffer.add_event(&[0x90, 62, 100], 10));
        assert!(buffer.add_event(&[0xB0, 64, 127], 0));

        let offsets: Vec<usize> = buffer.iter().map(|e| e.offset).collect();
        assert_eq!(vec![0, 2, 10, 10], offsets);

        // Insertion order is kept for equal offsets.
        let notes: Vec<u8> = buffer.iter().skip(2).map(|e| e.bytes()[1]).collect();
        assert_eq!(vec![60, 62], notes);
    }

    #[test]
    fn test_rejects_unbufferable() {
        let mut buffer = MidiBuffer::new();
        assert!(!buffer.add_event(&[], 0));
        assert!(!buffer.add_event(&[0xF0, 1, 2, 3, 0xF7], 0));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_add_live_event() {
        let mut buffer = MidiBuffer::with_capacity(4);
        let event = LiveEvent::Midi {
            channel: 9.into(),
            message: MidiMessage::NoteOn {
                key: 36.into(),
                vel: 90.into(),
            },
        };
        assert!(buffer.add_live_event(event, 5));
        assert_eq!(1, buffer.len());

        let stored = buffer.iter().next().expect("event should be stored");
        assert_eq!(&[0x99, 36, 90], stored.bytes());
        assert_eq!(5, stored.offset);

        buffer.clear();
        assert!(buffer.is_empty());
    }
}
