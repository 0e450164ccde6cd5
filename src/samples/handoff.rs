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

//! Passing sound sets to the audio thread.
//!
//! The control side publishes immutable sound sets. The audio side picks up the latest one
//! at a block boundary. Anything the audio side lets go of travels back over a second
//! channel so the sample memory is freed on the control side.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use super::sound::SamplerSound;

/// The sounds the engine can currently trigger.
pub type SoundSet = Vec<Arc<SamplerSound>>;

/// Number of unread sound sets that can be queued. Publishing over a full queue replaces
/// the unread set.
const PENDING_CAPACITY: usize = 1;

/// Number of released items the audio side can hand back before it has to drop them itself.
const RETIRED_CAPACITY: usize = 64;

/// Something the audio thread no longer needs.
pub enum Retired {
    /// A sound set that was replaced.
    Set(SoundSet),
    /// A sound held by a voice that finished playing.
    Sound(Arc<SamplerSound>),
}

/// Creates a connected publisher and receiver.
pub fn sound_set_channel() -> (SoundSetPublisher, SoundSetReceiver) {
    let (pending_tx, pending_rx) = crossbeam_channel::bounded(PENDING_CAPACITY);
    let (retired_tx, retired_rx) = crossbeam_channel::bounded(RETIRED_CAPACITY);
    (
        SoundSetPublisher {
            pending_tx,
            pending_rx: pending_rx.clone(),
            retired_rx,
        },
        SoundSetReceiver {
            pending_rx,
            retired_tx,
        },
    )
}

/// The control side of the handoff.
pub struct SoundSetPublisher {
    pending_tx: Sender<SoundSet>,
    /// Used to pull back an unread set when a newer one replaces it.
    pending_rx: Receiver<SoundSet>,
    retired_rx: Receiver<Retired>,
}

impl SoundSetPublisher {
    /// Publishes a sound set. The newest set always wins: a set the audio side hasn't read
    /// yet is discarded.
    pub fn publish(&self, set: SoundSet) {
        let mut set = set;
        loop {
            match self.pending_tx.try_send(set) {
                Ok(()) | Err(TrySendError::Disconnected(_)) => return,
                Err(TrySendError::Full(returned)) => {
                    // Dropped here, on the control side.
                    let _stale = self.pending_rx.try_recv();
                    set = returned;
                }
            }
        }
    }

    /// Drops everything the audio side has handed back. Returns how many items were freed.
    pub fn collect_garbage(&self) -> usize {
        self.retired_rx.try_iter().count()
    }
}

impl std::fmt::Debug for SoundSetPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundSetPublisher")
            .field("pending", &self.pending_tx.len())
            .field("retired", &self.retired_rx.len())
            .finish()
    }
}

/// The audio side of the handoff. Never blocks.
pub struct SoundSetReceiver {
    pending_rx: Receiver<SoundSet>,
    retired_tx: Sender<Retired>,
}

impl SoundSetReceiver {
    /// Takes the newest published set, if any was published since the last call.
    pub fn latest(&self) -> Option<SoundSet> {
        let mut latest = None;
        while let Ok(set) = self.pending_rx.try_recv() {
            if let Some(skipped) = latest.replace(set) {
                self.retire(Retired::Set(skipped));
            }
        }
        latest
    }

    /// Hands an item back to the control side. If the return channel is full the item is
    /// dropped in place.
    pub fn retire(&self, retired: Retired) {
        let _ = self.retired_tx.try_send(retired);
    }
}

impl std::fmt::Debug for SoundSetReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundSetReceiver")
            .field("pending", &self.pending_rx.len())
            .finish()
    }
}
