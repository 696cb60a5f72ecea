//! Fixed-capacity voice arena with a free list.

use super::voice::{Voice, VoiceState};
use std::cmp::Ordering;

/// How a slot was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// The slot was free.
    Free(usize),
    /// The pool was full and the slot's previous voice was cut off.
    Stolen(usize),
}

impl Claim {
    pub fn index(self) -> usize {
        match self {
            Claim::Free(index) | Claim::Stolen(index) => index,
        }
    }
}

/// Voices are addressed by slot index. Both index lists are allocated at
/// full capacity up front, so claiming and recycling never allocate.
#[derive(Debug, Clone)]
pub struct VoicePool {
    voices: Vec<Voice>,
    free: Vec<usize>,
    active: Vec<usize>,
}

/// Steal order: releasing voices before held ones, then the quietest,
/// then the oldest.
fn steal_order(a: &Voice, b: &Voice) -> Ordering {
    let held = |v: &Voice| v.state() != VoiceState::Releasing;
    held(a)
        .cmp(&held(b))
        .then(a.gain().total_cmp(&b.gain()))
        .then(a.serial().cmp(&b.serial()))
}

impl VoicePool {
    /// Creates a pool of `capacity` idle voices (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            voices: (0..capacity).map(|_| Voice::new()).collect(),
            // Popped from the back, so slot 0 is handed out first.
            free: (0..capacity).rev().collect(),
            active: Vec::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.voices.len()
    }

    /// Slots in use, including voices that went idle during the current
    /// block and have not been recycled yet.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Takes a free slot, or steals one when the pool is full.
    ///
    /// Voices that went idle since the last reclaim (cut by an exclusive
    /// class, for instance) are recycled before anything is stolen.
    pub fn claim(&mut self) -> Claim {
        if self.free.is_empty() {
            self.reclaim();
        }
        if let Some(index) = self.free.pop() {
            self.active.push(index);
            return Claim::Free(index);
        }
        let victim = self
            .active
            .iter()
            .copied()
            .min_by(|&a, &b| steal_order(&self.voices[a], &self.voices[b]))
            .unwrap_or(0);
        self.voices[victim].stop();
        Claim::Stolen(victim)
    }

    pub fn voice(&self, index: usize) -> Option<&Voice> {
        self.voices.get(index)
    }

    pub fn voice_mut(&mut self, index: usize) -> Option<&mut Voice> {
        self.voices.get_mut(index)
    }

    /// Calls `f` on every voice in an occupied slot.
    pub fn for_each_active<F: FnMut(&mut Voice)>(&mut self, mut f: F) {
        for &index in &self.active {
            f(&mut self.voices[index]);
        }
    }

    /// Returns slots whose voices went idle to the free list.
    pub fn reclaim(&mut self) {
        let voices = &self.voices;
        let free = &mut self.free;
        self.active.retain(|&index| {
            if voices[index].is_idle() {
                free.push(index);
                false
            } else {
                true
            }
        });
    }

    /// Silences every voice and frees every slot.
    pub fn stop_all(&mut self) {
        self.for_each_active(Voice::stop);
        self.reclaim();
    }
}
