// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The swap pool (spec §3, §4.10): a fixed array of physical frames shared
//! by every user process, selected for eviction by a single rotating FIFO
//! index. Sized the same way `sys/kern`'s PCB/message pools are: a static
//! array indexed by a plain `usize`, no intrusive links needed since a
//! frame belongs to at most one occupant at a time.

use abi::SWAPPOOLSIZE;

/// Identifies the page table entry a swap-pool frame's occupant must be
/// invalidated through on eviction: which process owns it, and its index
/// into that process's private page table.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Owner {
    pub asid: u8,
    pub vpn: u32,
    pub pte_index: usize,
}

/// One physical swap frame's occupancy record.
#[derive(Copy, Clone, Debug, Default)]
pub struct Slot {
    occupant: Option<Owner>,
}

impl Slot {
    pub fn occupant(&self) -> Option<Owner> {
        self.occupant
    }

    pub fn is_free(&self) -> bool {
        self.occupant.is_none()
    }
}

/// The pool of `SWAPPOOLSIZE` physical frames (spec §3: "2 × max user
/// processes"), plus the rotating index used for FIFO victim selection.
pub struct SwapPool {
    slots: [Slot; SWAPPOOLSIZE],
    next_victim: usize,
}

impl SwapPool {
    pub const fn new() -> Self {
        SwapPool { slots: [Slot { occupant: None }; SWAPPOOLSIZE], next_victim: 0 }
    }

    pub fn slot(&self, frame: usize) -> &Slot {
        &self.slots[frame]
    }

    /// Picks a frame for a new occupant: the first free frame if one
    /// exists, otherwise the current FIFO victim, advancing the rotating
    /// index in either case (spec §4.10 "Frame selection: FIFO").
    ///
    /// Returns the chosen frame index and, if it was occupied, the
    /// [`Owner`] that must be evicted first.
    pub fn select_frame(&mut self) -> (usize, Option<Owner>) {
        if let Some(free) = self.slots.iter().position(Slot::is_free) {
            return (free, None);
        }
        let victim = self.next_victim;
        self.next_victim = (self.next_victim + 1) % SWAPPOOLSIZE;
        (victim, self.slots[victim].occupant)
    }

    /// Records `owner` as the new occupant of `frame`, after any previous
    /// occupant has been written back by the caller.
    pub fn install(&mut self, frame: usize, owner: Owner) {
        self.slots[frame].occupant = Some(owner);
    }

    /// Drops `frame`'s occupancy record without writing it back; used only
    /// when a process terminates and its frames are reclaimed without a
    /// flush (no spec-defined behavior requires flushing a dead process's
    /// frames, since nothing will ever read them again).
    pub fn clear(&mut self, frame: usize) {
        self.slots[frame].occupant = None;
    }
}

impl Default for SwapPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner(asid: u8, vpn: u32) -> Owner {
        Owner { asid, vpn, pte_index: vpn as usize }
    }

    #[test]
    fn fills_free_frames_before_evicting() {
        let mut pool = SwapPool::new();
        for i in 0..SWAPPOOLSIZE {
            let (frame, victim) = pool.select_frame();
            assert_eq!(frame, i);
            assert!(victim.is_none());
            pool.install(frame, owner(1, i as u32));
        }
    }

    #[test]
    fn evicts_in_fifo_order_once_full() {
        let mut pool = SwapPool::new();
        for i in 0..SWAPPOOLSIZE {
            let (frame, _) = pool.select_frame();
            pool.install(frame, owner(1, i as u32));
        }
        let (frame, victim) = pool.select_frame();
        assert_eq!(frame, 0);
        assert_eq!(victim, Some(owner(1, 0)));
        pool.install(frame, owner(2, 100));

        let (frame, victim) = pool.select_frame();
        assert_eq!(frame, 1);
        assert_eq!(victim, Some(owner(1, 1)));
        let _ = pool.install(frame, owner(2, 101));
    }
}
