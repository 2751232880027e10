// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Process control block allocator (spec §3, §4.1).
//!
//! The reference kernel keeps PCBs in a static array and threads an
//! intrusive `list_head` through each one so a PCB can be a member of the
//! free list, the ready queue, a blocked list, or the pseudoclock list,
//! while *also* independently belonging to its parent's child list. Per the
//! design notes, this crate keeps the static array but replaces the raw
//! links with two independent [`Links`](crate::list::Links) pairs per PCB:
//! `queue_links` for the mutually-exclusive free/ready/blocked/pseudoclock
//! membership (addressed through [`Pid`]), and `sibling_links` for the
//! parent/child tree (addressed through the distinct [`SiblingPid`]
//! newtype, so the two axes never alias the same `Linked` impl).
//!
//! Addressing is by raw slot index, not by a generation-checked handle: per
//! spec §8's boundary behavior, a `SEND` to a reused slot must reach
//! whichever process now occupies it. A separate, monotonically increasing
//! `pid` field is what `GETPROCESSID` returns; it is never used to address
//! a PCB.

use abi::{SavedState, SupportDescriptor, MAXPROC};

use crate::list::{Linked, Links, List};
use crate::msg::MsgHandle;

/// Address of a PCB: its raw slot index in the static pool. Reused freely
/// across the PCB's lifetime, matching the reference kernel's pointer
/// semantics.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Pid(pub u16);

impl Pid {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

pub fn pid_index(p: Pid) -> usize {
    p.index()
}

/// The same slot index as [`Pid`], but typed distinctly so the sibling/child
/// list axis gets its own `Linked` implementation instead of aliasing the
/// free/ready/blocked queue axis.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SiblingPid(pub u16);

impl From<Pid> for SiblingPid {
    fn from(p: Pid) -> Self {
        SiblingPid(p.0)
    }
}

impl From<SiblingPid> for Pid {
    fn from(p: SiblingPid) -> Self {
        Pid(p.0)
    }
}

fn sibling_index(p: SiblingPid) -> usize {
    p.0 as usize
}

/// A receive/send filter: either a specific sender/destination or "any."
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Filter {
    Any,
    Specific(Pid),
}

impl Filter {
    pub fn matches(self, sender: Pid) -> bool {
        match self {
            Filter::Any => true,
            Filter::Specific(p) => p == sender,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Pcb {
    pub(crate) queue_links: Links<Pid>,
    pub(crate) sibling_links: Links<SiblingPid>,

    pub allocated: bool,
    pub pid: u32,
    pub state: SavedState,
    pub p_time: u64,

    pub parent: Option<Pid>,
    pub children: List<SiblingPid>,
    pub inbox: List<MsgHandle>,

    pub support: Option<SupportDescriptor>,

    /// Set while blocked in `RECEIVE`; the filter the blocked process is
    /// waiting to satisfy.
    pub recv_filter: Option<Filter>,
}

impl Default for Pcb {
    fn default() -> Self {
        Pcb {
            queue_links: Links::default(),
            sibling_links: Links::default(),
            allocated: false,
            pid: 0,
            state: SavedState::default(),
            p_time: 0,
            parent: None,
            children: List::new(),
            inbox: List::new(),
            support: None,
            recv_filter: None,
        }
    }
}

impl Linked<Pid> for Pcb {
    fn links(&self) -> &Links<Pid> {
        &self.queue_links
    }
    fn links_mut(&mut self) -> &mut Links<Pid> {
        &mut self.queue_links
    }
}

impl Linked<SiblingPid> for Pcb {
    fn links(&self) -> &Links<SiblingPid> {
        &self.sibling_links
    }
    fn links_mut(&mut self) -> &mut Links<SiblingPid> {
        &mut self.sibling_links
    }
}

impl Pcb {
    fn reset(&mut self, pid: u32) {
        *self = Pcb {
            allocated: true,
            pid,
            ..Pcb::default()
        };
    }
}

/// The static PCB pool: `MAXPROC` slots, a free list threading exactly the
/// unallocated ones, and a monotonic pid counter (spec §3's `next_pid`).
pub struct PcbPool {
    pub slots: [Pcb; MAXPROC],
    pub free: List<Pid>,
    next_pid: u32,
}

impl PcbPool {
    pub fn new() -> Self {
        let mut pool = PcbPool {
            slots: core::array::from_fn(|_| Pcb::default()),
            free: List::new(),
            next_pid: 1,
        };
        for i in (0..MAXPROC).rev() {
            pool.free.insert_head(&mut pool.slots, Pid(i as u16), pid_index);
        }
        pool
    }

    pub fn is_free(&self, p: Pid) -> bool {
        !self.slots[p.index()].allocated
    }

    pub fn process_count(&self) -> usize {
        MAXPROC - self.free.len()
    }

    /// `alloc_pcb`: returns a zeroed PCB from the free pool, or `None` if
    /// exhausted (spec §4.1).
    pub fn alloc(&mut self) -> Option<Pid> {
        let handle = self.free.remove_head(&mut self.slots, pid_index)?;
        let pid = self.next_pid;
        self.next_pid = self.next_pid.wrapping_add(1);
        self.slots[handle.index()].reset(pid);
        Some(handle)
    }

    /// `free_pcb`: appends `p` to the free pool. Caller must ensure `p` is
    /// not currently a member of any other list (spec §4.1).
    pub fn free(&mut self, p: Pid) {
        self.slots[p.index()] = Pcb::default();
        self.free.insert_tail(&mut self.slots, p, pid_index);
    }

    pub fn get(&self, p: Pid) -> &Pcb {
        &self.slots[p.index()]
    }

    pub fn get_mut(&mut self, p: Pid) -> &mut Pcb {
        &mut self.slots[p.index()]
    }

    /// `insert_child`: appends `child` to `parent`'s child list and sets
    /// `child.parent`.
    pub fn insert_child(&mut self, parent: Pid, child: Pid) {
        self.slots[child.index()].parent = Some(parent);
        let mut children = core::mem::take(&mut self.slots[parent.index()].children);
        children.insert_tail(&mut self.slots, child.into(), sibling_index);
        self.slots[parent.index()].children = children;
    }

    /// `remove_first_child`: detaches and returns `parent`'s first child,
    /// if any.
    pub fn remove_first_child(&mut self, parent: Pid) -> Option<Pid> {
        let mut children = core::mem::take(&mut self.slots[parent.index()].children);
        let child = children.remove_head(&mut self.slots, sibling_index);
        self.slots[parent.index()].children = children;
        if let Some(c) = child {
            self.slots[Pid::from(c).index()].parent = None;
        }
        child.map(Pid::from)
    }

    /// `detach_from_parent`: removes `p` from its parent's child list, if
    /// it has a parent.
    pub fn detach_from_parent(&mut self, p: Pid) {
        if let Some(parent) = self.slots[p.index()].parent.take() {
            let mut children = core::mem::take(&mut self.slots[parent.index()].children);
            children.remove(&mut self.slots, p.into(), sibling_index);
            self.slots[parent.index()].children = children;
        }
    }

    pub fn children_of(&self, parent: Pid) -> impl Iterator<Item = Pid> + '_ {
        self.slots[parent.index()]
            .children
            .iter(&self.slots, sibling_index)
            .map(Pid::from)
    }
}

impl Default for PcbPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_then_free_restores_pool() {
        let mut pool = PcbPool::new();
        let before = pool.free.len();
        let p = pool.alloc().unwrap();
        assert_eq!(pool.free.len(), before - 1);
        pool.free(p);
        assert_eq!(pool.free.len(), before);
    }

    #[test]
    fn exhaustion_returns_none() {
        let mut pool = PcbPool::new();
        let mut allocated = vec![];
        for _ in 0..MAXPROC {
            allocated.push(pool.alloc().unwrap());
        }
        assert!(pool.alloc().is_none());
    }

    #[test]
    fn pid_counter_is_monotonic_across_reuse() {
        let mut pool = PcbPool::new();
        let a = pool.alloc().unwrap();
        let pid_a = pool.get(a).pid;
        pool.free(a);
        let b = pool.alloc().unwrap();
        let pid_b = pool.get(b).pid;
        assert_ne!(pid_a, pid_b);
    }

    #[test]
    fn child_tree_roundtrip() {
        let mut pool = PcbPool::new();
        let parent = pool.alloc().unwrap();
        let c1 = pool.alloc().unwrap();
        let c2 = pool.alloc().unwrap();
        pool.insert_child(parent, c1);
        pool.insert_child(parent, c2);
        let kids: Vec<Pid> = pool.children_of(parent).collect();
        assert_eq!(kids, vec![c1, c2]);
        assert_eq!(pool.get(c1).parent, Some(parent));

        let first = pool.remove_first_child(parent).unwrap();
        assert_eq!(first, c1);
        assert_eq!(pool.get(c1).parent, None);
        let kids: Vec<Pid> = pool.children_of(parent).collect();
        assert_eq!(kids, vec![c2]);
    }
}
