// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Message record allocator and inbox operations (spec §3, §4.1).

use abi::MAXMESSAGES;

use crate::list::{Linked, Links, List};
use crate::pcb::{Filter, Pid};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MsgHandle(pub u16);

impl MsgHandle {
    fn index(self) -> usize {
        self.0 as usize
    }
}

pub fn msg_index(h: MsgHandle) -> usize {
    h.index()
}

#[derive(Clone, Debug)]
pub struct Message {
    links: Links<MsgHandle>,
    pub allocated: bool,
    pub sender: Pid,
    pub payload: i32,
}

impl Default for Message {
    fn default() -> Self {
        Message {
            links: Links::default(),
            allocated: false,
            sender: Pid(0),
            payload: 0,
        }
    }
}

impl Linked<MsgHandle> for Message {
    fn links(&self) -> &Links<MsgHandle> {
        &self.links
    }
    fn links_mut(&mut self) -> &mut Links<MsgHandle> {
        &mut self.links
    }
}

pub struct MsgPool {
    slots: [Message; MAXMESSAGES],
    free: List<MsgHandle>,
}

impl MsgPool {
    pub fn new() -> Self {
        let mut pool = MsgPool {
            slots: core::array::from_fn(|_| Message::default()),
            free: List::new(),
        };
        for i in (0..MAXMESSAGES).rev() {
            pool.free
                .insert_head(&mut pool.slots, MsgHandle(i as u16), msg_index);
        }
        pool
    }

    /// `alloc_msg`: returns a record from the free pool, or `None` if
    /// exhausted.
    pub fn alloc(&mut self, sender: Pid, payload: i32) -> Option<MsgHandle> {
        let h = self.free.remove_head(&mut self.slots, msg_index)?;
        self.slots[h.index()] = Message {
            links: Links::default(),
            allocated: true,
            sender,
            payload,
        };
        Some(h)
    }

    /// `free_msg`: returns a record to the free pool.
    pub fn free(&mut self, h: MsgHandle) {
        self.slots[h.index()] = Message::default();
        self.free.insert_tail(&mut self.slots, h, msg_index);
    }

    pub fn get(&self, h: MsgHandle) -> &Message {
        &self.slots[h.index()]
    }

    /// `insert_message`: appends `h` to `inbox`'s tail.
    pub fn insert_message(&mut self, inbox: &mut List<MsgHandle>, h: MsgHandle) {
        inbox.insert_tail(&mut self.slots, h, msg_index);
    }

    /// `push_message`: prepends `h` to `inbox`'s head.
    pub fn push_message(&mut self, inbox: &mut List<MsgHandle>, h: MsgHandle) {
        inbox.insert_head(&mut self.slots, h, msg_index);
    }

    /// Removes and returns the head of `inbox` regardless of sender, used
    /// by `TERMPROCESS` (spec §4.7) to drain and free every message still
    /// queued for a victim PCB.
    pub fn pop_any(&mut self, inbox: &mut List<MsgHandle>) -> Option<MsgHandle> {
        inbox.remove_head(&mut self.slots, msg_index)
    }

    /// `pop_message`: scans `inbox` in FIFO order for the first message
    /// matching `filter`, removes it, and returns its handle. Per the open
    /// question recorded in DESIGN.md, a message whose sender has since
    /// been freed is still eligible for `ANY` and is still returned — the
    /// pool does not retroactively invalidate queued messages.
    pub fn pop_message(&mut self, inbox: &mut List<MsgHandle>, filter: Filter) -> Option<MsgHandle> {
        let mut cursor = inbox.head();
        while let Some(h) = cursor {
            if filter.matches(self.slots[h.index()].sender) {
                inbox.remove(&mut self.slots, h, msg_index);
                return Some(h);
            }
            cursor = self.slots[h.index()].links.next;
        }
        None
    }
}

impl Default for MsgPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_pop_any_roundtrips() {
        let mut pool = MsgPool::new();
        let mut inbox = List::new();
        let h = pool.alloc(Pid(3), 42).unwrap();
        pool.insert_message(&mut inbox, h);
        let popped = pool.pop_message(&mut inbox, Filter::Any).unwrap();
        assert_eq!(popped, h);
        assert_eq!(pool.get(popped).payload, 42);
        assert!(inbox.is_empty());
    }

    #[test]
    fn pop_with_specific_filter_skips_non_matching() {
        let mut pool = MsgPool::new();
        let mut inbox = List::new();
        let from_a = pool.alloc(Pid(1), 1).unwrap();
        let from_b = pool.alloc(Pid(2), 2).unwrap();
        pool.insert_message(&mut inbox, from_a);
        pool.insert_message(&mut inbox, from_b);

        let popped = pool.pop_message(&mut inbox, Filter::Specific(Pid(2))).unwrap();
        assert_eq!(popped, from_b);
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox.head(), Some(from_a));
    }

    #[test]
    fn exhaustion_returns_none() {
        let mut pool = MsgPool::new();
        let mut keep = vec![];
        for _ in 0..MAXMESSAGES {
            keep.push(pool.alloc(Pid(0), 0).unwrap());
        }
        assert!(pool.alloc(Pid(0), 0).is_none());
    }
}
