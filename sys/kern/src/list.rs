// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Intrusive doubly-linked list primitive.
//!
//! The reference kernel embeds raw pointer links directly in its process and
//! message structs. Per the design notes, pointer cycles are replaced here
//! with arena indices: a [`Links`] pair of `Option<H>` lives inside the
//! arena element itself, and a [`List`] is nothing but a head/tail/length
//! triple of handles. Traversal always goes back through the owning arena
//! slice, so a list can never outlive (or dangle past) the element it
//! points at.

/// The pair of handles embedded in an arena element to make it a member of
/// zero or one [`List`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Links<H> {
    pub next: Option<H>,
    pub prev: Option<H>,
}

impl<H> Default for Links<H> {
    fn default() -> Self {
        Links {
            next: None,
            prev: None,
        }
    }
}

/// Anything that can be linked into a [`List`] of handle type `H`.
pub trait Linked<H> {
    fn links(&self) -> &Links<H>;
    fn links_mut(&mut self) -> &mut Links<H>;
}

/// A FIFO list of arena handles, threaded through the `Links` embedded in
/// each arena element. Insertion is always at the tail; `head`/`pop_head`
/// read and remove the oldest element.
#[derive(Copy, Clone, Debug)]
pub struct List<H> {
    head: Option<H>,
    tail: Option<H>,
    len: usize,
}

impl<H> Default for List<H> {
    fn default() -> Self {
        List {
            head: None,
            tail: None,
            len: 0,
        }
    }
}

impl<H: Copy + Eq> List<H> {
    pub const fn new() -> Self {
        List {
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn head(&self) -> Option<H> {
        self.head
    }

    /// Appends `handle` to the tail of the list. The caller must guarantee
    /// `handle` is not already a member of any list.
    pub fn insert_tail<T: Linked<H>>(&mut self, arena: &mut [T], handle: H, index: impl Fn(H) -> usize) {
        let idx = index(handle);
        arena[idx].links_mut().prev = self.tail;
        arena[idx].links_mut().next = None;
        if let Some(tail) = self.tail {
            arena[index(tail)].links_mut().next = Some(handle);
        } else {
            self.head = Some(handle);
        }
        self.tail = Some(handle);
        self.len += 1;
    }

    /// Prepends `handle` to the head of the list.
    pub fn insert_head<T: Linked<H>>(&mut self, arena: &mut [T], handle: H, index: impl Fn(H) -> usize) {
        let idx = index(handle);
        arena[idx].links_mut().next = self.head;
        arena[idx].links_mut().prev = None;
        if let Some(head) = self.head {
            arena[index(head)].links_mut().prev = Some(handle);
        } else {
            self.tail = Some(handle);
        }
        self.head = Some(handle);
        self.len += 1;
    }

    /// Removes and returns the head of the list, if any.
    pub fn remove_head<T: Linked<H>>(&mut self, arena: &mut [T], index: impl Fn(H) -> usize) -> Option<H> {
        let head = self.head?;
        self.remove(arena, head, index);
        Some(head)
    }

    /// Removes `handle` from the list. Returns `true` if it was present.
    /// This is the "soft error" path from spec §4.1: removing something not
    /// actually queued here is reported, not panicked on.
    ///
    /// `handle`'s embedded `Links` are only trustworthy as *this* list's
    /// links once membership is confirmed by walking from `self.head` — an
    /// element can carry stale (or currently foreign) `prev`/`next` values
    /// left over from another list it sits on or once sat on, and splicing
    /// on those blindly corrupts that other list instead of reporting a
    /// soft miss.
    pub fn remove<T: Linked<H>>(&mut self, arena: &mut [T], handle: H, index: impl Fn(H) -> usize) -> bool {
        let mut present = false;
        let mut cur = self.head;
        while let Some(h) = cur {
            if h == handle {
                present = true;
                break;
            }
            cur = arena[index(h)].links().next;
        }
        if !present {
            return false;
        }

        let idx = index(handle);
        let (prev, next) = {
            let links = arena[idx].links();
            (links.prev, links.next)
        };

        match prev {
            Some(p) => arena[index(p)].links_mut().next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => arena[index(n)].links_mut().prev = prev,
            None => self.tail = prev,
        }

        arena[idx].links_mut().prev = None;
        arena[idx].links_mut().next = None;
        self.len = self.len.saturating_sub(1);
        true
    }

    /// Iterates handles front-to-back without mutating anything.
    pub fn iter<'a, T: Linked<H>>(&self, arena: &'a [T], index: fn(H) -> usize) -> ListIter<'a, H, T> {
        ListIter {
            arena,
            next: self.head,
            index,
        }
    }
}

pub struct ListIter<'a, H, T> {
    arena: &'a [T],
    next: Option<H>,
    index: fn(H) -> usize,
}

impl<'a, H: Copy, T: Linked<H>> Iterator for ListIter<'a, H, T> {
    type Item = H;

    fn next(&mut self) -> Option<H> {
        let cur = self.next?;
        self.next = self.arena[(self.index)(cur)].links().next;
        Some(cur)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Elem {
        links: Links<usize>,
        value: u32,
    }

    impl Linked<usize> for Elem {
        fn links(&self) -> &Links<usize> {
            &self.links
        }
        fn links_mut(&mut self) -> &mut Links<usize> {
            &mut self.links
        }
    }

    fn ident(h: usize) -> usize {
        h
    }

    #[test]
    fn fifo_order() {
        let mut arena: Vec<Elem> = (0..4)
            .map(|v| Elem {
                links: Links::default(),
                value: v,
            })
            .collect();
        let mut list = List::new();
        for i in 0..4 {
            list.insert_tail(&mut arena, i, ident);
        }
        let collected: Vec<u32> = list.iter(&arena, ident).map(|h| arena[h].value).collect();
        assert_eq!(collected, vec![0, 1, 2, 3]);
        assert_eq!(list.len(), 4);
    }

    #[test]
    fn remove_middle_preserves_order() {
        let mut arena: Vec<Elem> = (0..4)
            .map(|v| Elem {
                links: Links::default(),
                value: v,
            })
            .collect();
        let mut list = List::new();
        for i in 0..4 {
            list.insert_tail(&mut arena, i, ident);
        }
        assert!(list.remove(&mut arena, 1, ident));
        let collected: Vec<u32> = list.iter(&arena, ident).map(|h| arena[h].value).collect();
        assert_eq!(collected, vec![0, 2, 3]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn remove_absent_is_soft_failure() {
        let mut arena: Vec<Elem> = (0..2)
            .map(|v| Elem {
                links: Links::default(),
                value: v,
            })
            .collect();
        let mut list: List<usize> = List::new();
        list.insert_tail(&mut arena, 0, ident);
        assert!(!list.remove(&mut arena, 1, ident));
    }

    /// An element that belongs to a *different* list still carries non-`None`
    /// `prev`/`next` pointing into that other list. `remove` on an unrelated
    /// list must report a soft miss rather than splice those foreign links.
    #[test]
    fn remove_of_member_on_a_different_list_is_a_soft_failure() {
        let mut arena: Vec<Elem> = (0..3)
            .map(|v| Elem {
                links: Links::default(),
                value: v,
            })
            .collect();
        let mut pseudoclock: List<usize> = List::new();
        pseudoclock.insert_tail(&mut arena, 0, ident);
        pseudoclock.insert_tail(&mut arena, 1, ident);
        pseudoclock.insert_tail(&mut arena, 2, ident);

        let mut ready_queue: List<usize> = List::new();
        // 1 is the non-head, non-tail member of pseudoclock, so its Links
        // have both prev and next set to pseudoclock neighbors.
        assert!(!ready_queue.remove(&mut arena, 1, ident));

        // pseudoclock itself must be untouched.
        let collected: Vec<u32> = pseudoclock.iter(&arena, ident).map(|h| arena[h].value).collect();
        assert_eq!(collected, vec![0, 1, 2]);
        assert_eq!(pseudoclock.len(), 3);

        // And removing it from its real list still works afterward.
        assert!(pseudoclock.remove(&mut arena, 1, ident));
        let collected: Vec<u32> = pseudoclock.iter(&arena, ident).map(|h| arena[h].value).collect();
        assert_eq!(collected, vec![0, 2]);
    }

    #[test]
    fn remove_head_then_empty() {
        let mut arena: Vec<Elem> = vec![Elem {
            links: Links::default(),
            value: 7,
        }];
        let mut list = List::new();
        list.insert_tail(&mut arena, 0, ident);
        assert_eq!(list.remove_head(&mut arena, ident), Some(0));
        assert!(list.is_empty());
        assert_eq!(list.remove_head(&mut arena, ident), None);
    }
}
