// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Process creation and (subtree) termination (spec §4.7 CREATEPROCESS /
//! TERMPROCESS).
//!
//! Both are driven by the SSI (`ssi.rs`) but are big enough, and reused
//! enough (pass-up-or-die also kills subtrees, spec §4.8), to live in their
//! own module rather than inline in the service `match`.

use abi::{SavedState, SupportDescriptor};

use crate::arch::Cpu;
use crate::kernel::{klog, Kernel};
use crate::pcb::Pid;

/// Everything `CREATEPROCESS` needs to seed a new PCB with. The kernel has
/// no notion of an ELF image (out of scope, spec §1); a caller (the SSI's
/// own caller, relayed through the closure `ssi::request` takes) supplies
/// the initial register file directly.
#[derive(Clone, Debug)]
pub struct NewProcessArgs {
    pub initial_state: SavedState,
    pub support: Option<SupportDescriptor>,
}

/// `CREATEPROCESS`: allocate a PCB, copy in the initial state, attach an
/// optional support descriptor, make it a child of `parent`, and enqueue it
/// ready. Returns `None` on pool exhaustion (spec §4.1, §4.7).
pub fn create_process<C: Cpu>(
    k: &mut Kernel<C>,
    parent: Pid,
    args: NewProcessArgs,
) -> Option<Pid> {
    let child = k.pcbs.alloc()?;
    {
        let pcb = k.pcb_mut(child);
        pcb.state = args.initial_state;
        pcb.support = args.support;
    }
    k.pcbs.insert_child(parent, child);
    k.enqueue_ready(child);
    klog::trace!("process: created pid {:?} as child of {:?}", child, parent);
    Some(child)
}

/// `TERMPROCESS`: recursively terminates `victim` and its entire subtree
/// (spec §4.7). For each PCB killed: remove it from whichever list it
/// currently inhabits, free every message still queued in its inbox,
/// detach it from its parent, and return its slot to the free pool.
///
/// Messages *sent by* the victim that are sitting in some other PCB's
/// inbox are left alone — the spec only requires freeing the victim's own
/// inbox, and a message's sender field is read-only data a surviving
/// receiver may still observe (see DESIGN.md's open-question decision on
/// `pop_message` scanning regardless of a freed sender).
pub fn kill_subtree<C: Cpu>(k: &mut Kernel<C>, victim: Pid) {
    // Collect the whole subtree breadth-first before touching the tree
    // structure itself, since detaching children while iterating
    // `children_of` would invalidate the in-progress traversal.
    let mut frontier = alloc_stack();
    frontier.push(victim);
    let mut subtree = alloc_stack();

    while let Some(p) = frontier.pop() {
        subtree.push(p);
        loop {
            match k.pcbs.remove_first_child(p) {
                Some(child) => frontier.push(child),
                None => break,
            }
        }
    }

    for &p in subtree.iter() {
        kill_one(k, p);
    }
}

fn kill_one<C: Cpu>(k: &mut Kernel<C>, p: Pid) {
    k.remove_from_any_queue(p);
    k.pcbs.detach_from_parent(p);
    free_inbox(k, p);
    if k.current == Some(p) {
        k.current = None;
    }
    k.pcbs.free(p);
    klog::trace!("process: terminated pid {:?}", p);
}

fn free_inbox<C: Cpu>(k: &mut Kernel<C>, p: Pid) {
    let mut inbox = core::mem::take(&mut k.pcb_mut(p).inbox);
    while let Some(h) = k.msgs.pop_any(&mut inbox) {
        k.msgs.free(h);
    }
    k.pcb_mut(p).inbox = inbox;
}

/// A tiny fixed-capacity stack used for the subtree walk, sized to
/// `MAXPROC` so it can never overflow regardless of tree shape (spec §3:
/// the PCB pool itself bounds how many processes can ever exist at once).
fn alloc_stack() -> heaplessish::Stack {
    heaplessish::Stack::new()
}

/// A minimal fixed-capacity LIFO stack of `Pid`s, avoiding a dependency on
/// `alloc` in a `no_std` kernel the way the reference implementation avoids
/// heap allocation entirely (spec §3: static pools only).
mod heaplessish {
    use abi::MAXPROC;

    use crate::pcb::Pid;

    pub struct Stack {
        buf: [Option<Pid>; MAXPROC],
        len: usize,
    }

    impl Stack {
        pub fn new() -> Self {
            Stack {
                buf: [None; MAXPROC],
                len: 0,
            }
        }

        pub fn push(&mut self, p: Pid) {
            self.buf[self.len] = Some(p);
            self.len += 1;
        }

        pub fn pop(&mut self) -> Option<Pid> {
            if self.len == 0 {
                return None;
            }
            self.len -= 1;
            self.buf[self.len].take()
        }

        pub fn iter(&self) -> impl Iterator<Item = &Pid> {
            self.buf[..self.len].iter().filter_map(|o| o.as_ref())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::fake::FakeCpu;
    use crate::config::KernelConfig;

    fn boot() -> (Kernel<FakeCpu>, Pid) {
        let mut k = Kernel::new(FakeCpu::new(), KernelConfig::default());
        let root = k.pcbs.alloc().unwrap();
        (k, root)
    }

    #[test]
    fn create_process_enqueues_child_and_links_tree() {
        let (mut k, root) = boot();
        let child = create_process(
            &mut k,
            root,
            NewProcessArgs {
                initial_state: SavedState::default(),
                support: None,
            },
        )
        .unwrap();
        assert_eq!(k.pcb(child).parent, Some(root));
        assert_eq!(k.ready_queue.len(), 1);
    }

    #[test]
    fn kill_subtree_frees_every_descendant() {
        let (mut k, root) = boot();
        let c1 = create_process(&mut k, root, NewProcessArgs { initial_state: SavedState::default(), support: None }).unwrap();
        let c2 = create_process(&mut k, root, NewProcessArgs { initial_state: SavedState::default(), support: None }).unwrap();
        let gc1 = create_process(&mut k, c1, NewProcessArgs { initial_state: SavedState::default(), support: None }).unwrap();

        let before = k.process_count();
        kill_subtree(&mut k, root);
        assert_eq!(k.process_count(), before - 4);
        assert!(k.pcbs.is_free(root));
        assert!(k.pcbs.is_free(c1));
        assert!(k.pcbs.is_free(c2));
        assert!(k.pcbs.is_free(gc1));
    }

    #[test]
    fn kill_subtree_frees_queued_messages() {
        let (mut k, root) = boot();
        let sender = k.pcbs.alloc().unwrap();
        let h = k.msgs.alloc(sender, 7).unwrap();
        let mut inbox = core::mem::take(&mut k.pcb_mut(root).inbox);
        k.msgs.insert_message(&mut inbox, h);
        k.pcb_mut(root).inbox = inbox;

        kill_subtree(&mut k, root);
        // The message pool slot must have been returned; allocating
        // MAXMESSAGES fresh ones should now succeed including this one.
        assert!(k.msgs.alloc(sender, 0).is_some());
    }
}
