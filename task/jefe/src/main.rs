// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The swap-mutex controller (spec §4.10 "Swap mutex"): a single process
//! that serializes access to the swap pool on behalf of every user
//! process's support-level pager.
//!
//! Shaped after the donor crate's supervisor task: a single long-lived
//! server process the rest of the system leans on, reachable by a
//! well-known pid rather than by discovery. Unlike that supervisor, this
//! process has exactly one piece of state to protect (the swap pool isn't
//! physically touched by this task at all — only the *permission* to touch
//! it) and never monitors or restarts anyone.
//!
//! Protocol, from the controller's point of view: RECEIVE any message,
//! grant it by SENDing an empty reply, RECEIVE the matching release
//! message from the same sender, and loop. Because the kernel's inbox is a
//! FIFO per spec §4.1, waiters are served in arrival order without the
//! controller doing any bookkeeping of its own.

#![no_std]
#![no_main]

use userlib::ANY;

#[export_name = "main"]
fn main() -> ! {
    loop {
        let (holder, _) = userlib::sys_receive(ANY);
        let _ = userlib::sys_send(holder, 0);
        // The holder now owns the swap pool. Block until it signals
        // release; nothing else may use SEND to reach this controller in
        // between without itself blocking behind the current holder,
        // since this loop doesn't RECEIVE(ANY) again until the release
        // arrives.
        let (released_by, _) = userlib::sys_receive(holder);
        debug_assert_eq!(released_by, holder);
    }
}
