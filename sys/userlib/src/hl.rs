// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! High-level user interface, built on top of the raw [`crate::sys_send`]/
//! [`crate::sys_receive`] stubs.
//!
//! Every message in this design is a single `i32` payload word (spec §6:
//! "payload in a2") rather than an arbitrary byte buffer, so the ergonomic
//! wrapper this module provides is correspondingly small: a single-shot
//! request/reply helper for talking to the SSI, and a `RECEIVE`-dispatch
//! loop for processes that serve requests themselves (the swap-mutex
//! controller, drivers, and the SSI's own conceptual loop all have this
//! shape).

use abi::{SsiRequest, ANY};

/// Sends `req` to the SSI and waits for its single-word reply.
///
/// `ssi` is the pid of the distinguished SSI process, typically obtained
/// once at startup via a well-known constant supplied by the embedding
/// image, or via [`abi::PARENT_SENTINEL`] for a process whose controller is
/// itself the thing relaying SSI access.
pub fn ssi_call(ssi: i32, req: SsiRequest) -> i32 {
    let _ = crate::sys_send(ssi, req.encode());
    let (_sender, payload) = crate::sys_receive(ssi);
    payload
}

/// Runs `handler` forever, replying to every message this process receives
/// with the word `handler` returns.
///
/// This is the shape every single-server process in this design shares: the
/// SSI (modeled as kernel-native logic rather than a scheduled loop, per
/// SPEC_FULL.md §4.7), the swap-mutex controller, and any demonstration
/// driver a task wants to expose to its siblings.
pub fn serve_forever(mut handler: impl FnMut(i32, i32) -> i32) -> ! {
    loop {
        let (sender, payload) = crate::sys_receive(ANY);
        let reply = handler(sender, payload);
        let _ = crate::sys_send(sender, reply);
    }
}

/// Runs `handler` forever without ever replying itself; useful for a
/// controller whose protocol is "receive, act, and let the handler decide
/// whether and when to reply" (the swap-mutex grant/release dance replies
/// at two different points, not once per inbound message).
pub fn recv_loop(mut handler: impl FnMut(i32, i32)) -> ! {
    loop {
        let (sender, payload) = crate::sys_receive(ANY);
        handler(sender, payload);
    }
}
