// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The first half of the message-passing demo (spec §12 scenario 1): sends
//! `42` to `task-pong`, waits for its reply, and loops.

#![no_std]
#![no_main]

use userlib::ANY;

const PING_PAYLOAD: i32 = 42;

/// `task-pong`'s pid. This design has no compile-time task-binding
/// mechanism (spec §13 names no such facility, unlike the donor's linked
/// `TaskSlot` table); the embedding image fixes process creation order, so
/// the pid pong receives from its own `CREATEPROCESS` reply is wired in
/// here by convention: pong is always created immediately after ping.
const PONG: i32 = 3;

#[export_name = "main"]
fn main() -> ! {
    loop {
        let _ = userlib::sys_send(PONG, PING_PAYLOAD);
        let (sender, reply) = userlib::sys_receive(ANY);
        debug_assert_eq!(sender, PONG);
        debug_assert_eq!(reply, PING_PAYLOAD + 1);
    }
}
