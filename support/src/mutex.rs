// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The swap mutex (spec §4.10 "Swap mutex"): a single controller process
//! guards the swap pool, and clients acquire/release it purely by message
//! passing — there is no user-visible lock object, per spec §5's "Shared-
//! resource policy."
//!
//! The protocol, run from a client's side:
//! 1. SEND an empty message to the controller.
//! 2. The controller RECEIVEs it, then SENDs back a grant.
//! 3. The client performs its critical section.
//! 4. The client SENDs again to signal release; the controller loops to
//!    service the next waiter, FIFO by virtue of the underlying message
//!    queue (spec §4.1's inbox ordering).
//!
//! The controller side of this protocol is `task/jefe`'s `main.rs` in this
//! workspace, not this crate — a client only ever needs [`SwapMutex`].

/// A held swap-mutex guard. Dropping it without calling [`SwapMutex::release`]
/// is a logic error (the real release SEND never gets sent), so this type
/// carries no `Drop` impl of its own; callers are expected to call
/// `release` explicitly, matching the pager's own non-panicking release
/// step (spec §4.10 step 7).
pub trait SwapMutex {
    fn acquire(&mut self);
    fn release(&mut self);
}

/// The real backend: SENDs to the well-known swap-mutex controller pid and
/// blocks for its replies, exactly per the protocol above.
#[cfg(target_os = "none")]
pub struct MessageSwapMutex {
    pub controller: i32,
}

#[cfg(target_os = "none")]
impl SwapMutex for MessageSwapMutex {
    fn acquire(&mut self) {
        let _ = userlib::sys_send_raw(self.controller as u16, 0);
        let _ = userlib::sys_receive_raw(self.controller);
    }

    fn release(&mut self) {
        let _ = userlib::sys_send_raw(self.controller as u16, 0);
        let _ = userlib::sys_receive_raw(self.controller);
    }
}

/// Host test double: a simple re-entrancy check, since there is no real
/// controller process to serialize against in a unit test.
#[cfg(not(target_os = "none"))]
#[derive(Default)]
pub struct FakeSwapMutex {
    held: bool,
}

#[cfg(not(target_os = "none"))]
impl SwapMutex for FakeSwapMutex {
    fn acquire(&mut self) {
        assert!(!self.held, "swap mutex acquired while already held");
        self.held = true;
    }

    fn release(&mut self) {
        assert!(self.held, "swap mutex released while not held");
        self.held = false;
    }
}
