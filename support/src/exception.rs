// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The general-exception handler (spec §4.9): the user-mode `USEND`/
//! `URECEIVE` syscall wrapper, and program-trap termination for everything
//! else that reaches a general pass-up.
//!
//! The decision logic is split from its execution so it can be unit tested
//! without a real target: [`decide`] is a pure function over the saved
//! state, and [`run`] (real-target only) carries out whichever [`Action`]
//! it returns using the raw privileged syscalls `userlib` exposes to a
//! privileged process.

use abi::{CauseClass, SavedState, Syscall, PARENT_SENTINEL, USyscall};

/// What the general-exception handler decided to do with one pass-up.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Action {
    /// Re-issue the user's USEND/URECEIVE as the corresponding privileged
    /// syscall, on the user's behalf. `dest` has already had
    /// [`abi::PARENT_SENTINEL`] translated to the caller's real parent pid.
    Reissue { syscall: Syscall, dest: i32, payload: i32 },
    /// Anything else reaching here is a program trap (spec §4.9): release
    /// the swap mutex if the caller held it, then request
    /// `TERMPROCESS(self)` from the SSI.
    Terminate { release_mutex: bool },
}

/// Decides what to do with a general-exception pass-up.
///
/// `parent` is the faulting process's parent pid, already resolved by the
/// caller via `GETPROCESSID` (spec §4.7) — `decide` itself performs no
/// syscalls, so it cannot resolve `PARENT_SENTINEL` on its own.
pub fn decide(cause: CauseClass, state: &SavedState, parent: i32, holds_swap_mutex: bool) -> Action {
    if cause != CauseClass::UserModeEcall {
        return Action::Terminate { release_mutex: holds_swap_mutex };
    }
    match USyscall::from_code(state.a0 as u32) {
        Some(USyscall::USend) => Action::Reissue {
            syscall: Syscall::Send,
            dest: translate(state.a1, parent),
            payload: state.a2,
        },
        Some(USyscall::URecv) => Action::Reissue {
            syscall: Syscall::Receive,
            dest: translate(state.a1, parent),
            payload: 0,
        },
        None => Action::Terminate { release_mutex: holds_swap_mutex },
    }
}

fn translate(dest_or_filter: i32, parent: i32) -> i32 {
    if dest_or_filter == PARENT_SENTINEL {
        parent
    } else {
        dest_or_filter
    }
}

/// Carries out `action` on a real target: issues the reissued syscall (or
/// the TERMPROCESS request) using the raw privileged stubs, since the
/// support layer itself runs with the previous-privileged status bit set.
#[cfg(target_os = "none")]
pub fn run(action: Action, ssi: i32, self_pid: u16) -> Option<(i32, i32)> {
    use abi::{SsiRequest, SsiService};

    match action {
        Action::Reissue { syscall: Syscall::Send, dest, payload } => {
            let rc = userlib::sys_send_raw(dest as u16, payload);
            Some((rc, 0))
        }
        Action::Reissue { syscall: Syscall::Receive, dest, .. } => {
            Some(userlib::sys_receive_raw(dest))
        }
        Action::Terminate { release_mutex } => {
            if release_mutex {
                let _ = userlib::sys_send_raw(ssi as u16, 0);
            }
            let req = SsiRequest { service_code: SsiService::TermProcess as i32, arg: self_pid as i32 };
            let _ = userlib::hl::ssi_call(ssi, req);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(a0: i32, a1: i32, a2: i32) -> SavedState {
        SavedState { a0, a1, a2, ..SavedState::default() }
    }

    #[test]
    fn usend_reissues_as_privileged_send() {
        let action = decide(CauseClass::UserModeEcall, &state(USyscall::USend as u32 as i32, 7, 99), 3, false);
        assert_eq!(action, Action::Reissue { syscall: Syscall::Send, dest: 7, payload: 99 });
    }

    #[test]
    fn urecv_with_parent_sentinel_translates_to_parent_pid() {
        let action = decide(CauseClass::UserModeEcall, &state(USyscall::URecv as u32 as i32, PARENT_SENTINEL, 0), 3, false);
        assert_eq!(action, Action::Reissue { syscall: Syscall::Receive, dest: 3, payload: 0 });
    }

    #[test]
    fn unrecognized_user_ecall_is_a_program_trap() {
        let action = decide(CauseClass::UserModeEcall, &state(99, 0, 0), 3, true);
        assert_eq!(action, Action::Terminate { release_mutex: true });
    }

    #[test]
    fn non_ecall_cause_is_a_program_trap() {
        let action = decide(CauseClass::OtherTrap, &state(0, 0, 0), 3, false);
        assert_eq!(action, Action::Terminate { release_mutex: false });
    }
}
