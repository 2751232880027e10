// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The runtime linked into every process image: raw SEND/RECEIVE syscall
//! stubs, panic handling, and a re-export of [`abi`] for convenience.
//!
//! Two syscall surfaces are exposed, matching the kernel's own split between
//! the privileged primitive and its user-mode wrapper:
//!
//! - [`sys_send_raw`]/[`sys_receive_raw`] issue the kernel-level `SEND`/
//!   `RECEIVE` ecall directly. Only a process with the previous-privileged
//!   status bit set (the SSI and the support layer's own processes) may use
//!   these; anything else traps to an illegal instruction.
//! - [`sys_send`]/[`sys_receive`] issue the `USEND`/`URECEIVE` ecall an
//!   ordinary user process uses. These are serviced by the support layer's
//!   general-exception handler, which re-issues the request as a raw SEND/
//!   RECEIVE on the caller's behalf and translates `PARENT_SENTINEL` to the
//!   caller's controlling process.
//!
//! Neither surface does anything useful when this crate is built for a host
//! test target — there is no CPU underneath to trap into. Tests exercise
//! `sys/kern`'s Rust API directly instead (see SPEC_FULL.md §10); the `ecall`
//! sequences below only ever execute on a real or emulated RISC-V target.

#![cfg_attr(target_os = "none", no_std)]

pub use abi::*;

pub mod hl;

#[cfg(target_os = "none")]
mod critical_section;

/// Issues the privileged `SEND(dest, payload)` primitive directly.
#[inline(always)]
pub fn sys_send_raw(dest: u16, payload: i32) -> i32 {
    imp::send(abi::Syscall::Send as i32, dest as i32, payload)
}

/// Issues the privileged `RECEIVE(filter)` primitive directly, returning
/// `(sender, payload)`.
#[inline(always)]
pub fn sys_receive_raw(filter: i32) -> (i32, i32) {
    imp::receive(abi::Syscall::Receive as i32, filter)
}

/// Issues the user-mode `USEND(dest, payload)` wrapper, serviced by the
/// support layer.
#[inline(always)]
pub fn sys_send(dest: i32, payload: i32) -> i32 {
    imp::send(abi::USyscall::USend as i32, dest, payload)
}

/// Issues the user-mode `URECEIVE(filter)` wrapper, serviced by the support
/// layer. Pass [`abi::PARENT_SENTINEL`] to receive only from the caller's
/// controlling process.
#[inline(always)]
pub fn sys_receive(filter: i32) -> (i32, i32) {
    imp::receive(abi::USyscall::URecv as i32, filter)
}

#[cfg(target_os = "none")]
mod imp {
    pub fn send(code: i32, a1: i32, a2: i32) -> i32 {
        let result: i32;
        unsafe {
            core::arch::asm!(
                "ecall",
                inlateout("a0") code => result,
                in("a1") a1,
                in("a2") a2,
            );
        }
        result
    }

    pub fn receive(code: i32, filter: i32) -> (i32, i32) {
        let sender: i32;
        let payload: i32;
        unsafe {
            core::arch::asm!(
                "ecall",
                inlateout("a0") code => sender,
                in("a1") filter,
                lateout("a2") payload,
            );
        }
        (sender, payload)
    }
}

#[cfg(not(target_os = "none"))]
mod imp {
    pub fn send(_code: i32, _a1: i32, _a2: i32) -> i32 {
        unimplemented!("raw syscalls only trap on a real or emulated RISC-V target")
    }

    pub fn receive(_code: i32, _filter: i32) -> (i32, i32) {
        unimplemented!("raw syscalls only trap on a real or emulated RISC-V target")
    }
}

#[cfg(all(target_os = "none", not(test)))]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo<'_>) -> ! {
    log::error!("task panicked: {}", info);
    loop {
        core::hint::spin_loop();
    }
}
