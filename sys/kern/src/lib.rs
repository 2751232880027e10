// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The nucleus kernel.
//!
//! This is the process/message core described in SPEC_FULL.md: PCB and
//! message allocators, the ready queue and blocked lists, the exception
//! dispatcher, the SEND/RECEIVE syscall handlers, the interrupt handler,
//! the SSI request dispatcher, the scheduler, and pass-up-or-die. It runs
//! in privileged mode only; the support layer (a separate crate) is the
//! first thing a pass-up delivers control to.
//!
//! # Design principles
//!
//! 1. One owned `Kernel<C>` value threaded through every handler in place
//!    of free-standing globals; taking `&mut Kernel<C>` is the "interrupts
//!    disabled" critical section.
//! 2. Arena allocation with integer handles (`Pid`, `MsgHandle`) in place of
//!    the reference kernel's intrusive pointer lists.
//! 3. A strong preference for safe code; the only `unsafe` in this crate
//!    lives behind the `Cpu` trait's real hardware backends, never in the
//!    portable kernel logic.

#![cfg_attr(target_os = "none", no_std)]

#[macro_use]
pub mod arch;

pub mod boot;
pub mod config;
pub mod dispatch;
pub mod err;
pub mod interrupt;
pub mod kernel;
pub mod list;
pub mod msg;
pub mod pcb;
pub mod process;
pub mod scheduler;
pub mod ssi;
pub mod syscalls;
pub mod time;
