// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The support layer (spec §4.9, §4.10): everything that runs in the gap
//! between "the kernel refused to handle this exception itself" and "a user
//! process resumes." None of this is part of the nucleus proper — the
//! kernel only ever hands an exception to the support layer via
//! pass-up-or-die (`kern::dispatch::DispatchOutcome::PassedUp`) and never
//! calls back into it directly, mirroring the way the donor crate's kernel
//! has no compile-time knowledge of any particular driver or supervisor
//! task.
//!
//! Every piece here is built the way `sys/kern` builds its own hardware
//! boundary: generic over [`kern::arch::Cpu`], with the host test suite
//! running against `kern::arch::fake::FakeCpu` and small device-facing
//! traits of its own ([`flash::Flash`], [`mutex::SwapMutex`]) standing in
//! for the out-of-scope DOIO register protocol and the message-passing
//! swap-mutex controller, respectively.

#![cfg_attr(target_os = "none", no_std)]

pub mod exception;
pub mod flash;
pub mod mutex;
pub mod pager;
pub mod swap;
pub mod tlb;

/// A user process's private page table, per spec §3.
pub type PageTable = [abi::PageTableEntry; abi::USERPGTBLSIZE];

/// The contents of one physical swap frame.
pub type Frame = [u8; abi::PAGESIZE];
