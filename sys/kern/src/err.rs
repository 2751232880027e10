// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Kernel error types.
//!
//! Mirrors the recoverable/unrecoverable split used for IPC faults: most of
//! the conditions this kernel can hit are in-band replies a caller reacts
//! to (`KernelError`), while a small, closed set of conditions are always
//! fatal to a process or its subtree (`Fault`) and never surface as a
//! `Result` a caller could ignore.

use core::fmt;

/// A recoverable condition, returned to a caller through the normal SEND
/// reply channel or an `Option`/`Result` return from an allocator.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum KernelError {
    /// The PCB pool was exhausted (spec §4.1, §4.2).
    PcbPoolExhausted,
    /// The message pool was exhausted (spec §4.1).
    MessagePoolExhausted,
    /// `SEND` targeted a PCB currently on the free list (spec §4.5).
    DestNotExist,
    /// A queue/tree removal was attempted on a handle not actually queued
    /// there; a soft error per spec §4.1.
    NotQueued,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            KernelError::PcbPoolExhausted => "pcb pool exhausted",
            KernelError::MessagePoolExhausted => "message pool exhausted",
            KernelError::DestNotExist => "destination does not exist",
            KernelError::NotQueued => "handle not queued where expected",
        };
        f.write_str(s)
    }
}

/// A condition the spec defines as always fatal, per §4.8 and §7's error
/// table. Producing a `Fault` always routes through pass-up-or-die or
/// direct subtree termination; it is never handed back to unrelated code as
/// a plain `Result`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Fault {
    /// User-mode process attempted a privileged SEND/RECEIVE directly.
    IllegalPrivilegedSyscall,
    /// TLB/general exception with no attached support descriptor.
    UnsupportedPageFault,
    /// TLB-modification exception (always a program trap, spec §4.10 step 1).
    TlbModification,
    /// SSI received a service code outside the recognized set.
    UnknownSsiService,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Fault::IllegalPrivilegedSyscall => "illegal privileged syscall from user mode",
            Fault::UnsupportedPageFault => "page fault with no support layer attached",
            Fault::TlbModification => "tlb-modification exception",
            Fault::UnknownSsiService => "unknown ssi service code",
        };
        f.write_str(s)
    }
}
