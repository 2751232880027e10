// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Nucleus ABI definitions, shared between the kernel, the support layer, and
//! user processes.

#![no_std]

use core::fmt;

/// Maximum number of process control blocks the kernel will ever allocate at
/// once.
pub const MAXPROC: usize = 20;

/// Maximum number of in-flight message records.
pub const MAXMESSAGES: usize = 20;

/// Length, in microseconds, of one PLT quantum.
pub const TIMESLICE_US: u32 = 5_000;

/// Length, in microseconds, of one pseudoclock tick.
pub const PSECOND_US: u32 = 100_000;

/// Bytes per page / per backing-store block.
pub const PAGESIZE: usize = 4096;

/// Entries in a user process's private page table.
pub const USERPGTBLSIZE: usize = 32;

/// Maximum number of user (non-SSI) processes that may hold a swap-pool frame.
pub const UPROCMAX: usize = 8;

/// Swap pool size, per spec §6: 2 * UPROCMAX.
pub const SWAPPOOLSIZE: usize = 2 * UPROCMAX;

/// Number of interrupt lines with per-subdevice blocked lists.
pub const DEV_LINES: usize = 5;

/// Subdevices per interrupt line (terminals split into receiver/transmitter).
pub const DEVS_PER_LINE: usize = 8;

/// Sentinel receive filter meaning "accept a message from any sender."
pub const ANY: i32 = -1;

/// Sentinel meaning "no PCB" / "no parent" / "pool exhausted."
pub const NONE: i32 = 0;

/// Sentinel passed as the destination of `TERMPROCESS` meaning "the caller
/// itself."
pub const SELF: i32 = 0;

/// Sentinel used as the `dest`/`filter` argument of the user-mode syscall
/// wrapper meaning "my parent (SST/controller) process."
pub const PARENT_SENTINEL: i32 = -2;

/// Kernel-level privileged syscall numbers, carried in `a0` per spec §6.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(i32)]
pub enum Syscall {
    Send = -1,
    Receive = -2,
}

impl Syscall {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(Syscall::Send),
            -2 => Some(Syscall::Receive),
            _ => None,
        }
    }
}

/// User-mode syscall wrapper codes, re-exported by the support layer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum USyscall {
    USend = 1,
    URecv = 2,
}

impl USyscall {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(USyscall::USend),
            2 => Some(USyscall::URecv),
            _ => None,
        }
    }
}

/// Result codes written into the caller's `a0` by the kernel SEND primitive.
pub mod send_result {
    pub const OK: i32 = 0;
    pub const DEST_NOT_EXIST: i32 = -1;
    pub const MSG_NOGOOD: i32 = -2;
}

/// Classification of the saved Cause register, as decoded by the exception
/// dispatcher (spec §4.4). The concrete bit layout belongs to the
/// out-of-scope CPU emulator; only the classification survives into the
/// kernel's API.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CauseClass {
    ExternalInterrupt,
    TlbException,
    TlbModification,
    MachineModeEcall,
    UserModeEcall,
    OtherTrap,
}

/// Which of the two deferred exception contexts a support descriptor holds.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(usize)]
pub enum ExceptionKind {
    PageFault = 0,
    General = 1,
}

pub const EXCEPTION_KINDS: usize = 2;

/// Service codes understood by the SSI (spec §4.7). Discriminants are the
/// actual wire codes carried in `SsiRequest::service_code` — pinned
/// explicitly so `SsiService::X as i32` and `from_code` never drift apart.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(i32)]
pub enum SsiService {
    CreateProcess = 1,
    TermProcess = 2,
    DoIo = 3,
    GetCpuTime = 4,
    ClockWait = 5,
    GetSupportPtr = 6,
    GetProcessId = 7,
}

impl SsiService {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(SsiService::CreateProcess),
            2 => Some(SsiService::TermProcess),
            3 => Some(SsiService::DoIo),
            4 => Some(SsiService::GetCpuTime),
            5 => Some(SsiService::ClockWait),
            6 => Some(SsiService::GetSupportPtr),
            7 => Some(SsiService::GetProcessId),
            _ => None,
        }
    }
}

/// Request payload sent to the SSI: {service_code, arg}, per spec §6.
#[derive(Copy, Clone, Debug)]
pub struct SsiRequest {
    pub service_code: i32,
    pub arg: i32,
}

impl SsiRequest {
    /// Packs the two-word request struct into the single `a2` payload
    /// word the kernel-level `SEND` primitive carries (spec §4.5), since
    /// this crate has no modeled user address space for a real pointer
    /// dereference to read the struct out of (see SPEC_FULL.md §4.7).
    /// `service_code` occupies the top byte, `arg` the low 24 bits.
    pub fn encode(self) -> i32 {
        ((self.service_code & 0xff) << 24) | (self.arg & 0x00ff_ffff)
    }

    pub fn decode(word: i32) -> Self {
        let service_code = (word >> 24) & 0xff;
        let arg = word & 0x00ff_ffff;
        // Sign-extend a 24-bit arg so small negative values (e.g. a
        // `TERMPROCESS` self-sentinel of 0, or future signed args) still
        // round-trip; current services only ever use small non-negative
        // args so this only matters for forward compatibility.
        let arg = (arg << 8) >> 8;
        SsiRequest { service_code, arg }
    }
}

/// A `CREATEPROCESS` argument: an opaque pointer (in this simulation, a
/// process-table index into a caller-provided image table) to the initial
/// saved state plus an optional support descriptor.
#[derive(Copy, Clone, Debug)]
pub struct CreateProcessArgs {
    pub initial_pc: u32,
    pub initial_sp: u32,
    pub with_support: bool,
}

/// Saved processor state, per spec §3. The concrete register file belongs to
/// the out-of-scope CPU emulator; the kernel only needs the fields it reads
/// or writes directly.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SavedState {
    pub pc: u32,
    pub sp: u32,
    pub status: StatusWord,
    pub a0: i32,
    pub a1: i32,
    pub a2: i32,
    pub cause: u32,
    pub entry_hi: u32,
}

bitflags::bitflags! {
    /// Minimal status-word model: a machine-interrupt-enable bit and a
    /// previous-privilege bit, per spec §6 and §9 ("Privilege enforcement").
    #[derive(Default)]
    pub struct StatusWord: u32 {
        const INTERRUPTS_ENABLED = 1 << 0;
        const PREVIOUS_PRIVILEGED = 1 << 1;
    }
}

impl StatusWord {
    pub fn privileged() -> Self {
        StatusWord::INTERRUPTS_ENABLED | StatusWord::PREVIOUS_PRIVILEGED
    }

    pub fn is_privileged(self) -> bool {
        self.contains(StatusWord::PREVIOUS_PRIVILEGED)
    }
}

/// A page-table entry in a user process's private page table (spec §3,
/// "Support descriptor").
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PageTableEntry {
    pub valid: bool,
    pub dirty: bool,
    pub frame: u32,
}

/// Per-user-process auxiliary state attached to a PCB, per spec §3.
#[derive(Clone, Debug)]
pub struct SupportDescriptor {
    pub asid: u8,
    pub exception_state: [SavedState; EXCEPTION_KINDS],
    pub exception_context: [ExceptionContext; EXCEPTION_KINDS],
    pub page_table: [PageTableEntry; USERPGTBLSIZE],
}

impl SupportDescriptor {
    pub fn new(asid: u8) -> Self {
        SupportDescriptor {
            asid,
            exception_state: [SavedState::default(); EXCEPTION_KINDS],
            exception_context: [ExceptionContext::default(); EXCEPTION_KINDS],
            page_table: [PageTableEntry::default(); USERPGTBLSIZE],
        }
    }
}

/// The (new SP, status, PC) triple the kernel `LDST`s into on pass-up, per
/// spec §4.8.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ExceptionContext {
    pub sp: u32,
    pub status: StatusWord,
    pub pc: u32,
}

impl fmt::Display for CauseClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CauseClass::ExternalInterrupt => "external-interrupt",
            CauseClass::TlbException => "tlb-exception",
            CauseClass::TlbModification => "tlb-modification",
            CauseClass::MachineModeEcall => "machine-ecall",
            CauseClass::UserModeEcall => "user-ecall",
            CauseClass::OtherTrap => "other-trap",
        };
        f.write_str(s)
    }
}
