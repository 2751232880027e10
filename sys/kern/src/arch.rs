// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Architecture abstraction boundary.
//!
//! The out-of-scope CPU emulator provides the saved-state page, the
//! atomic-load/store instructions, TLB management, the two hardware
//! timers, and the interrupt-disable critical section (spec §6). This
//! module exposes exactly that surface as the [`Cpu`] trait so the rest of
//! the kernel can be written once and run against either a real backend or
//! the host-simulated [`fake`] backend used throughout this crate's test
//! suite, the same way the architecture the nucleus is descended from
//! keeps its portable kernel logic generic over an `arch` module and swaps
//! in a `fake` backend for host-side tests.

use abi::PageTableEntry;

use crate::time::Timestamp;

#[cfg(any(test, feature = "fake-cpu"))]
pub mod fake;

/// One physical swap frame's TLB-visible identity: a virtual page number
/// plus the page-table entry to install or probe for.
#[derive(Copy, Clone, Debug)]
pub struct TlbEntry {
    pub entry_hi: u32,
    pub pte: PageTableEntry,
}

/// The hardware primitives the kernel and support layer need from the CPU,
/// per spec §6: `STST`/`LDST` are modeled as ordinary state save/restore on
/// the `SavedState` struct rather than real control transfer, since this
/// crate exercises kernel logic directly (see SPEC_FULL.md §10) instead of
/// emulating real traps.
pub trait Cpu {
    /// Current wall-clock time, used for `p_time` accounting.
    fn now(&self) -> Timestamp;

    /// Arms the per-CPU local timer for the next `TIMESLICE_US` quantum.
    fn arm_plt(&mut self, us: u32);

    /// Arms the system interval timer for the next pseudoclock tick.
    fn arm_interval_timer(&mut self, us: u32);

    /// Disables interrupt delivery; paired with [`Cpu::enable_interrupts`].
    /// Kernel handlers run with interrupts masked from entry to their final
    /// `LDST` (spec §5); this models that critical section explicitly
    /// rather than relying on handler-runs-to-completion alone, since the
    /// pager's atomic regions (spec §4.10) need the same primitive at user
    /// level.
    fn disable_interrupts(&mut self);

    fn enable_interrupts(&mut self);

    /// `WAIT`: idle until the next interrupt. In the host simulation this
    /// simply records that the CPU is idling; the test harness drives the
    /// next interrupt explicitly.
    fn wait(&mut self);

    /// `HALT`: normal shutdown, reached when only the SSI remains.
    fn halt(&mut self) -> !;

    /// `PANIC`: the scheduler deadlock condition or an unrecoverable flash
    /// I/O error (spec §7).
    fn panic(&mut self, msg: &str) -> !;

    /// `TLBWR` + `setENTRYHI`/`setENTRYLO`: installs `entry` at a
    /// CPU-chosen ("random") TLB slot.
    fn tlb_write_random(&mut self, entry: TlbEntry);

    /// `TLBP` + `setENTRYHI`: probes for an entry matching `entry_hi`,
    /// returning whether one is currently resident.
    fn tlb_probe(&mut self, entry_hi: u32) -> bool;

    /// `TLBCLR`: invalidates the entire TLB. Spec §4.10 step 3a uses the
    /// coarse whole-TLB clear the reference implementation uses; §9 flags a
    /// finer per-(asid,vpn) invalidation as preferable future work if the
    /// emulated CPU ever supports it.
    fn tlb_clear(&mut self);
}
