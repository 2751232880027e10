// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Nucleus initialization (spec §4.2).
//!
//! The reference `initKernel` populates both static pools, zeroes every
//! global list, arms the interval timer, constructs the SSI and the first
//! application PCB, enqueues both, and calls the scheduler. This crate's
//! pools and lists are already zeroed by [`Kernel::new`]; `boot` only
//! needs to add the two hardcoded images and prime the interval timer,
//! matching SPEC_FULL.md §4.2's "Boot configuration" note: the two boot
//! images are compile-time-shaped constants supplied by the embedding
//! binary (or test), not a declarative build-time config table.

use abi::{PSECOND_US, SavedState, StatusWord};

use crate::arch::Cpu;
use crate::kernel::{klog, Kernel};
use crate::pcb::Pid;
use crate::scheduler::{self, ScheduleOutcome};

/// The two hardcoded boot images `initKernel` builds: the SSI's entry
/// point/stack and the first application ("test") process's. Everything
/// else about a fresh PCB (zeroed CPU time, empty inbox, no support) comes
/// from [`crate::pcb::PcbPool::alloc`].
#[derive(Copy, Clone, Debug)]
pub struct BootConfig {
    pub ssi_entry_pc: u32,
    pub ssi_stack: u32,
    pub test_entry_pc: u32,
    pub test_stack: u32,
}

/// The two booted PCBs, for a caller that wants to seed further state
/// (e.g. attach a support descriptor to the test process) before calling
/// the scheduler for the first time.
pub struct Booted {
    pub ssi: Pid,
    pub test: Pid,
}

/// Runs nucleus initialization against an already-constructed `Kernel`
/// (whose pools and lists start empty, per [`Kernel::new`]): builds the
/// SSI and test PCBs, enqueues both ready, and arms the interval timer.
/// Does *not* call the scheduler itself — that is the embedding binary's
/// (or test's) next step, mirroring the reference `initKernel`'s final
/// `scheduler()` call being the last line of `main`, not of `initKernel`.
pub fn boot<C: Cpu>(k: &mut Kernel<C>, config: BootConfig) -> Booted {
    klog::info!("boot: initializing nucleus");
    k.cpu.arm_interval_timer(PSECOND_US);

    let ssi = k
        .pcbs
        .alloc()
        .expect("the PCB pool is sized to hold at least the SSI and one application");
    {
        let pcb = k.pcb_mut(ssi);
        pcb.state = SavedState {
            pc: config.ssi_entry_pc,
            sp: config.ssi_stack,
            status: StatusWord::privileged(),
            ..SavedState::default()
        };
    }
    k.enqueue_ready(ssi);
    k.ssi_pid = Some(ssi);

    let test = k
        .pcbs
        .alloc()
        .expect("the PCB pool is sized to hold at least the SSI and one application");
    {
        let pcb = k.pcb_mut(test);
        pcb.state = SavedState {
            pc: config.test_entry_pc,
            sp: config.test_stack,
            status: StatusWord::privileged(),
            ..SavedState::default()
        };
    }
    k.enqueue_ready(test);

    klog::info!("boot: nucleus ready, process_count={}", k.process_count());
    Booted { ssi, test }
}

/// Convenience for callers that do want the scheduler's first pick in one
/// call (every demo binary and most tests do).
pub fn boot_and_schedule<C: Cpu>(k: &mut Kernel<C>, config: BootConfig) -> (Booted, ScheduleOutcome) {
    let booted = boot(k, config);
    let outcome = scheduler::select(k);
    (booted, outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::fake::FakeCpu;
    use crate::config::KernelConfig;

    fn cfg() -> BootConfig {
        BootConfig {
            ssi_entry_pc: 0x1000,
            ssi_stack: 0x2000,
            test_entry_pc: 0x3000,
            test_stack: 0x4000,
        }
    }

    #[test]
    fn boot_creates_two_processes_and_arms_clock() {
        let mut k = Kernel::new(FakeCpu::new(), KernelConfig::default());
        let booted = boot(&mut k, cfg());
        assert_eq!(k.process_count(), 2);
        assert_eq!(k.ssi_pid, Some(booted.ssi));
        assert!(k.cpu.interval_deadline().is_some());
        assert_eq!(k.ready_queue.len(), 2);
    }

    #[test]
    fn boot_and_schedule_dispatches_ready_head() {
        let mut k = Kernel::new(FakeCpu::new(), KernelConfig::default());
        let (booted, outcome) = boot_and_schedule(&mut k, cfg());
        assert_eq!(outcome, ScheduleOutcome::Ready(booted.ssi));
    }
}
