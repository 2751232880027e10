// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The scheduler (spec §4.3): strict FIFO, non-preemptive apart from the
//! PLT quantum.

use crate::arch::Cpu;
use crate::kernel::{klog, Kernel};
use crate::pcb::Pid;

/// A scheduling hint returned by syscall/interrupt/SSI handlers, mirroring
/// the "what should run next" signal the reference kernel's exception
/// return path computes implicitly by falling through to the scheduler or
/// not.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NextTask {
    /// Control returns to whichever process was already current; no
    /// scheduling decision is needed (e.g. a `SEND` that didn't block).
    Same,
    /// Control returns to a specific process directly, without consulting
    /// the ready queue (reserved for cases where the caller already knows
    /// exactly who should run, e.g. the SSI continuing to its own `RECEIVE`
    /// is still itself — kept distinct from `Same` for callers that pass
    /// the pid explicitly).
    Specific(Pid),
    /// The current process gave up the CPU (blocked, terminated, or was
    /// preempted); the scheduler must pick the next runnable PCB.
    Other,
}

impl NextTask {
    /// Combines two scheduling hints the way the reference handler paths
    /// do when more than one process's state may have changed in a single
    /// handler invocation (e.g. `SEND` both returning to its caller *and*
    /// possibly needing the scheduler if the caller itself had been
    /// blocked by an earlier fault). `Other` always wins, since "someone
    /// needs the scheduler" can't be un-asked for.
    pub fn combine(self, other: NextTask) -> NextTask {
        match (self, other) {
            (NextTask::Other, _) | (_, NextTask::Other) => NextTask::Other,
            (NextTask::Specific(p), _) | (_, NextTask::Specific(p)) => NextTask::Specific(p),
            (NextTask::Same, NextTask::Same) => NextTask::Same,
        }
    }
}

/// What the scheduler decided to do, for the test harness and demo
/// binaries to act on. A real CPU backend would never observe `Panicked`
/// or `Halted` returned to it — both diverge via [`Cpu::panic`]/[`Cpu::halt`] —
/// but the `fake` backend's `panic!`-based implementations are caught by
/// `#[should_panic]` tests instead, so this enum exists for the common,
/// non-divergent `Ready` case.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ScheduleOutcome {
    Ready(Pid),
    Waiting,
}

/// The scheduler's selection policy (spec §4.3). Called whenever a handler
/// reports [`NextTask::Other`].
pub fn select<C: Cpu>(k: &mut Kernel<C>) -> ScheduleOutcome {
    k.current = None;

    if let Some(next) = k.ready_queue.remove_head(&mut k.pcbs.slots, crate::pcb::pid_index) {
        k.cpu.arm_plt(k.config.timeslice_us);
        k.ldst(next);
        klog::trace!("scheduler: dispatching pid {:?}", next);
        return ScheduleOutcome::Ready(next);
    }

    let process_count = k.process_count();
    if process_count == 1 && k.ssi_pid.is_some() {
        klog::info!("scheduler: only the SSI remains, halting");
        k.cpu.halt();
    }

    if process_count > 0 && k.soft_block_count > 0 {
        klog::trace!("scheduler: ready queue empty, entering WAIT");
        k.cpu.enable_interrupts();
        k.cpu.arm_plt(u32::MAX);
        k.cpu.wait();
        return ScheduleOutcome::Waiting;
    }

    klog::warn!("scheduler: deadlock (no ready process, no soft-blocked process)");
    k.cpu.panic("deadlock: ready queue empty and no process is soft-blocked");
}

/// Resolves a handler's scheduling hint into an actual dispatch decision.
pub fn resolve<C: Cpu>(k: &mut Kernel<C>, hint: NextTask) -> ScheduleOutcome {
    match hint {
        NextTask::Same => {
            let cur = k.current.expect("NextTask::Same requires a current process");
            k.ldst(cur);
            ScheduleOutcome::Ready(cur)
        }
        NextTask::Specific(p) => {
            k.ldst(p);
            ScheduleOutcome::Ready(p)
        }
        NextTask::Other => select(k),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::fake::FakeCpu;
    use crate::config::KernelConfig;
    use crate::pcb::Filter;

    fn booted_pair() -> (Kernel<FakeCpu>, Pid, Pid) {
        let mut k = Kernel::new(FakeCpu::new(), KernelConfig::default());
        let ssi = k.pcbs.alloc().unwrap();
        k.ssi_pid = Some(ssi);
        let user = k.pcbs.alloc().unwrap();
        (k, ssi, user)
    }

    #[test]
    fn only_ssi_left_halts() {
        let mut k = Kernel::new(FakeCpu::new(), KernelConfig::default());
        let ssi = k.pcbs.alloc().unwrap();
        k.ssi_pid = Some(ssi);
        k.current = None;
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| select(&mut k)));
        assert!(result.is_err());
        assert!(k.cpu.is_halted());
    }

    #[test]
    fn ready_soft_blocked_enters_wait() {
        let (mut k, _ssi, user) = booted_pair();
        k.current = None;
        k.block_on_device(user, 0, 0);
        let outcome = select(&mut k);
        assert_eq!(outcome, ScheduleOutcome::Waiting);
        assert_eq!(k.cpu.wait_count(), 1);
        assert!(k.cpu.interrupts_enabled());
    }

    /// Spec §8 scenario 6: only the SSI and one user process exist, the user
    /// process is blocked in `RECEIVE(ANY)` with no pending sender and no
    /// soft-blocks outstanding — the scheduler has nothing ready and nothing
    /// that will ever wake it, so it must PANIC rather than spin forever.
    #[test]
    fn deadlock_when_blocked_on_receive_with_no_soft_block() {
        let (mut k, _ssi, user) = booted_pair();
        k.current = None;
        k.pcb_mut(user).recv_filter = Some(Filter::Any);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| select(&mut k)));
        assert!(result.is_err(), "deadlock must panic, not silently idle");
        assert!(k.cpu.panic_message().is_some());
        assert!(!k.cpu.is_halted());
    }
}
