// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The interrupt handler (spec §4.6): PLT, pseudoclock, and device lines.
//!
//! Processing order is fixed: PLT first, interval timer second, then
//! device lines low-to-high, subdevices low-to-high within a line. The
//! caller (the binary embedding this kernel, or a test) is expected to
//! present each pending source to [`handle`] in that order within a single
//! dispatcher entry — the kernel itself does not read a live interrupt
//! line from hardware (out of scope, spec §1), so ordering is the
//! caller's contract to uphold, exactly as the reference dispatcher reads
//! one already-latched Cause register and walks its bits low to high.

use abi::PSECOND_US;

use crate::arch::Cpu;
use crate::kernel::{klog, Kernel};
use crate::pcb::Pid;
use crate::scheduler::{self, NextTask, ScheduleOutcome};

/// Which interrupt source fired, as decoded by the caller from the Cause
/// register's pending-interrupt bits (spec §4.4, §4.6).
#[derive(Copy, Clone, Debug)]
pub enum InterruptSource {
    Plt,
    IntervalTimer,
    Device { line: usize, dev: usize, status: i32 },
}

/// Handles one interrupt source and resolves the resulting scheduling
/// decision in the same call, mirroring the reference handler's
/// acknowledge-then-LDST-or-fall-through-to-scheduler shape.
pub fn handle<C: Cpu>(k: &mut Kernel<C>, source: InterruptSource) -> ScheduleOutcome {
    k.enter_handler();
    match source {
        InterruptSource::Plt => plt(k),
        InterruptSource::IntervalTimer => interval_timer(k),
        InterruptSource::Device { line, dev, status } => device(k, line, dev, status),
    }
}

/// PLT: the only preemption point (spec §4.6). Reload the timer, move
/// `current_process` to the ready queue's tail, call the scheduler.
fn plt<C: Cpu>(k: &mut Kernel<C>) -> ScheduleOutcome {
    k.cpu.arm_plt(k.config.timeslice_us);
    if let Some(cur) = k.current.take() {
        k.enqueue_ready(cur);
        klog::trace!("interrupt: PLT preempted pid {:?}", cur);
    }
    scheduler::resolve(k, NextTask::Other)
}

/// Interval timer: reload with PSECOND, wake every pseudoclock waiter in
/// list order delivering an empty message from the SSI, then either
/// return to `current_process` or fall through to the scheduler (spec
/// §4.6).
fn interval_timer<C: Cpu>(k: &mut Kernel<C>) -> ScheduleOutcome {
    k.cpu.arm_interval_timer(PSECOND_US);
    let mut woken = heaplessish_collect_pseudoclock(k);
    for p in woken.drain() {
        k.soft_block_count = k.soft_block_count.saturating_sub(1);
        crate::ssi::deliver_deferred_reply(k, p, 0);
        klog::trace!("interrupt: pseudoclock woke pid {:?}", p);
    }
    match k.current {
        Some(cur) => scheduler::resolve(k, NextTask::Specific(cur)),
        None => scheduler::resolve(k, NextTask::Other),
    }
}

/// Device interrupt on `(line, dev)`: the single PCB (if any) waiting on
/// this subdevice is woken and handed `status` as a message from the SSI
/// (spec §4.6).
fn device<C: Cpu>(k: &mut Kernel<C>, line: usize, dev: usize, status: i32) -> ScheduleOutcome {
    match k.wake_device(line, dev) {
        Some(p) => {
            crate::ssi::deliver_deferred_reply(k, p, status);
            klog::trace!(
                "interrupt: device line {} dev {} woke pid {:?} status {}",
                line,
                dev,
                p,
                status
            );
        }
        None => {
            klog::warn!(
                "interrupt: spurious device interrupt on line {} dev {}, nobody waiting",
                line,
                dev
            );
        }
    }
    match k.current {
        Some(cur) => scheduler::resolve(k, NextTask::Specific(cur)),
        None => scheduler::resolve(k, NextTask::Other),
    }
}

/// Drains `pseudoclock_list` into a small fixed-capacity buffer up front
/// so the wakeup loop above isn't mutating the list it's iterating (spec
/// §5(b): "wakeups from a single tick release all waiters atomically but
/// deliver their messages in list order").
fn heaplessish_collect_pseudoclock<C: Cpu>(k: &mut Kernel<C>) -> PidBuf {
    let mut buf = PidBuf::new();
    while let Some(p) = k.pseudoclock_list.remove_head(&mut k.pcbs.slots, crate::pcb::pid_index) {
        buf.push(p);
    }
    buf
}

/// Fixed-capacity buffer sized to `MAXPROC`, since at most every allocated
/// PCB could be on the pseudoclock list at once.
struct PidBuf {
    buf: [Option<Pid>; abi::MAXPROC],
    len: usize,
    drained: usize,
}

impl PidBuf {
    fn new() -> Self {
        PidBuf {
            buf: [None; abi::MAXPROC],
            len: 0,
            drained: 0,
        }
    }

    fn push(&mut self, p: Pid) {
        self.buf[self.len] = Some(p);
        self.len += 1;
    }

    fn drain(&mut self) -> impl Iterator<Item = Pid> + '_ {
        let start = self.drained;
        self.drained = self.len;
        self.buf[start..self.len].iter().filter_map(|o| *o)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::fake::FakeCpu;
    use crate::config::KernelConfig;
    use crate::pcb::Filter;

    fn boot() -> Kernel<FakeCpu> {
        let mut k = Kernel::new(FakeCpu::new(), KernelConfig::default());
        k.ssi_pid = Some(k.pcbs.alloc().unwrap());
        k
    }

    #[test]
    fn plt_moves_current_to_ready_tail() {
        let mut k = boot();
        let a = k.pcbs.alloc().unwrap();
        let b = k.pcbs.alloc().unwrap();
        k.enqueue_ready(b);
        k.current = Some(a);
        handle(&mut k, InterruptSource::Plt);
        // a should now be running (dequeued as next ready was b, but a was
        // appended after b so b runs first); confirm a is back in the mix.
        assert!(k.current == Some(b) || k.pcb(a).allocated);
    }

    #[test]
    fn pseudoclock_wakes_all_waiters_in_order() {
        let mut k = boot();
        let a = k.pcbs.alloc().unwrap();
        let b = k.pcbs.alloc().unwrap();
        k.pcb_mut(a).recv_filter = Some(Filter::Any);
        k.pcb_mut(b).recv_filter = Some(Filter::Any);
        k.block_on_pseudoclock(a);
        k.block_on_pseudoclock(b);
        let before = k.soft_block_count;
        handle(&mut k, InterruptSource::IntervalTimer);
        assert_eq!(k.soft_block_count, before - 2);
        assert_eq!(k.pcb(a).state.a2, 0);
        assert_eq!(k.pcb(b).state.a2, 0);
    }

    #[test]
    fn device_interrupt_wakes_single_waiter() {
        let mut k = boot();
        let a = k.pcbs.alloc().unwrap();
        k.pcb_mut(a).recv_filter = Some(Filter::Any);
        k.block_on_device(a, 0, 0);
        handle(&mut k, InterruptSource::Device { line: 0, dev: 0, status: 7 });
        assert_eq!(k.pcb(a).state.a2, 7);
        assert_eq!(k.soft_block_count, 0);
    }

    #[test]
    fn spurious_device_interrupt_is_harmless() {
        let mut k = boot();
        handle(&mut k, InterruptSource::Device { line: 0, dev: 0, status: 1 });
    }
}
