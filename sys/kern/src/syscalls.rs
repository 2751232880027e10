// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Kernel-level SEND/RECEIVE (spec §4.5).
//!
//! Both primitives are requested from privileged mode only; the dispatcher
//! (`dispatch.rs`) is responsible for turning a user-mode attempt into an
//! illegal-instruction trap before it ever reaches here.

use abi::send_result;

use crate::kernel::{klog, Kernel};
use crate::pcb::{Filter, Pid};
use crate::scheduler::NextTask;
use crate::arch::Cpu;

/// The outcome of `RECEIVE`: either an immediate message, or a block
/// requiring the caller to consult the scheduler.
#[derive(Copy, Clone, Debug)]
pub enum RecvOutcome {
    Delivered { sender: Pid, payload: i32 },
    Blocked,
}

/// `SEND(dest, payload)`. Never blocks the sender (spec §4.5: "Sender does
/// not lose its quantum"), so the scheduling hint is always `NextTask::Same`
/// unless delivering the message happened to wake a higher-priority-free
/// FIFO receiver onto the ready queue — which does not preempt the sender
/// here, since this kernel has no priority scheduling (spec Non-goals).
pub fn send<C: Cpu>(k: &mut Kernel<C>, caller: Pid, dest: Pid, payload: i32) -> i32 {
    if k.pcbs.is_free(dest) {
        klog::trace!("send: pid {:?} -> {:?} dropped, DEST_NOT_EXIST", caller, dest);
        return send_result::DEST_NOT_EXIST;
    }

    let msg = match k.msgs.alloc(caller, payload) {
        Some(m) => m,
        None => {
            klog::warn!("send: message pool exhausted");
            return send_result::MSG_NOGOOD;
        }
    };

    let dest_filter = k.pcb(dest).recv_filter;
    let accepts = dest_filter.map(|f| f.matches(caller)).unwrap_or(false);

    if accepts {
        k.pcb_mut(dest).recv_filter = None;
        k.remove_from_any_queue(dest);
        let delivered = k.msgs.get(msg);
        k.pcb_mut(dest).state.a0 = delivered.sender.0 as i32;
        k.pcb_mut(dest).state.a2 = delivered.payload;
        k.msgs.free(msg);
        k.enqueue_ready(dest);
        klog::trace!("send: delivered pid {:?} -> {:?} directly", caller, dest);
    } else {
        let mut inbox = core::mem::take(&mut k.pcb_mut(dest).inbox);
        k.msgs.insert_message(&mut inbox, msg);
        k.pcb_mut(dest).inbox = inbox;
        klog::trace!("send: queued pid {:?} -> {:?} inbox", caller, dest);
    }

    send_result::OK
}

/// `RECEIVE(filter, payload_ptr)`. On an immediate match the message is
/// consumed and delivered synchronously; otherwise the caller is recorded
/// as blocked-on-receive and `Blocked` is returned so the dispatcher can
/// call the scheduler.
pub fn receive<C: Cpu>(k: &mut Kernel<C>, caller: Pid, filter: Filter) -> (RecvOutcome, NextTask) {
    let mut inbox = core::mem::take(&mut k.pcb_mut(caller).inbox);
    if let Some(msg) = k.msgs.pop_message(&mut inbox, filter) {
        k.pcb_mut(caller).inbox = inbox;
        let m = k.msgs.get(msg);
        let (sender, payload) = (m.sender, m.payload);
        k.msgs.free(msg);
        klog::trace!("receive: pid {:?} got message from {:?}", caller, sender);
        return (RecvOutcome::Delivered { sender, payload }, NextTask::Same);
    }
    k.pcb_mut(caller).inbox = inbox;

    // No match: block. Per spec §4.5, this is *not* a soft-block (it
    // doesn't touch `soft_block_count`); the caller is simply off the
    // ready queue and addressable only via `SEND`.
    k.pcb_mut(caller).recv_filter = Some(filter);
    k.current = None;
    klog::trace!("receive: pid {:?} blocked on {:?}", caller, filter);
    (RecvOutcome::Blocked, NextTask::Other)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::fake::FakeCpu;
    use crate::config::KernelConfig;

    fn boot_pair() -> (Kernel<FakeCpu>, Pid, Pid) {
        let mut k = Kernel::new(FakeCpu::new(), KernelConfig::default());
        let a = k.pcbs.alloc().unwrap();
        let b = k.pcbs.alloc().unwrap();
        (k, a, b)
    }

    #[test]
    fn send_to_blocked_receiver_delivers_immediately() {
        let (mut k, p1, p2) = boot_pair();
        k.pcb_mut(p2).recv_filter = Some(Filter::Any);

        let code = send(&mut k, p1, p2, 42);
        assert_eq!(code, send_result::OK);
        assert_eq!(k.pcb(p2).state.a0, p1.0 as i32);
        assert_eq!(k.pcb(p2).state.a2, 42);
        assert!(k.pcb(p2).recv_filter.is_none());
    }

    #[test]
    fn send_to_non_waiting_receiver_queues_inbox() {
        let (mut k, p1, p2) = boot_pair();
        let code = send(&mut k, p1, p2, 7);
        assert_eq!(code, send_result::OK);
        assert_eq!(k.pcb(p2).inbox.len(), 1);
    }

    #[test]
    fn send_to_freed_pcb_reports_dest_not_exist() {
        let (mut k, p1, p2) = boot_pair();
        k.pcbs.free(p2);
        let code = send(&mut k, p1, p2, 1);
        assert_eq!(code, send_result::DEST_NOT_EXIST);
    }

    #[test]
    fn ping_pong_round_trip() {
        let (mut k, p1, p2) = boot_pair();
        assert_eq!(send(&mut k, p1, p2, 42), send_result::OK);
        let (outcome, _) = receive(&mut k, p2, Filter::Any);
        match outcome {
            RecvOutcome::Delivered { sender, payload } => {
                assert_eq!(sender, p1);
                assert_eq!(payload, 42);
            }
            RecvOutcome::Blocked => panic!("expected immediate delivery"),
        }
        assert_eq!(send(&mut k, p2, p1, 43), send_result::OK);
        let (outcome, _) = receive(&mut k, p1, Filter::Specific(p2));
        match outcome {
            RecvOutcome::Delivered { payload, .. } => assert_eq!(payload, 43),
            RecvOutcome::Blocked => panic!("expected immediate delivery"),
        }
    }

    #[test]
    fn receive_blocks_when_inbox_empty() {
        let (mut k, _p1, p2) = boot_pair();
        let (outcome, hint) = receive(&mut k, p2, Filter::Any);
        assert!(matches!(outcome, RecvOutcome::Blocked));
        assert_eq!(hint, NextTask::Other);
        assert!(k.current.is_none());
        assert_eq!(k.pcb(p2).recv_filter, Some(Filter::Any));
    }
}
