// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The pager (spec §4.10 "Page-fault handling"): services a TLB-exception
//! pass-up by bringing the faulting page into a swap-pool frame, evicting
//! an occupant via FIFO replacement if every frame is already in use.
//!
//! Generic over [`Cpu`] (for the atomic TLB/interrupt-disable region),
//! [`Flash`] (the backing store), and [`SwapMutex`] (pool serialization) —
//! the same three-trait seam `sys/kern` and this crate use everywhere a
//! real hardware or cross-process protocol stands between portable logic
//! and its host test double.
//!
//! The swap pool is shared by every user process, so a fault serviced on
//! behalf of one ASID may need to evict a frame owned by a different one;
//! `tables` therefore holds every live process's page table, indexed by
//! `asid - 1`, rather than just the faulting process's own. This mirrors
//! how a single pager instance in the reference design has direct access
//! to all of physical memory, not just the faulting address space.

use abi::{CauseClass, PageTableEntry};

use kern::arch::{Cpu, TlbEntry};

use crate::flash::{Flash, FlashError};
use crate::mutex::SwapMutex;
use crate::swap::{Owner, SwapPool};
use crate::{Frame, PageTable};

/// A page fault is always fatal when it isn't serviceable at all (spec
/// §4.9's "any other cause" / §7's "TLB-modification... treated as program
/// trap"); the caller (the general-exception wrapper, [`crate::exception`])
/// is expected to route this into a TERMPROCESS request the same way any
/// other program trap does.
#[derive(Copy, Clone, Debug)]
pub struct ProgramTrap;

/// Services one page fault. `asid`/`vpn` identify the faulting address
/// (decoded by the caller from the saved `entry_hi`); `tables[asid - 1]` is
/// the faulting process's own page table. `pool` is the process-wide swap
/// pool, shared across every `asid`.
///
/// Note on byte contents: this crate has no modeled physical address space
/// (out of scope, spec §1), so a write-back moves a zero-filled stand-in
/// buffer rather than the evicted frame's real bytes — the eviction/install
/// bookkeeping and FIFO ordering are exercised faithfully, but a
/// byte-for-byte content round trip through flash is not, since there is no
/// real memory here to read the bytes from.
///
/// Returns `Ok(())` on success, with `tables[asid - 1]`'s entry for `vpn`
/// now valid and resident in the TLB. Flash I/O failure is not
/// representable as a `Result` per spec §7 ("Flash I/O error in pager:
/// PANIC"): it is reported through `cpu.panic`, which never returns.
pub fn handle_page_fault<C: Cpu, F: Flash, M: SwapMutex>(
    cpu: &mut C,
    cause: CauseClass,
    asid: u8,
    vpn: u32,
    tables: &mut [PageTable],
    pool: &mut SwapPool,
    flash: &mut F,
    mutex: &mut M,
) -> Result<(), ProgramTrap> {
    if cause == CauseClass::TlbModification {
        return Err(ProgramTrap);
    }

    mutex.acquire();

    let (frame, victim) = pool.select_frame();

    if let Some(Owner { asid: v_asid, vpn: v_vpn, pte_index }) = victim {
        let victim_table = &mut tables[v_asid as usize - 1];
        let was_dirty = victim_table[pte_index].dirty;
        cpu.disable_interrupts();
        victim_table[pte_index].valid = false;
        cpu.tlb_clear();
        cpu.enable_interrupts();
        if was_dirty {
            let stand_in: Frame = [0; abi::PAGESIZE];
            write_back(cpu, flash, v_asid, v_vpn, &stand_in, mutex)?;
        }
    }

    let mut incoming: Frame = [0; abi::PAGESIZE];
    if flash.read_block(asid - 1, vpn, &mut incoming).is_err() {
        mutex.release();
        cpu.panic("pager: flash read failed");
    }

    pool.install(frame, Owner { asid, vpn, pte_index: vpn as usize });

    let table = &mut tables[asid as usize - 1];
    cpu.disable_interrupts();
    table[vpn as usize] = PageTableEntry { valid: true, dirty: false, frame: frame as u32 };
    cpu.tlb_write_random(TlbEntry { entry_hi: vpn << 12, pte: table[vpn as usize] });
    cpu.enable_interrupts();

    mutex.release();
    Ok(())
}

fn write_back<C: Cpu, F: Flash, M: SwapMutex>(
    cpu: &mut C,
    flash: &mut F,
    asid: u8,
    vpn: u32,
    contents: &Frame,
    mutex: &mut M,
) -> Result<(), ProgramTrap> {
    match flash.write_block(asid - 1, vpn, contents) {
        Ok(()) => Ok(()),
        Err(FlashError) => {
            mutex.release();
            cpu.panic("pager: flash write-back failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flash::FakeFlash;
    use crate::mutex::FakeSwapMutex;
    use abi::UPROCMAX;
    use kern::arch::fake::FakeCpu;

    fn empty_tables() -> Vec<PageTable> {
        (0..UPROCMAX).map(|_| [PageTableEntry::default(); abi::USERPGTBLSIZE]).collect()
    }

    #[test]
    fn fault_installs_valid_entry_with_no_eviction() {
        let mut cpu = FakeCpu::new();
        let mut tables = empty_tables();
        let mut pool = SwapPool::new();
        let mut flash = FakeFlash::new();
        let mut mutex = FakeSwapMutex::default();

        handle_page_fault(&mut cpu, CauseClass::TlbException, 1, 5, &mut tables, &mut pool, &mut flash, &mut mutex)
            .unwrap();

        assert!(tables[0][5].valid);
        assert!(cpu.tlb_probe(5 << 12));
    }

    #[test]
    fn tlb_modification_is_a_program_trap() {
        let mut cpu = FakeCpu::new();
        let mut tables = empty_tables();
        let mut pool = SwapPool::new();
        let mut flash = FakeFlash::new();
        let mut mutex = FakeSwapMutex::default();

        let result = handle_page_fault(
            &mut cpu,
            CauseClass::TlbModification,
            1,
            5,
            &mut tables,
            &mut pool,
            &mut flash,
            &mut mutex,
        );
        assert!(result.is_err());
    }

    #[test]
    fn eleventh_page_across_eight_processes_evicts_exactly_one_frame() {
        // Spec §12 scenario 5: 8 processes x 10 pages each fills a
        // 16-frame pool (UPROCMAX * 2) with no eviction; an 11th page in
        // one process evicts exactly one frame via FIFO.
        let mut cpu = FakeCpu::new();
        let mut pool = SwapPool::new();
        let mut flash = FakeFlash::new();
        let mut mutex = FakeSwapMutex::default();
        let mut tables = empty_tables();

        for asid in 0..UPROCMAX {
            for vpn in 0..10u32 {
                handle_page_fault(
                    &mut cpu,
                    CauseClass::TlbException,
                    (asid + 1) as u8,
                    vpn,
                    &mut tables,
                    &mut pool,
                    &mut flash,
                    &mut mutex,
                )
                .unwrap();
            }
        }
        assert_eq!(cpu.tlb_write_count(), 80);

        let writes_before = cpu.tlb_write_count();
        handle_page_fault(&mut cpu, CauseClass::TlbException, 1, 10, &mut tables, &mut pool, &mut flash, &mut mutex)
            .unwrap();
        assert_eq!(cpu.tlb_write_count(), writes_before + 1);
        // The victim (asid 1's page 0, the first one installed) was
        // invalidated by the eviction.
        assert!(!tables[0][0].valid);
    }
}
