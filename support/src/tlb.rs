// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The TLB refill shim (spec §4.10 "TLB refill shim"): called on a TLB
//! miss for the currently running user process. Locates the matching
//! page-table entry by virtual page number and installs it with a
//! replace-random write, exactly mirroring the pager's own step 6 install.

use kern::arch::{Cpu, TlbEntry};

use crate::PageTable;

/// Looks up `entry_hi`'s virtual page number in `table` and, if a valid
/// mapping exists, writes it into the TLB via [`Cpu::tlb_write_random`].
///
/// Returns `false` if no valid entry covers this address — the caller
/// (the general-exception handler, spec §4.9) treats that the same as any
/// other unsupported page fault: pass it back to the pager, which is the
/// only code that may install new *valid* entries.
pub fn refill<C: Cpu>(cpu: &mut C, entry_hi: u32, vpn: usize, table: &PageTable) -> bool {
    match table.get(vpn) {
        Some(pte) if pte.valid => {
            cpu.tlb_write_random(TlbEntry { entry_hi, pte: *pte });
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abi::PageTableEntry;
    use kern::arch::fake::FakeCpu;

    #[test]
    fn installs_valid_entry() {
        let mut cpu = FakeCpu::new();
        let mut table: PageTable = [PageTableEntry::default(); abi::USERPGTBLSIZE];
        table[3] = PageTableEntry { valid: true, dirty: false, frame: 7 };
        assert!(refill(&mut cpu, 0x3000, 3, &table));
        assert!(cpu.tlb_probe(0x3000));
    }

    #[test]
    fn refuses_invalid_entry() {
        let mut cpu = FakeCpu::new();
        let table: PageTable = [PageTableEntry::default(); abi::USERPGTBLSIZE];
        assert!(!refill(&mut cpu, 0x3000, 3, &table));
    }
}
