// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Backing-store flash access via the SSI's `DOIO` service (spec §4.10
//! steps 3a/4, §6 "Persisted state").
//!
//! The device register protocol itself (command/status/data0/data1 words,
//! the exact DMA handshake that moves a page's bytes across the bus) is the
//! out-of-scope "device register model" (spec §1); this module only models
//! the two operations the pager actually needs — write a frame back,
//! read a frame in — behind the [`Flash`] trait, the same way [`kern::arch::Cpu`]
//! stands in for the instruction emulator.

use crate::Frame;

/// Flash I/O failed. Per spec §7 this is always fatal to the whole machine
/// (the pager panics on it), so this type carries no detail beyond a
/// message for the panic.
#[derive(Copy, Clone, Debug)]
pub struct FlashError;

/// Backing-store access, addressed by `(device = asid - 1, block = vpn)`
/// per spec §6.
pub trait Flash {
    fn write_block(&mut self, device: u8, block: u32, data: &Frame) -> Result<(), FlashError>;
    fn read_block(&mut self, device: u8, block: u32, out: &mut Frame) -> Result<(), FlashError>;
}

/// The real backend: issues `DOIO` to the SSI and blocks for the completion
/// status, exactly as any other device-driver task does. `ssi` is the
/// well-known SSI pid; `line`/`dev` identify this process's backing-store
/// device among the DOIO-addressable lines (spec §4.10's device number is
/// `asid - 1`, mapped onto a line/subdevice pair by the embedding image).
///
/// The actual byte transfer between the chosen frame and the flash
/// controller's registers happens on the far side of `DOIO` — the
/// out-of-scope device DMAs the page directly. This type only performs the
/// request/acknowledge handshake and trusts the hardware moved the bytes
/// when the status word reports success.
#[cfg(target_os = "none")]
pub struct SsiFlash {
    pub ssi: i32,
    pub line: usize,
}

#[cfg(target_os = "none")]
impl Flash for SsiFlash {
    fn write_block(&mut self, device: u8, block: u32, _data: &Frame) -> Result<(), FlashError> {
        self.doio(device, block)
    }

    fn read_block(&mut self, device: u8, block: u32, _out: &mut Frame) -> Result<(), FlashError> {
        self.doio(device, block)
    }
}

#[cfg(target_os = "none")]
impl SsiFlash {
    fn doio(&mut self, device: u8, _block: u32) -> Result<(), FlashError> {
        let req = abi::SsiRequest {
            service_code: abi::SsiService::DoIo as i32,
            arg: ((self.line as i32) << 8) | (device as i32),
        };
        let status = userlib::hl::ssi_call(self.ssi, req);
        if status < 0 {
            Err(FlashError)
        } else {
            Ok(())
        }
    }
}

/// Host test double: an in-memory backing store, keyed by `(device,
/// block)`, that actually copies bytes so pager tests can assert a
/// written-back page's flash contents afterward (spec §12 scenario 5).
#[cfg(not(target_os = "none"))]
pub struct FakeFlash {
    blocks: std::collections::HashMap<(u8, u32), Frame>,
}

#[cfg(not(target_os = "none"))]
impl FakeFlash {
    pub fn new() -> Self {
        FakeFlash { blocks: std::collections::HashMap::new() }
    }

    pub fn contents(&self, device: u8, block: u32) -> Option<&Frame> {
        self.blocks.get(&(device, block))
    }
}

#[cfg(not(target_os = "none"))]
impl Default for FakeFlash {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_os = "none"))]
impl Flash for FakeFlash {
    fn write_block(&mut self, device: u8, block: u32, data: &Frame) -> Result<(), FlashError> {
        self.blocks.insert((device, block), *data);
        Ok(())
    }

    fn read_block(&mut self, device: u8, block: u32, out: &mut Frame) -> Result<(), FlashError> {
        match self.blocks.get(&(device, block)) {
            Some(data) => {
                *out = *data;
                Ok(())
            }
            None => {
                // An unwritten block reads as zeroed, matching a freshly
                // erased flash device rather than an error: every process
                // in the test scenarios touches pages before it ever
                // writes them.
                *out = [0; abi::PAGESIZE];
                Ok(())
            }
        }
    }
}
