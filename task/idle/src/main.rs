// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![no_std]
#![no_main]

// Make sure we actually link in userlib, despite not using any of it
// explicitly in this particular function body — we need it for the
// crate's panic handler and syscall stubs.
extern crate userlib;

use userlib::ANY;

#[export_name = "main"]
fn main() -> ! {
    // There is no WFI here: the only way this crate yields the CPU is by
    // blocking in RECEIVE (spec §13, "message passing as the only blocking
    // primitive"). A process parked in RECEIVE(ANY) that nobody ever sends
    // to is exactly as idle as a WFI loop, and it falls out of the same
    // primitive every other task uses.
    loop {
        let _ = userlib::sys_receive(ANY);
    }
}
