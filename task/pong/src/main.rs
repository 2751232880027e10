// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The second half of the message-passing demo (spec §12 scenario 1):
//! waits for a message from any sender, replies with `payload + 1`, and
//! loops.

#![no_std]
#![no_main]

use userlib::ANY;

#[export_name = "main"]
fn main() -> ! {
    loop {
        let (sender, payload) = userlib::sys_receive(ANY);
        let _ = userlib::sys_send(sender, payload + 1);
    }
}
