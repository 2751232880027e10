// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! An implementation to support the `critical-section` crate within a user
//! task.
//!
//! A task here never has non-local or asynchronous control flow and never
//! has threads: within the context of one task, nothing can run concurrently
//! with it, so there's no code to generate to implement a critical section
//! --- they happen naturally. Preemption (the PLT quantum) and true
//! concurrency both live above this task, in the scheduler; neither can
//! observe a partially-mutated value inside one task's own critical section.

use critical_section::RawRestoreState;

struct TaskCriticalSection;
critical_section::set_impl!(TaskCriticalSection);

unsafe impl critical_section::Impl for TaskCriticalSection {
    #[inline(always)]
    unsafe fn acquire() -> RawRestoreState {
        // No action required.
    }

    #[inline(always)]
    unsafe fn release(_token: RawRestoreState) {
        // Again, no action required.
    }
}
